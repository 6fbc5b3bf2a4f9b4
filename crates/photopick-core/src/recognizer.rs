//! ArcFace face recognizer via ONNX Runtime.
//!
//! Produces 512-dimensional identity vectors from aligned 112×112 face
//! crops using the w600k_r50 model.
//!
//! Embeddings are L2-normalized and then scaled by [`embedding_scale`], so
//! that the ArcFace same-person operating point (cosine 0.40) lands exactly
//! on the Euclidean [`DEFAULT_TOLERANCE`] of 0.6. For unit vectors the
//! distance is `sqrt(2 - 2·cos)`.

use crate::alignment;
use crate::matcher::DEFAULT_TOLERANCE;
use crate::types::{BoundingBox, IdentityVector};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // symmetric, unlike SCRFD's 128.0
const ARCFACE_EMBEDDING_DIM: usize = 512;
/// Cosine similarity at which two ArcFace embeddings count as the same person.
pub const SAME_PERSON_COSINE: f32 = 0.40;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0}; download w600k_r50.onnx from insightface into the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face has no landmarks; detector must return landmarks for alignment")]
    NoLandmarks,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ArcFace-based identity encoder for single faces.
pub struct FaceRecognizer {
    session: Session,
}

impl FaceRecognizer {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, RecognizerError> {
        if !model_path.exists() {
            return Err(RecognizerError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = %model_path.display(), "loaded ArcFace model");

        Ok(Self { session })
    }

    /// Encode one detected face of `image` into an identity vector.
    pub fn extract(
        &mut self,
        image: &RgbImage,
        face: &BoundingBox,
    ) -> Result<IdentityVector, RecognizerError> {
        let landmarks = face.landmarks.as_ref().ok_or(RecognizerError::NoLandmarks)?;
        let aligned = alignment::align_face(image, landmarks);
        let input = preprocess(&aligned);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(IdentityVector::new(calibrate(raw)))
    }
}

/// Aligned RGB crop → normalized NCHW tensor.
fn preprocess(aligned: &RgbImage) -> Array4<f32> {
    let (w, h) = aligned.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
    for (x, y, pixel) in aligned.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel.0[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
        }
    }
    tensor
}

/// Length of every encoded vector: `DEFAULT_TOLERANCE / sqrt(2 - 2·SAME_PERSON_COSINE)`.
pub fn embedding_scale() -> f32 {
    DEFAULT_TOLERANCE / (2.0 - 2.0 * SAME_PERSON_COSINE).sqrt()
}

fn calibrate(raw: &[f32]) -> Vec<f32> {
    let scale = embedding_scale();
    l2_normalize(raw).into_iter().map(|x| x * scale).collect()
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
