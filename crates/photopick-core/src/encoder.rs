//! Face encoding capability: image in, detected faces with identity vectors out.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::DetectedFace;
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

/// SCRFD detection model file name inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
/// ArcFace recognition model file name inside the model directory.
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Converts an image into zero or more detected faces.
///
/// Faces come back in detection order; callers that only want one face
/// (reference images) take the first.
pub trait FaceEncoder {
    fn encode(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, EncoderError>;

    /// Encode all faces and keep only the first one.
    fn encode_first(&mut self, image: &RgbImage) -> Result<Option<DetectedFace>, EncoderError> {
        Ok(self.encode(image)?.into_iter().next())
    }
}

/// SCRFD + ArcFace pipeline running on ONNX Runtime.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEncoder {
    /// Load both models from `model_dir`. Fails fast if either is missing.
    pub fn load(model_dir: &Path) -> Result<Self, EncoderError> {
        let detector = FaceDetector::load(&model_dir.join(DETECTOR_MODEL_FILE))?;
        let recognizer = FaceRecognizer::load(&model_dir.join(RECOGNIZER_MODEL_FILE))?;
        Ok(Self { detector, recognizer })
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, EncoderError> {
        let boxes = self.detector.detect(image)?;
        tracing::debug!(faces = boxes.len(), "detected faces");

        boxes
            .into_iter()
            .map(|location| -> Result<DetectedFace, EncoderError> {
                let vector = self.recognizer.extract(image, &location)?;
                Ok(DetectedFace { location, vector })
            })
            .collect()
    }
}
