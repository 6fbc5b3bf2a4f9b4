//! Deterministic stand-in for the ONNX encoder, for tests that need faces
//! without model files.
//!
//! Every non-black pixel in the top row of an image is one "face", read
//! left to right. Its identity vector is the pixel's RGB channels divided
//! by 100, so `Rgb([100, 0, 0])` and `Rgb([160, 0, 0])` sit 0.6 apart.
//! A magenta pixel (255, 0, 255) makes encoding fail.

use crate::detector::DetectorError;
use crate::encoder::{EncoderError, FaceEncoder};
use crate::types::{BoundingBox, DetectedFace, IdentityVector};
use image::{Rgb, RgbImage};

pub const FAIL_PIXEL: Rgb<u8> = Rgb([255, 0, 255]);

#[derive(Debug, Default)]
pub struct PixelFaceEncoder {
    /// Number of `encode` calls made.
    pub calls: usize,
}

impl PixelFaceEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity vector a given face pixel encodes to.
    pub fn vector_for(pixel: Rgb<u8>) -> IdentityVector {
        IdentityVector::new(pixel.0.iter().map(|&c| f32::from(c) / 100.0).collect())
    }

    /// Build a photo whose top row holds one face per pixel, in order.
    pub fn photo_with_faces(faces: &[Rgb<u8>]) -> RgbImage {
        let width = faces.len().max(1) as u32;
        let mut image = RgbImage::new(width, 2);
        for (x, pixel) in faces.iter().enumerate() {
            image.put_pixel(x as u32, 0, *pixel);
        }
        image
    }
}

impl FaceEncoder for PixelFaceEncoder {
    fn encode(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, EncoderError> {
        self.calls += 1;
        let mut faces = Vec::new();
        for x in 0..image.width() {
            let pixel = *image.get_pixel(x, 0);
            if pixel == FAIL_PIXEL {
                return Err(DetectorError::InferenceFailed("poisoned pixel".into()).into());
            }
            if pixel.0 == [0, 0, 0] {
                continue;
            }
            faces.push(DetectedFace {
                location: BoundingBox {
                    x: x as f32,
                    y: 0.0,
                    width: 1.0,
                    height: 1.0,
                    confidence: 1.0,
                    landmarks: None,
                },
                vector: Self::vector_for(pixel),
            });
        }
        Ok(faces)
    }
}
