use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Identity signature for exactly one detected face (512-dimensional for ArcFace).
///
/// Two vectors are only comparable when they came from the same encoder
/// configuration, i.e. their dimensionality matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityVector {
    values: Vec<f32>,
}

impl IdentityVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance to `other`, or `None` when the dimensions differ.
    pub fn euclidean_distance(&self, other: &IdentityVector) -> Option<f32> {
        if self.values.len() != other.values.len() {
            return None;
        }
        let sum = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>();
        Some(sum.sqrt())
    }
}

impl From<Vec<f32>> for IdentityVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// One face found in an image: where it is and who it looks like.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    pub location: BoundingBox,
    pub vector: IdentityVector,
}

/// A registered person to search for, labelled after its reference image.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetIdentity {
    pub label: String,
    pub vector: IdentityVector,
}

/// A gallery photo waiting for a match decision. Dropped once decided.
#[derive(Debug, Clone)]
pub struct PhotoCandidate {
    pub source_url: String,
    pub image: RgbImage,
}

/// Outcome of matching one photo against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchVerdict {
    pub matched: bool,
    /// Label of the first matching target (if any).
    pub matched_label: Option<String>,
    /// Registry position of the matching target.
    pub target_index: Option<usize>,
    /// Distance that accepted the match.
    pub distance: Option<f32>,
}

impl MatchVerdict {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            matched_label: None,
            target_index: None,
            distance: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_identical() {
        let a = IdentityVector::new(vec![0.1, 0.2, 0.3]);
        assert_eq!(a.euclidean_distance(&a), Some(0.0));
    }

    #[test]
    fn test_euclidean_distance_3_4_5() {
        let a = IdentityVector::new(vec![0.0, 0.0]);
        let b = IdentityVector::new(vec![3.0, 4.0]);
        let d = a.euclidean_distance(&b).unwrap();
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_dimension_mismatch() {
        let a = IdentityVector::new(vec![1.0, 0.0]);
        let b = IdentityVector::new(vec![1.0, 0.0, 0.0]);
        assert_eq!(a.euclidean_distance(&b), None);
    }

    #[test]
    fn test_no_match_verdict_is_empty() {
        let v = MatchVerdict::no_match();
        assert!(!v.matched);
        assert!(v.matched_label.is_none());
        assert!(v.target_index.is_none());
    }
}
