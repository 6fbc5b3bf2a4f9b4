//! Match engine: decides whether a photo shows any registered target.
//!
//! Selection is first-match, not nearest: for each face (in detection
//! order) the first target in registry order whose Euclidean distance is
//! within tolerance wins, and the first face with any match ends the
//! search. Which label gets reported depends on this order, so it is part
//! of the contract.

use crate::encoder::{EncoderError, FaceEncoder};
use crate::registry::TargetRegistry;
use crate::types::{IdentityVector, MatchVerdict, PhotoCandidate};
use thiserror::Error;

/// Conventional tolerance for Euclidean face-encoding comparison.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("face encoding failed: {0}")]
    Encoding(#[from] EncoderError),
    #[error("invalid tolerance {0}: must be finite and non-negative")]
    InvalidTolerance(f32),
}

/// Distance from `probe` to every target, in registry order.
///
/// `None` marks a target whose vector has a different dimensionality.
pub fn face_distances(registry: &TargetRegistry, probe: &IdentityVector) -> Vec<Option<f32>> {
    registry
        .iter()
        .map(|t| t.vector.euclidean_distance(probe))
        .collect()
}

/// Per-target match flags in registry order; `distance <= tolerance` matches.
pub fn compare_faces(registry: &TargetRegistry, probe: &IdentityVector, tolerance: f32) -> Vec<bool> {
    face_distances(registry, probe)
        .into_iter()
        .map(|d| d.is_some_and(|d| d <= tolerance))
        .collect()
}

/// A single probe-versus-registry decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetMatch {
    pub index: usize,
    pub distance: f32,
}

/// Strategy for picking a target for one probe vector.
pub trait Matcher {
    fn compare(&self, probe: &IdentityVector, registry: &TargetRegistry) -> Option<TargetMatch>;
}

/// First target in registry order within tolerance.
#[derive(Debug, Clone, Copy)]
pub struct FirstMatchMatcher {
    tolerance: f32,
}

impl FirstMatchMatcher {
    pub fn new(tolerance: f32) -> Result<Self, MatchError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(MatchError::InvalidTolerance(tolerance));
        }
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }
}

impl Default for FirstMatchMatcher {
    fn default() -> Self {
        Self { tolerance: DEFAULT_TOLERANCE }
    }
}

impl Matcher for FirstMatchMatcher {
    fn compare(&self, probe: &IdentityVector, registry: &TargetRegistry) -> Option<TargetMatch> {
        face_distances(registry, probe)
            .into_iter()
            .enumerate()
            .find_map(|(index, d)| match d {
                Some(distance) if distance <= self.tolerance => Some(TargetMatch { index, distance }),
                _ => None,
            })
    }
}

/// Encodes photos and matches their faces against a fixed registry.
pub struct MatchEngine<'r, M = FirstMatchMatcher> {
    registry: &'r TargetRegistry,
    matcher: M,
}

impl<'r> MatchEngine<'r, FirstMatchMatcher> {
    pub fn new(registry: &'r TargetRegistry, tolerance: f32) -> Result<Self, MatchError> {
        Ok(Self::with_matcher(registry, FirstMatchMatcher::new(tolerance)?))
    }
}

impl<'r, M: Matcher> MatchEngine<'r, M> {
    pub fn with_matcher(registry: &'r TargetRegistry, matcher: M) -> Self {
        Self { registry, matcher }
    }

    pub fn registry(&self) -> &TargetRegistry {
        self.registry
    }

    /// Decide whether `photo` contains any target.
    ///
    /// A photo without faces is a plain non-match. Encoding failures come
    /// back as errors for the caller to skip the photo.
    pub fn evaluate<E>(&self, photo: &PhotoCandidate, encoder: &mut E) -> Result<MatchVerdict, MatchError>
    where
        E: FaceEncoder + ?Sized,
    {
        let faces = encoder.encode(&photo.image)?;
        tracing::debug!(url = %photo.source_url, faces = faces.len(), "photo encoded");

        for (face_idx, face) in faces.iter().enumerate() {
            let Some(hit) = self.matcher.compare(&face.vector, self.registry) else {
                continue;
            };
            let Some(target) = self.registry.get(hit.index) else {
                continue;
            };
            tracing::debug!(
                face = face_idx,
                target = hit.index,
                label = %target.label,
                distance = hit.distance,
                "face matched target"
            );
            return Ok(MatchVerdict {
                matched: true,
                matched_label: Some(target.label.clone()),
                target_index: Some(hit.index),
                distance: Some(hit.distance),
            });
        }

        Ok(MatchVerdict::no_match())
    }
}
