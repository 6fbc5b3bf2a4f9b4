//! photopick-core — Face matching for gallery photo selection.
//!
//! Encodes faces with SCRFD detection and ArcFace recognition via ONNX
//! Runtime, builds the registry of target identities from reference photos,
//! and decides per photo whether any target appears in it.

pub mod alignment;
pub mod detector;
pub mod encoder;
pub mod matcher;
pub mod recognizer;
pub mod registry;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use encoder::{EncoderError, FaceEncoder, OnnxFaceEncoder};
pub use matcher::{FirstMatchMatcher, MatchEngine, MatchError, Matcher, DEFAULT_TOLERANCE};
pub use registry::{load_targets, RegistryError, TargetRegistry};
pub use types::{BoundingBox, DetectedFace, IdentityVector, MatchVerdict, PhotoCandidate, TargetIdentity};

use std::path::PathBuf;

/// Default model directory: `$XDG_DATA_HOME/photopick/models`, falling back
/// to `~/.local/share/photopick/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("photopick")
        .join("models")
}
