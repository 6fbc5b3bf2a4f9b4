//! Target registry: reference photos of the people to look for.

use crate::encoder::FaceEncoder;
use crate::types::TargetIdentity;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reference image extensions, compared case-sensitively.
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["jpg", "png"];

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("cannot read target directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no target faces found in {0}; add reference photos with a clearly visible face")]
    Empty(PathBuf),
}

/// Ordered, immutable set of targets built once per run.
///
/// Labels are not deduplicated; matching works on positions, so two
/// targets sharing a label stay distinct entries.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: Vec<TargetIdentity>,
}

impl TargetRegistry {
    pub fn from_identities(targets: Vec<TargetIdentity>) -> Self {
        Self { targets }
    }

    /// Encode every reference image in `dir`, in file name order.
    ///
    /// Only the first face of each image is kept. Images without a
    /// detectable face, or that fail to decode or encode, are skipped with
    /// a warning. An unreadable directory is an error; an empty result is
    /// not (see [`load_targets`]).
    pub fn build<E>(dir: &Path, encoder: &mut E) -> Result<Self, RegistryError>
    where
        E: FaceEncoder + ?Sized,
    {
        let read_err = |source| RegistryError::ReadDir { path: dir.to_path_buf(), source };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if path.is_file() && is_accepted(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut targets = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(label) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            tracing::info!(path = %path.display(), "loading target image");

            let image = match image::open(&path) {
                Ok(img) => img.to_rgb8(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot decode target image; skipping");
                    continue;
                }
            };

            match encoder.encode_first(&image) {
                Ok(Some(face)) => {
                    tracing::debug!(label = %label, dim = face.vector.dim(), "target registered");
                    targets.push(TargetIdentity { label, vector: face.vector });
                }
                Ok(None) => {
                    tracing::warn!(path = %path.display(), "no face detected in target image; skipping");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "face encoding failed for target image; skipping");
                }
            }
        }

        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TargetIdentity> {
        self.targets.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TargetIdentity> {
        self.targets.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.label.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a TargetRegistry {
    type Item = &'a TargetIdentity;
    type IntoIter = std::slice::Iter<'a, TargetIdentity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Build the registry and reject an empty result: there is nothing to match against.
pub fn load_targets<E>(dir: &Path, encoder: &mut E) -> Result<TargetRegistry, RegistryError>
where
    E: FaceEncoder + ?Sized,
{
    let registry = TargetRegistry::build(dir, encoder)?;
    if registry.is_empty() {
        return Err(RegistryError::Empty(dir.to_path_buf()));
    }
    tracing::info!(count = registry.len(), labels = ?registry.labels(), "target registry ready");
    Ok(registry)
}

fn is_accepted(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ACCEPTED_EXTENSIONS.contains(&e))
}
