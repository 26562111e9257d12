//! Output directory removal.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path};

use crate::error::PipelineError;

/// Delete `dest` and everything below it.
///
/// A missing directory counts as success. `dest` must be a strict
/// subdirectory of `root`; anything else is refused without touching the
/// filesystem.
pub fn clean(root: &Path, dest: &Path) -> Result<(), PipelineError> {
    if dest == root
        || !dest.starts_with(root)
        || dest.components().any(|c| matches!(c, Component::ParentDir))
    {
        return Err(PipelineError::UnsafeClean {
            path: dest.to_path_buf(),
            reason: format!("not a subdirectory of {}", root.display()),
        });
    }

    match fs::remove_dir_all(dest) {
        Ok(()) => {
            tracing::info!(path = %dest.display(), "Removed output directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %dest.display(), "Output directory already absent");
            Ok(())
        }
        Err(e) => Err(PipelineError::io(dest)(e)),
    }
}
