//! Pipeline error types.

use std::path::{Path, PathBuf};

/// Boxed error returned by a single stage.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Filesystem error while reading sources or writing outputs.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A source glob could not be compiled.
    #[error("Invalid glob pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// A named stage failed.
    #[error(transparent)]
    Stage(#[from] StageError),
    /// The clean step refused to delete a directory.
    #[error("Refusing to clean {}: {reason}", path.display())]
    UnsafeClean { path: PathBuf, reason: String },
}

impl PipelineError {
    /// Build an [`PipelineError::Io`] for `path`.
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Failure of one named stage, tagged with the pipeline and input it ran on.
#[derive(Debug, thiserror::Error)]
#[error("{pipeline} failed at `{stage}` ({}): {source}", subject.display())]
pub struct StageError {
    /// Pipeline name (`styles`, `scripts`, ...).
    pub pipeline: &'static str,
    /// Stage name within the pipeline.
    pub stage: &'static str,
    /// File the pipeline was processing.
    pub subject: PathBuf,
    /// Underlying cause.
    #[source]
    pub source: BoxError,
}
