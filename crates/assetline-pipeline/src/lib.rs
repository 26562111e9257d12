//! Asset pipelines for Assetline.
//!
//! Each asset category has a pipeline that expands its source globs, runs
//! every file through a fixed sequence of named stages, and writes the result
//! below the category's destination directory:
//!
//! - [`styles`]: import inlining, nesting, variables, math, mixins, utility
//!   classes, then lowering/prefixing with `lightningcss`
//! - [`scripts`]: module bundling and minification
//! - [`views`]: template rendering with route flattening
//! - [`images`]: per-format compression with up-to-date checks
//!
//! Pipelines are synchronous. They signal the preview server through the
//! [`ReloadSink`] held by their [`BuildContext`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use assetline_config::Config;
//! use assetline_pipeline::{BuildContext, NoopSink, styles};
//!
//! let ctx = BuildContext::new(Arc::new(Config::load(None, None)?), Arc::new(NoopSink));
//! let report = styles::run(&ctx)?;
//! ```

mod error;
mod runner;
mod signal;
mod sources;

pub mod clean;
pub mod images;
pub mod resync;
pub mod scripts;
pub mod styles;
pub mod views;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetline_config::{Config, PathTable};

pub use error::{BoxError, PipelineError, StageError};
pub use runner::Pipeline;
pub use signal::{NoopSink, ReloadSink};
#[cfg(any(test, feature = "mock"))]
pub use signal::{RecordingSink, Signal};
pub use sources::{SourceFile, expand};

/// Shared inputs of every pipeline run.
#[derive(Clone)]
pub struct BuildContext {
    config: Arc<Config>,
    sink: Arc<dyn ReloadSink>,
}

impl BuildContext {
    /// Create a context from loaded configuration and a reload sink.
    #[must_use]
    pub fn new(config: Arc<Config>, sink: Arc<dyn ReloadSink>) -> Self {
        Self { config, sink }
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolved path table.
    #[must_use]
    pub fn paths(&self) -> &PathTable {
        &self.config.path_table
    }

    /// Project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.config.root()
    }

    /// Reload sink.
    #[must_use]
    pub fn sink(&self) -> &dyn ReloadSink {
        self.sink.as_ref()
    }

    /// URL path under which the preview server serves `path`.
    ///
    /// Returns `None` for files outside the output root.
    #[must_use]
    pub fn url_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.paths().dest).ok()?;
        let segments: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(format!("/{}", segments.join("/")))
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("root", &self.root())
            .finish_non_exhaustive()
    }
}

/// Files touched by one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
    /// Sources skipped because their output was up to date.
    pub skipped: Vec<PathBuf>,
}

impl Report {
    pub(crate) fn wrote(&mut self, path: PathBuf) {
        self.written.push(path);
    }
}

/// Write `contents` to `path`, creating parent directories.
pub(crate) fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(PipelineError::io(parent))?;
    }
    fs::write(path, contents).map_err(PipelineError::io(path))?;
    tracing::debug!(path = %path.display(), "Wrote file");
    Ok(())
}

/// Read a UTF-8 source file.
pub(crate) fn read_source(path: &Path) -> Result<String, PipelineError> {
    fs::read_to_string(path).map_err(PipelineError::io(path))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;
    use std::sync::Arc;

    use assetline_config::Config;

    use super::{BuildContext, RecordingSink};

    /// Context rooted at `root` with default configuration.
    pub(crate) fn context(root: &Path) -> (BuildContext, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let config = Arc::new(Config::default_with_base(root));
        (BuildContext::new(config, Arc::clone(&sink) as _), sink)
    }

    /// Write a fixture file below `root`.
    pub(crate) fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}
