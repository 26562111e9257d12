//! Script pipeline.
//!
//! Every file matching the script globs is an entry. Its module graph is
//! lowered to the configured ECMAScript target and bundled into
//! `<name>.bundle.js`, announced with an inject signal, then
//! minified into `<name>.bundle.min.js`. Directory nesting is flattened: both
//! files land directly in the script destination.

mod bundle;
mod lexer;
mod minify;
mod resolve;
mod transpile;

use std::path::PathBuf;
use std::time::Instant;

use crate::error::{PipelineError, StageError};
use crate::runner::Pipeline;
use crate::sources::{self, SourceFile};
use crate::{BuildContext, Report, read_source, write_file};
use transpile::Transpiler;

/// Error raised by a script stage.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("cannot resolve \"{specifier}\" from {}", from.display())]
    Unresolved { specifier: String, from: PathBuf },

    #[error("{}: {message}", path.display())]
    Syntax { path: PathBuf, message: String },

    #[error("invalid JSON module {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Minify(String),

    #[error("unsupported script target \"{target}\": {message}")]
    Target { target: String, message: String },
}

/// Run the script pipeline for every script entry.
pub fn run(ctx: &BuildContext) -> Result<Report, PipelineError> {
    let start = Instant::now();
    let paths = &ctx.paths().scripts;
    let root = ctx.root();
    let entries = sources::expand(root, &paths.src)?;
    if entries.is_empty() {
        return Ok(Report::default());
    }
    let transpiler = Transpiler::new(&ctx.config().scripts).map_err(|source| StageError {
        pipeline: "scripts",
        stage: "bundle",
        subject: root.to_path_buf(),
        source: source.into(),
    })?;

    let mut report = Report::default();
    for entry in entries {
        let name = output_stem(&entry);

        let bundled = Pipeline::new("scripts")
            .stage("bundle", |source: String| {
                bundle::bundle(&entry.path, source, root, &transpiler)
            })
            .run(&entry.path, read_source(&entry.path)?)?;
        let bundle_path = paths.dest.join(format!("{name}.bundle.js"));
        write_file(&bundle_path, &bundled)?;
        if let Some(url) = ctx.url_for(&bundle_path) {
            ctx.sink().inject(&url);
        }
        report.wrote(bundle_path);

        let minified = Pipeline::new("scripts")
            .stage("minify", |code: String| {
                minify::minify(&code).map_err(ScriptError::Minify)
            })
            .run(&entry.path, bundled)?;
        let min_path = paths.dest.join(format!("{name}.bundle.min.js"));
        write_file(&min_path, &minified)?;
        report.wrote(min_path);
    }

    tracing::info!(
        files = report.written.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Scripts built"
    );
    Ok(report)
}

fn output_stem(entry: &SourceFile) -> String {
    entry
        .path
        .file_stem()
        .map_or_else(|| "bundle".to_owned(), |s| s.to_string_lossy().into_owned())
}
