//! Style pipeline.
//!
//! Every style entry runs through seven stages in a fixed order:
//!
//! | Stage       | Effect                                                   |
//! |-------------|----------------------------------------------------------|
//! | `imports`   | inline local `@import` rules                             |
//! | `nesting`   | flatten nested rules                                     |
//! | `variables` | substitute `$variables`                                  |
//! | `math`      | evaluate `resolve()` expressions                         |
//! | `mixins`    | expand `@mixin` calls                                    |
//! | `utilities` | generate utility classes, expand `@apply`                |
//! | `finalize`  | lower and prefix for the browser targets                 |
//!
//! The result is written as `<name>.bundle.css` and announced to the preview
//! server with an inject signal, then printed minified as
//! `<name>.bundle.min.css`. An entry named `index` produces `styles`.

mod finalize;
mod imports;
mod math;
mod mixins;
mod nesting;
mod tree;
mod utilities;
mod variables;

use std::path::PathBuf;
use std::time::Instant;

use crate::error::{PipelineError, StageError};
use crate::runner::Pipeline;
use crate::sources::{self, SourceFile};
use crate::{BuildContext, Report, read_source, write_file};

/// Output basename used for `index` entries.
const DEFAULT_BASENAME: &str = "styles";

/// Error raised by a style stage.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("cannot resolve @import \"{specifier}\" from {}", from.display())]
    ImportNotFound { specifier: String, from: PathBuf },
    #[error("circular @import of {}", .0.display())]
    ImportCycle(PathBuf),
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("undefined variable ${0}")]
    UndefinedVariable(String),
    #[error("cannot evaluate `{expr}`: {message}")]
    Math { expr: String, message: String },
    #[error("unknown mixin `{0}`")]
    UnknownMixin(String),
    #[error("mixin `{name}`: {message}")]
    Mixin { name: String, message: String },
    #[error("unknown utility `{0}` in @apply")]
    UnknownUtility(String),
    #[error("{0}")]
    Css(String),
}

/// Run the style pipeline for every style entry.
pub fn run(ctx: &BuildContext) -> Result<Report, PipelineError> {
    let start = Instant::now();
    let config = ctx.config();
    let paths = &ctx.paths().styles;
    let root = ctx.root();

    let targets = finalize::targets(&config.styles.browsers).map_err(|e| StageError {
        pipeline: "styles",
        stage: "finalize",
        subject: root.to_path_buf(),
        source: e.into(),
    })?;
    let candidates = utilities::scan(root, &config.styles.content)?;
    tracing::debug!(count = candidates.len(), "Scanned utility candidates");

    let mut report = Report::default();
    for entry in sources::expand(root, &paths.src)? {
        let name = output_basename(&entry);
        let filename = entry.path.to_string_lossy().into_owned();

        let pipeline = Pipeline::new("styles")
            .stage("imports", |css: String| imports::inline(&css, &entry.path, root))
            .stage("nesting", |css: String| nesting::run(&css))
            .stage("variables", |css: String| variables::run(&css))
            .stage("math", |css: String| math::run(&css))
            .stage("mixins", |css: String| mixins::run(&css))
            .stage("utilities", |css: String| utilities::run(&css, &candidates))
            .stage("finalize", |css: String| {
                finalize::print(&css, &filename, targets, false)
            });

        let css = pipeline.run(&entry.path, read_source(&entry.path)?)?;

        let bundle = paths.dest.join(format!("{name}.bundle.css"));
        write_file(&bundle, &css)?;
        if let Some(url) = ctx.url_for(&bundle) {
            ctx.sink().inject(&url);
        }
        report.wrote(bundle);

        let minified = Pipeline::new("styles")
            .stage("minify", |css: String| {
                finalize::print(&css, &filename, targets, true)
            })
            .run(&entry.path, css)?;
        let bundle_min = paths.dest.join(format!("{name}.bundle.min.css"));
        write_file(&bundle_min, &minified)?;
        report.wrote(bundle_min);
    }

    tracing::info!(
        files = report.written.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Styles built"
    );
    Ok(report)
}

fn output_basename(entry: &SourceFile) -> String {
    match entry.path.file_stem().map(|s| s.to_string_lossy()) {
        Some(stem) if stem != "index" => stem.into_owned(),
        _ => DEFAULT_BASENAME.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Signal;
    use crate::testing::{context, write};
    use std::fs;

    const ENTRY: &str = r#"@import "tailwind/index.css";
@import "partials/vars.css";

@define-mixin pad $n {
  padding: resolve($n * 4px);
}

.card {
  color: $brand;
  @mixin pad 3;
  &:hover {
    color: $accent;
  }
  @media (min-width: 640px) {
    margin: resolve(2 * 8px);
  }
}
"#;

    fn fixture(root: &std::path::Path) {
        write(root, "src/styles/index.css", ENTRY);
        write(root, "src/styles/tailwind/index.css", "@tailwind base;\n@tailwind utilities;\n");
        write(root, "src/styles/partials/vars.css", "$brand: #336699;\n$accent: #996633;\n");
        write(root, "src/views/pages/Index/home.twig", "<main class=\"p-4 md:flex\"></main>");
    }

    #[test]
    fn test_style_pipeline_writes_both_bundles() {
        let temp = tempfile::tempdir().unwrap();
        fixture(temp.path());
        let (ctx, sink) = context(temp.path());

        let report = run(&ctx).unwrap();

        let dest = temp.path().join("dest/assets/css");
        let bundle = fs::read_to_string(dest.join("styles.bundle.css")).unwrap();
        let minified = fs::read_to_string(dest.join("styles.bundle.min.css")).unwrap();

        assert_eq!(report.written.len(), 2);
        assert!(!bundle.contains("@import"));
        assert!(!bundle.contains('$'));
        assert!(bundle.contains(".card:hover"));
        assert!(bundle.contains("padding: 12px"));
        assert!(bundle.contains(".p-4"));
        assert!(bundle.contains("min-width: 768px"));
        assert!(minified.len() <= bundle.len());
        assert_eq!(
            sink.signals(),
            vec![Signal::Inject("/assets/css/styles.bundle.css".to_owned())]
        );
    }

    #[test]
    fn test_failing_stage_is_named_and_nothing_written() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "src/styles/index.css", "a { color: $nope; }");
        let (ctx, sink) = context(temp.path());

        let err = run(&ctx).unwrap_err();

        let PipelineError::Stage(stage) = err else {
            panic!("expected stage error, got {err:?}");
        };
        assert_eq!(stage.stage, "variables");
        assert!(!temp.path().join("dest/assets/css/styles.bundle.css").exists());
        assert!(sink.signals().is_empty());
    }

    #[test]
    fn test_output_basename() {
        let entry = |path: &str| SourceFile {
            path: PathBuf::from(path),
            base: PathBuf::from("/p/src/styles"),
        };

        assert_eq!(output_basename(&entry("/p/src/styles/index.css")), "styles");
        assert_eq!(output_basename(&entry("/p/src/styles/print.css")), "print");
    }
}
