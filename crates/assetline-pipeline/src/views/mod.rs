//! View pipeline.
//!
//! Page templates are rendered with `minijinja`. The loader is rooted at the
//! views root, so `{% extends "layouts/base.twig" %}` and
//! `{% include "partials/nav.twig" %}` resolve against it regardless of where
//! the page lives. Output paths are flattened and stripped of marker
//! directories by [`route::output_path`].

mod route;

use std::path::{Path, PathBuf};
use std::time::Instant;

use minijinja::{AutoEscape, Environment, Value, path_loader};
use serde_json::{Map, json};

use crate::error::{PipelineError, StageError};
use crate::runner::Pipeline;
use crate::sources;
use crate::{BuildContext, Report, read_source, write_file};

/// Error raised while rendering a view.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("invalid view data {}: {source}", path.display())]
    Data {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("view data {} must be a JSON object", .0.display())]
    DataNotObject(PathBuf),

    #[error("template {} is outside the views root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error(transparent)]
    Template(#[from] minijinja::Error),
}

/// Render every page template.
pub fn run(ctx: &BuildContext) -> Result<Report, PipelineError> {
    let start = Instant::now();
    let config = ctx.config();
    let paths = &ctx.paths().views;
    let views_root = config.views_root();

    let data = match config.views_data() {
        Some(path) => load_data(&path)?,
        None => Map::new(),
    };
    let env = environment(&views_root);

    let mut report = Report::default();
    for page in sources::expand(ctx.root(), &paths.src)? {
        let output = route::output_path(
            page.relative(),
            config.views.flatten,
            &config.views.strip_segments,
        );
        let route = route::route(&output);

        let html = Pipeline::new("views")
            .stage("render", |source: String| {
                let name = template_name(&page.path, &views_root)?;
                let mut context = data.clone();
                context.insert("page".to_owned(), json!({ "path": &name, "route": &route }));
                env.render_named_str(&name, &source, Value::from_serialize(&context))
                    .map_err(ViewError::from)
            })
            .run(&page.path, read_source(&page.path)?)?;

        let target = paths.dest.join(&output);
        write_file(&target, html)?;
        tracing::debug!(route = %route, path = %target.display(), "Rendered view");
        report.wrote(target);
    }

    tracing::info!(
        files = report.written.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Views built"
    );
    Ok(report)
}

fn environment(views_root: &Path) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(path_loader(views_root));
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.set_keep_trailing_newline(true);
    env
}

/// Loader name of `path`: its `/`-separated path below the views root.
fn template_name(path: &Path, views_root: &Path) -> Result<String, ViewError> {
    let relative = path
        .strip_prefix(views_root)
        .map_err(|_| ViewError::OutsideRoot {
            path: path.to_path_buf(),
            root: views_root.to_path_buf(),
        })?;
    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Ok(segments.join("/"))
}

fn load_data(path: &Path) -> Result<Map<String, serde_json::Value>, PipelineError> {
    let text = read_source(path)?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| StageError {
            pipeline: "views",
            stage: "render",
            subject: path.to_path_buf(),
            source: ViewError::Data {
                path: path.to_path_buf(),
                source,
            }
            .into(),
        })?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StageError {
            pipeline: "views",
            stage: "render",
            subject: path.to_path_buf(),
            source: ViewError::DataNotObject(path.to_path_buf()).into(),
        }
        .into()),
    }
}
