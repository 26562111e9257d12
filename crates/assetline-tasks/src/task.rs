//! Named tasks.

use std::fmt;
use std::str::FromStr;

use assetline_config::Category;
use assetline_pipeline::{BuildContext, PipelineError, Report, clean, images, resync, scripts, styles, views};

/// A task that can be run on its own, by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    /// Delete the output directory.
    Clean,
    /// Run the pipeline of one asset category.
    Build(Category),
    /// Re-deposit the style entry and request a full reload.
    Resync,
    /// Serve the output directory and watch for changes.
    Serve,
}

impl Task {
    /// Every task, in the order they are listed to users.
    pub const ALL: [Task; 7] = [
        Task::Clean,
        Task::Build(Category::Styles),
        Task::Build(Category::Scripts),
        Task::Build(Category::Views),
        Task::Build(Category::Images),
        Task::Resync,
        Task::Serve,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Task::Clean => "clean",
            Task::Build(category) => category.name(),
            Task::Resync => "resync",
            Task::Serve => "serve",
        }
    }

    /// Run a synchronous task to completion.
    ///
    /// `Serve` is long-running and is driven by the orchestrator instead; here
    /// it does nothing.
    pub fn run(self, ctx: &BuildContext) -> Result<Report, PipelineError> {
        match self {
            Task::Clean => {
                clean::clean(ctx.root(), &ctx.paths().dest)?;
                Ok(Report::default())
            }
            Task::Build(Category::Styles) => styles::run(ctx),
            Task::Build(Category::Scripts) => scripts::run(ctx),
            Task::Build(Category::Views) => views::run(ctx),
            Task::Build(Category::Images) => images::run(ctx),
            Task::Resync => {
                let touched = resync::run(ctx)?;
                Ok(Report {
                    written: touched.into_iter().collect(),
                    skipped: Vec::new(),
                })
            }
            Task::Serve => Ok(Report::default()),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Task::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Task::ALL.iter().map(|t| t.name()).collect();
                format!("unknown task `{s}` (expected one of: {})", names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetline_config::Config;
    use assetline_pipeline::{RecordingSink, Signal};
    use std::fs;
    use std::sync::Arc;

    #[test]
    fn test_names_round_trip() {
        for task in Task::ALL {
            assert_eq!(task.name().parse::<Task>(), Ok(task));
        }
    }

    #[test]
    fn test_unknown_task_lists_choices() {
        let err = "deploy".parse::<Task>().unwrap_err();

        assert!(err.contains("deploy"));
        assert!(err.contains("clean, styles, scripts, views, images, resync, serve"));
    }

    #[test]
    fn test_resync_task_reports_touched_file() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/styles")).unwrap();
        fs::write(temp.path().join("src/styles/index.css"), "a {}").unwrap();
        let sink = Arc::new(RecordingSink::new());
        let ctx = BuildContext::new(
            Arc::new(Config::default_with_base(temp.path())),
            Arc::clone(&sink) as _,
        );

        let report = Task::Resync.run(&ctx).unwrap();

        assert_eq!(report.written, vec![temp.path().join("src/styles/index.css")]);
        assert_eq!(sink.signals(), vec![Signal::Reload]);
    }
}
