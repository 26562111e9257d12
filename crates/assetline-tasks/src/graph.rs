//! The task graph.
//!
//! Every entry point runs the same three phases, some possibly empty:
//!
//! ```text
//! clean ──► build (parallel) ──► serve (server + watch)
//! ```

use assetline_config::Category;

use crate::task::Task;

/// Which phases to run and which tasks make up the build phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskGraph {
    /// Delete the output directory first.
    pub clean: bool,
    /// Tasks run in parallel once cleaning succeeded.
    pub build: Vec<Task>,
    /// Serve and watch once every build task completed.
    pub serve: bool,
}

impl TaskGraph {
    /// Full development sequence: clean, build everything, serve.
    #[must_use]
    pub fn dev() -> Self {
        Self {
            serve: true,
            ..Self::build()
        }
    }

    /// One-shot build: clean, then build everything.
    #[must_use]
    pub fn build() -> Self {
        Self {
            clean: true,
            build: Category::ALL.into_iter().map(Task::Build).collect(),
            serve: false,
        }
    }

    /// A single named task with no surrounding phases.
    #[must_use]
    pub fn single(task: Task) -> Self {
        match task {
            Task::Clean => Self {
                clean: true,
                build: Vec::new(),
                serve: false,
            },
            Task::Serve => Self {
                clean: false,
                build: Vec::new(),
                serve: true,
            },
            task => Self {
                clean: false,
                build: vec![task],
                serve: false,
            },
        }
    }

    /// Whether the graph does nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.clean && self.build.is_empty() && !self.serve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dev_runs_every_phase() {
        let graph = TaskGraph::dev();

        assert!(graph.clean);
        assert!(graph.serve);
        assert_eq!(
            graph.build,
            vec![
                Task::Build(Category::Styles),
                Task::Build(Category::Scripts),
                Task::Build(Category::Views),
                Task::Build(Category::Images),
            ]
        );
    }

    #[test]
    fn test_build_does_not_serve() {
        let graph = TaskGraph::build();

        assert!(graph.clean);
        assert!(!graph.serve);
        assert_eq!(graph.build.len(), 4);
    }

    #[test]
    fn test_single_tasks() {
        assert_eq!(
            TaskGraph::single(Task::Clean),
            TaskGraph {
                clean: true,
                build: vec![],
                serve: false
            }
        );
        assert_eq!(
            TaskGraph::single(Task::Resync),
            TaskGraph {
                clean: false,
                build: vec![Task::Resync],
                serve: false
            }
        );
        assert!(TaskGraph::single(Task::Serve).serve);
        assert!(!TaskGraph::single(Task::Serve).is_empty());
    }
}
