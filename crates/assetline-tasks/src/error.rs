//! Orchestration errors.

use std::fmt;

use assetline_pipeline::PipelineError;

use crate::task::Task;

/// A task that failed, with its cause.
#[derive(Debug)]
pub struct TaskFailure {
    pub task: Task,
    pub error: PipelineError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.task, self.error)
    }
}

/// Error returned by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The clean phase failed; nothing was built.
    #[error("clean failed: {0}")]
    Clean(#[source] PipelineError),

    /// One or more build tasks failed. Every sibling still ran.
    #[error("{} task(s) failed: {}", .0.len(), failed_names(.0))]
    Build(Vec<TaskFailure>),

    /// The preview server could not start or stopped with an error.
    #[error(transparent)]
    Server(#[from] assetline_server::ServerError),

    /// The watcher could not start.
    #[error(transparent)]
    Watch(#[from] assetline_watch::WatchError),

    /// A blocking task panicked.
    #[error("task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn failed_names(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(|f| f.task.name())
        .collect::<Vec<_>>()
        .join(", ")
}
