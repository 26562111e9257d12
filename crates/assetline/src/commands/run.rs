//! `assetline run <task>` command implementation.

use assetline_tasks::{Task, TaskGraph};
use clap::Args;

use super::{GlobalArgs, run_graph};
use crate::error::CliError;

/// Arguments for the run command.
#[derive(Args)]
pub(crate) struct RunArgs {
    /// Task to run: clean, styles, scripts, views, images, resync or serve.
    pub task: Task,
}

impl RunArgs {
    pub(crate) async fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        run_graph(global, None, &TaskGraph::single(self.task)).await
    }
}
