//! CLI command implementations.

mod dev;
mod run;

use std::path::PathBuf;
use std::sync::Arc;

use assetline_config::{CliSettings, Config};
use assetline_tasks::{Orchestrator, TaskGraph};
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

pub(crate) use dev::DevArgs;
pub(crate) use run::RunArgs;

/// Flags accepted by every command.
#[derive(Args)]
pub(crate) struct GlobalArgs {
    /// Path to configuration file (default: auto-discover assetline.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output (per-file logs and timings).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// `assetline build`: clean and build everything once.
pub(crate) async fn build(global: &GlobalArgs) -> Result<(), CliError> {
    run_graph(global, None, &TaskGraph::build()).await
}

/// `assetline clean`: delete the output directory.
pub(crate) async fn clean(global: &GlobalArgs) -> Result<(), CliError> {
    run_graph(global, None, &TaskGraph::single(assetline_tasks::Task::Clean)).await
}

/// Load configuration and drive `graph` with console progress output.
async fn run_graph(
    global: &GlobalArgs,
    settings: Option<&CliSettings>,
    graph: &TaskGraph,
) -> Result<(), CliError> {
    let config = Config::load(global.config.as_deref(), settings)?;
    if let Some(path) = &config.config_path {
        tracing::info!(path = %path.display(), "Loaded configuration");
    }
    let orchestrator = Orchestrator::new(Arc::new(config), Arc::new(Output::new()));
    orchestrator.run(graph).await?;
    Ok(())
}
