//! `assetline dev` command implementation.

use assetline_config::CliSettings;
use assetline_tasks::TaskGraph;
use clap::Args;

use super::{GlobalArgs, run_graph};
use crate::error::CliError;

/// Arguments for the dev command.
#[derive(Args, Default)]
pub(crate) struct DevArgs {
    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable live reload (default: enabled).
    #[arg(long)]
    live_reload: Option<bool>,

    /// Disable live reload.
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,
}

impl DevArgs {
    /// Clean, build everything, then serve until Ctrl-C.
    pub(crate) async fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let settings = self.settings();
        run_graph(global, Some(&settings), &TaskGraph::dev()).await
    }

    /// Config overrides from the flags.
    pub(crate) fn settings(&self) -> CliSettings {
        CliSettings {
            host: self.host.clone(),
            port: self.port,
            live_reload_enabled: self.no_live_reload.then_some(false).or(self.live_reload),
        }
    }
}
