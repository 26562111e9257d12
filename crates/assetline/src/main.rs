//! Assetline CLI - static-site asset pipeline.
//!
//! Provides commands for:
//! - `dev` (the default): clean, build everything, then serve with live reload
//! - `build`: clean and build everything once
//! - `clean`: delete the output directory
//! - `run <task>`: run one named task

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DevArgs, GlobalArgs, RunArgs};
use error::CliError;
use output::Output;

/// Assetline - static-site asset pipeline.
#[derive(Parser)]
#[command(name = "assetline", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, build everything, then serve with live reload (default).
    Dev(DevArgs),
    /// Clean and build everything once.
    Build,
    /// Delete the output directory.
    Clean,
    /// Run a single task.
    Run(RunArgs),
}

impl Cli {
    async fn execute(self) -> Result<(), CliError> {
        let global = self.global;
        match self.command.unwrap_or_else(|| Commands::Dev(DevArgs::default())) {
            Commands::Dev(args) => args.execute(&global).await,
            Commands::Build => commands::build(&global).await,
            Commands::Clean => commands::clean(&global).await,
            Commands::Run(args) => args.execute(&global).await,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.global.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = tokio::runtime::Runtime::new()
        .map_err(CliError::from)
        .and_then(|rt| rt.block_on(cli.execute()));

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetline_tasks::Task;
    use std::path::PathBuf;

    #[test]
    fn test_no_subcommand_means_dev() {
        let cli = Cli::try_parse_from(["assetline"]).unwrap();

        assert!(cli.command.is_none());
        assert!(!cli.global.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["assetline", "build", "--config", "site/assetline.toml", "-v"])
                .unwrap();

        assert!(matches!(cli.command, Some(Commands::Build)));
        assert_eq!(cli.global.config, Some(PathBuf::from("site/assetline.toml")));
        assert!(cli.global.verbose);
    }

    #[test]
    fn test_run_parses_task_name() {
        let cli = Cli::try_parse_from(["assetline", "run", "styles"]).unwrap();

        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.task, "styles".parse::<Task>().unwrap());
    }

    #[test]
    fn test_run_rejects_unknown_task() {
        assert!(Cli::try_parse_from(["assetline", "run", "deploy"]).is_err());
    }

    #[test]
    fn test_dev_port_override() {
        let cli = Cli::try_parse_from(["assetline", "dev", "--port", "8080", "--no-live-reload"])
            .unwrap();

        let Some(Commands::Dev(args)) = cli.command else {
            panic!("expected dev command");
        };
        let settings = args.settings();
        assert_eq!(settings.port, Some(8080));
        assert_eq!(settings.live_reload_enabled, Some(false));
    }
}
