//! Leadflow CLI - lead pipeline board driver.
//!
//! Commands:
//! - `leadflow import <seed.yaml>`: Create a board from a YAML seed
//! - `leadflow show`: Print stages and leads in order
//! - `leadflow drag <lead> --over <target>...`: Replay a drag gesture
//! - `leadflow check`: Verify stored orders
//! - `leadflow log`: Show the move log
//!
//! Environment variables:
//! - LEADFLOW_FAILURE_POLICY: `revert` or `mark_stale`
//! - LEADFLOW_SIBLING_SYNC: `moved_only` or `all_affected`
//! - LEADFLOW_PERSIST_UNCHANGED: `true` or `false`
//! - LEADFLOW_ACTOR: Name recorded in the move log
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error

mod cli;
mod commands;
mod seed;
mod state;

use clap::Parser;
use cli::{Cli, Commands};
use state::BoardHandle;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    configure_logging(cli.verbose, cli.debug, cli.quiet);

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let handle = BoardHandle::open(&cli.board, cli.config.as_deref())?;

    match cli.command {
        Commands::Import { seed, force } => commands::import(&handle, &seed, force).await,
        Commands::Show {
            pipeline,
            filter,
            json,
        } => commands::show(&handle, pipeline.as_deref(), filter.as_deref(), json).await,
        Commands::Drag {
            lead,
            over,
            cancel,
            filter,
        } => commands::drag(&handle, &lead, &over, cancel, filter.as_deref()).await,
        Commands::Check => commands::check(&handle).await,
        Commands::Log { limit } => commands::log(&handle, limit).await,
    }
}

fn configure_logging(verbose: bool, debug: bool, quiet: bool) {
    use tracing::Level;
    use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

    let log_level = if quiet {
        Level::ERROR
    } else if debug {
        Level::DEBUG
    } else if verbose {
        Level::TRACE
    } else {
        Level::WARN
    };

    let filter = EnvFilter::try_from_env("LEADFLOW_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("leadflow_board={log_level},leadflow={log_level},warn")));

    registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
