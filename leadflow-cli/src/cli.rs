//! Command line definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "leadflow")]
#[command(version)]
#[command(about = "Drag-and-drop lead pipeline board")]
#[command(long_about = "
Leadflow keeps CRM leads in ordered pipeline stages on disk and replays
drag gestures against them with optimistic persistence.

Global arguments can be used with any command:
  --board       Board directory (default: .leadflow)
  --config      Engine config file (YAML, TOML or JSON)
  --verbose     Show detailed information and trace output
  --debug       Enable debug logging
  --quiet       Suppress all output except errors

Example usage:
  leadflow import seed.yaml                       # Create a board from a seed
  leadflow show --filter acme                     # Show matching leads
  leadflow drag 01J0LEAD --over won               # Move a lead to the end of a stage
  leadflow drag 01J0LEAD --over won:0             # Drop before the first visible lead
  leadflow check                                  # Verify stored orders
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Board directory, or a directory containing .leadflow
    #[arg(long, global = true, default_value = ".leadflow")]
    pub board: PathBuf,

    /// Engine config file, overriding <board>/leadflow.yaml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a board from a YAML seed file
    Import {
        /// Seed file path
        seed: PathBuf,

        /// Replace an existing board
        #[arg(long)]
        force: bool,
    },

    /// Print stages and their leads in order
    Show {
        /// Only show this pipeline
        #[arg(long)]
        pipeline: Option<String>,

        /// Only show leads matching this term (`#tag` for exact tags)
        #[arg(long)]
        filter: Option<String>,

        /// Print the board as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a drag gesture and persist the result
    Drag {
        /// Lead to drag
        lead: String,

        /// Hover targets in order: a lead id, a stage id, or `<stage>:<n>`
        /// for the n-th visible lead of a stage
        #[arg(long = "over", required = true, num_args = 1..)]
        over: Vec<String>,

        /// Cancel instead of dropping
        #[arg(long)]
        cancel: bool,

        /// Filter applied while dragging
        #[arg(long)]
        filter: Option<String>,
    },

    /// Verify stored orders and references
    Check,

    /// Show the move log, newest first
    Log {
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,
    },
}
