//! tracklist CLI
//!
//! Operator view over the change log, the snapshot store and the lists.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracklist_core::logging_facility::{self, Profile};
use tracklist_core::TrackerConfig;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "tracklist")]
#[command(about = "tracklist - change history and list reconciliation", long_about = None)]
struct Cli {
    /// Config file; falls back to $TRACKLIST_CONFIG, then built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output: dev (human-readable) or prod (JSON)
    #[arg(long, global = true, default_value = "dev")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Change history audit
    History(commands::history::HistoryArgs),
    /// Snapshot inspection
    Snapshot(commands::snapshot::SnapshotArgs),
    /// List and list item inspection
    List(commands::list::ListArgs),
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let profile = Profile::from_name(&cli.log)
        .ok_or_else(|| format!("unknown log profile '{}', expected dev or prod", cli.log))?;
    logging_facility::init(profile);

    let config = TrackerConfig::resolve(cli.config.as_deref())?;
    tracing::debug!(data_dir = %config.data_dir.display(), "config resolved");

    match cli.command {
        Commands::History(args) => commands::history::execute(args, &config),
        Commands::Snapshot(args) => commands::snapshot::execute(args, &config),
        Commands::List(args) => commands::list::execute(args, &config),
    }
}

fn main() {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
