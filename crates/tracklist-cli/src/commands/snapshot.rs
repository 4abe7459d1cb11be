//! Snapshot inspection commands

use clap::{Args, Subcommand};
use serde_json::Value;
use tracklist_core::model::{EntityType, Snapshot};
use tracklist_core::{Clock, EntityRegistry, TrackerConfig};
use tracklist_store::FsSnapshotStore;

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub command: SnapshotCommand,
}

#[derive(Debug, Subcommand)]
pub enum SnapshotCommand {
    /// Print the latest snapshot (or every retained revision) of an identifier
    Show(ShowArgs),
    /// List tracked identifiers with their snapshot age
    Ls(LsArgs),
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub entity_type: String,
    pub identifier: String,

    /// Print every retained revision, oldest first
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct LsArgs {
    pub entity_type: String,

    /// Only identifiers due for a refresh
    #[arg(long)]
    pub stale: bool,
}

pub fn execute(
    args: SnapshotArgs,
    config: &TrackerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        SnapshotCommand::Show(show) => execute_show(show, config),
        SnapshotCommand::Ls(ls) => execute_ls(ls, config),
    }
}

fn open_store(
    raw_entity_type: &str,
    config: &TrackerConfig,
) -> Result<(FsSnapshotStore, EntityRegistry), Box<dyn std::error::Error>> {
    let entity_type: EntityType = raw_entity_type.parse()?;
    let registry = EntityRegistry::from_config(config);
    let spec = registry.get(entity_type)?;
    let store = FsSnapshotStore::new(config.snapshot_dir(), entity_type, spec.snapshot_retention);
    Ok((store, registry))
}

fn execute_show(args: ShowArgs, config: &TrackerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (store, _) = open_store(&args.entity_type, config)?;

    if args.all {
        let revisions: Vec<Snapshot<Value>> = store.history(&args.identifier)?;
        println!("{}", serde_json::to_string_pretty(&revisions)?);
        return Ok(());
    }

    match store.get_latest::<Value>(&args.identifier)? {
        Some(snapshot) => {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        None => Err(format!("no snapshot for '{}'", args.identifier).into()),
    }
}

fn execute_ls(args: LsArgs, config: &TrackerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (store, registry) = open_store(&args.entity_type, config)?;
    let threshold = registry.get(store.entity_type())?.detector.staleness_threshold;
    let now = store.clock().now();

    for identifier in store.identifiers()? {
        let Some(snapshot) = store.get_latest::<Value>(&identifier)? else {
            continue;
        };
        let age = snapshot.age(now);
        if args.stale && age < threshold {
            continue;
        }
        println!(
            "{}\t{}\t{}h",
            identifier,
            snapshot.stored_at.to_rfc3339(),
            age.num_hours()
        );
    }
    Ok(())
}
