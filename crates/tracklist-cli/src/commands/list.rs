//! List inspection commands

use clap::{Args, Subcommand};
use tracklist_core::model::SourceType;
use tracklist_core::ports::ListQueryPort;
use tracklist_core::TrackerConfig;
use tracklist_store::SqliteListStore;

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(subcommand)]
    pub command: ListCommand,
}

#[derive(Debug, Subcommand)]
pub enum ListCommand {
    /// Every list with its item count
    Ls,
    /// Items of the list for a source type
    Items(ItemsArgs),
}

#[derive(Debug, Args)]
pub struct ItemsArgs {
    /// Source type: github-repository, obsidian-plugin, obsidian-theme or archived
    pub source_type: String,

    /// Print full item metadata as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ListArgs, config: &TrackerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let path = config.list_db_path();
    if !path.exists() {
        return Err(format!("no list store at {}", path.display()).into());
    }
    let store = SqliteListStore::open(&path)?;

    match args.command {
        ListCommand::Ls => {
            for list in store.lists()? {
                let items = store.items_in_list(&list.id)?;
                println!(
                    "{}\t{}\t{}\t{} items",
                    list.id,
                    list.source_type.as_str(),
                    list.name,
                    items.len()
                );
            }
        }
        ListCommand::Items(items_args) => {
            let source_type: SourceType = items_args.source_type.parse()?;
            let Some(list) = store.find_by_source_type(source_type)? else {
                return Err(format!("no list for source type '{}'", source_type).into());
            };
            let items = store.items_in_list(&list.id)?;
            if items_args.json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in items {
                    println!(
                        "{}\t{}\t{}",
                        item.full_name,
                        item.entity_id.as_deref().unwrap_or("-"),
                        item.updated_at.to_rfc3339()
                    );
                }
            }
        }
    }
    Ok(())
}
