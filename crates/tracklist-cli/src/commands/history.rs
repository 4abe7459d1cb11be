//! Change history audit command

use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use serde_json::json;
use tracklist_core::detector::diff_fields;
use tracklist_core::model::{ChangeType, EntityType};
use tracklist_core::{EntityRegistry, TrackerConfig};
use tracklist_store::change_log::change_log_path;
use tracklist_store::{ChangeQuery, SqliteChangeLog};

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Entity type: github-repository, obsidian-plugin or obsidian-theme
    pub entity_type: String,

    /// Only changes at or after this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,

    /// Comma-separated change types to include (add, full, soft, removal)
    #[arg(long = "type", value_delimiter = ',')]
    pub types: Vec<String>,

    #[arg(long)]
    pub limit: Option<usize>,

    /// Restrict to a single tracked identifier
    #[arg(long)]
    pub identifier: Option<String>,
}

pub fn execute(
    args: HistoryArgs,
    config: &TrackerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let entity_type: EntityType = args.entity_type.parse()?;

    let mut query = ChangeQuery::new();
    if let Some(since) = &args.since {
        query = query.since(parse_since(since)?);
    }
    if !args.types.is_empty() {
        let types = args
            .types
            .iter()
            .map(|t| t.parse::<ChangeType>())
            .collect::<Result<Vec<_>, _>>()?;
        query = query.types(types);
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    if let Some(identifier) = args.identifier {
        query = query.for_identifier(identifier);
    }

    // Reading must not create an empty database
    if !change_log_path(&config.change_log_dir(), entity_type).exists() {
        println!("[]");
        return Ok(());
    }

    let registry = EntityRegistry::from_config(config);
    let detector = &registry.get(entity_type)?.detector;
    let change_log = SqliteChangeLog::open(config.change_log_dir(), entity_type)?;
    let changes = change_log.query(&query)?;
    tracing::debug!(
        entity_type = entity_type.as_str(),
        count = changes.len(),
        "history queried"
    );

    let mut rendered = Vec::with_capacity(changes.len());
    for c in &changes {
        let mut entry = json!({
            "id": c.id,
            "identifier": c.identifier,
            "type": c.change_type.as_str(),
            "timestamp": c.timestamp.to_rfc3339(),
            "data": c.data,
        });
        if let Some(previous) = &c.previous_data {
            let diff = diff_fields(previous, &c.data, detector)?;
            entry["changed_fields"] = json!({
                "structural": diff.structural,
                "volatile": diff.volatile,
            });
        }
        rendered.push(entry);
    }
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("invalid --since '{}', expected RFC 3339 or YYYY-MM-DD", raw))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid --since '{}'", raw))?;
    Ok(midnight.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_since_accepts_date_and_timestamp() {
        let midnight = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_since("2024-06-01").unwrap(), midnight);
        assert_eq!(parse_since("2024-06-01T02:00:00+02:00").unwrap(), midnight);
        assert!(parse_since("last tuesday").is_err());
    }
}
