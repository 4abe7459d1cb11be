//! SQLite-backed append-only change log
//!
//! One database file per entity type at `<base>/<entity-type>.changes.db`.
//! Records are never updated or pruned.

#![allow(clippy::result_large_err)]

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracklist_core::model::{Change, ChangeType, EntityType};

use crate::db;
use crate::errors::{corrupt_row, lock_poisoned, sqlite, Result};
use crate::migrations::Schema;

/// Filter for [`SqliteChangeLog::query`]
///
/// An empty `change_types` matches every type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeQuery {
    pub from_date: Option<DateTime<Utc>>,
    pub change_types: Vec<ChangeType>,
    pub limit: Option<usize>,
    pub identifier: Option<String>,
}

impl ChangeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, from_date: DateTime<Utc>) -> Self {
        self.from_date = Some(from_date);
        self
    }

    pub fn types(mut self, change_types: impl IntoIterator<Item = ChangeType>) -> Self {
        self.change_types = change_types.into_iter().collect();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn for_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

pub struct SqliteChangeLog {
    conn: Mutex<Connection>,
    entity_type: EntityType,
}

/// Path of the change log database for an entity type
pub fn change_log_path(base: &Path, entity_type: EntityType) -> PathBuf {
    base.join(format!("{}.changes.db", entity_type.as_str()))
}

impl SqliteChangeLog {
    /// Open (creating and migrating) the change log for an entity type under `base`
    pub fn open(base: impl AsRef<Path>, entity_type: EntityType) -> Result<Self> {
        let path = change_log_path(base.as_ref(), entity_type);
        let conn = db::open_migrated(path, Schema::ChangeLog)?;
        Ok(Self {
            conn: Mutex::new(conn),
            entity_type,
        })
    }

    /// In-memory change log (for testing)
    pub fn open_in_memory(entity_type: EntityType) -> Result<Self> {
        let conn = db::open_in_memory_migrated(Schema::ChangeLog)?;
        Ok(Self {
            conn: Mutex::new(conn),
            entity_type,
        })
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Append one change record
    pub fn append(&self, change: &Change<Value>) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| lock_poisoned("append_change"))?;
        let previous = change.previous_data.as_ref().map(Value::to_string);
        conn.execute(
            "INSERT INTO changes
                 (id, identifier, change_type, timestamp, timestamp_ms, data, previous_data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                change.id,
                change.identifier,
                change.change_type.as_str(),
                change.timestamp.to_rfc3339(),
                change.timestamp.timestamp_millis(),
                change.data.to_string(),
                previous,
            ],
        )
        .map_err(sqlite("change_log"))?;
        Ok(())
    }

    /// Matching records, newest first
    pub fn query(&self, query: &ChangeQuery) -> Result<Vec<Change<Value>>> {
        let mut sql = String::from(
            "SELECT id, identifier, change_type, timestamp, data, previous_data
             FROM changes WHERE 1 = 1",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(from) = query.from_date {
            sql.push_str(" AND timestamp_ms >= ?");
            params.push(Box::new(from.timestamp_millis()));
        }
        if let Some(identifier) = &query.identifier {
            sql.push_str(" AND identifier = ?");
            params.push(Box::new(identifier.clone()));
        }
        if !query.change_types.is_empty() {
            let placeholders = vec!["?"; query.change_types.len()].join(", ");
            sql.push_str(&format!(" AND change_type IN ({})", placeholders));
            for t in &query.change_types {
                params.push(Box::new(t.as_str()));
            }
        }
        sql.push_str(" ORDER BY timestamp_ms DESC, seq DESC");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let conn = self.conn.lock().map_err(|_| lock_poisoned("query_changes"))?;
        let mut stmt = conn.prepare(&sql).map_err(sqlite("change_log"))?;
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                |row| {
                    Ok(ChangeRow {
                        id: row.get(0)?,
                        identifier: row.get(1)?,
                        change_type: row.get(2)?,
                        timestamp: row.get(3)?,
                        data: row.get(4)?,
                        previous_data: row.get(5)?,
                    })
                },
            )
            .map_err(sqlite("change_log"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite("change_log"))?;

        rows.into_iter().map(ChangeRow::hydrate).collect()
    }

    /// Total number of records
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().map_err(|_| lock_poisoned("count_changes"))?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM changes", [], |row| row.get(0))
            .map_err(sqlite("change_log"))?;
        Ok(n as usize)
    }
}

struct ChangeRow {
    id: String,
    identifier: String,
    change_type: String,
    timestamp: String,
    data: String,
    previous_data: Option<String>,
}

impl ChangeRow {
    fn hydrate(self) -> Result<Change<Value>> {
        let corrupt = |reason: String| corrupt_row("changes", &self.id, reason);

        let change_type: ChangeType = self.change_type.parse()?;
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| corrupt(e.to_string()))?
            .with_timezone(&Utc);
        let data: Value = serde_json::from_str(&self.data).map_err(|e| corrupt(e.to_string()))?;
        let previous_data = self
            .previous_data
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Change {
            id: self.id.clone(),
            identifier: self.identifier.clone(),
            change_type,
            timestamp,
            data,
            previous_data,
        })
    }
}
