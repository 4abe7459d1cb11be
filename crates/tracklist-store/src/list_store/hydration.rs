//! Row decoding for the list store
//!
//! Every stored metadata payload is re-validated as the tagged union on read.

#![allow(clippy::result_large_err)]

use chrono::{DateTime, Utc};
use rusqlite::Row;
use tracklist_core::model::{CanonicalEntity, List, ListItem, ListItemMetadata};

use crate::errors::{corrupt_row, Result};

pub const LIST_COLUMNS: &str = "id, name, source_type";
pub const ITEM_COLUMNS: &str = "id, list_id, full_name, entity_id, metadata, created_at, updated_at";
pub const ENTITY_COLUMNS: &str = "id, entity_type, full_name";

/// Raw `lists` row
pub struct ListRow {
    id: String,
    name: String,
    source_type: String,
}

impl ListRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            source_type: row.get(2)?,
        })
    }

    pub fn hydrate(self) -> Result<List> {
        let source_type = self
            .source_type
            .parse()
            .map_err(|e| corrupt_row("lists", &self.id, e))?;
        Ok(List {
            id: self.id,
            name: self.name,
            source_type,
        })
    }
}

/// Raw `list_items` row
pub struct ItemRow {
    id: String,
    list_id: String,
    full_name: String,
    entity_id: Option<String>,
    metadata: String,
    created_at: String,
    updated_at: String,
}

impl ItemRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            list_id: row.get(1)?,
            full_name: row.get(2)?,
            entity_id: row.get(3)?,
            metadata: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    pub fn hydrate(self) -> Result<ListItem> {
        let value: serde_json::Value = serde_json::from_str(&self.metadata)
            .map_err(|e| corrupt_row("list_items", &self.id, e))?;
        let metadata = ListItemMetadata::from_value(value)
            .map_err(|e| corrupt_row("list_items", &self.id, e))?;

        Ok(ListItem {
            created_at: parse_time(&self.id, &self.created_at)?,
            updated_at: parse_time(&self.id, &self.updated_at)?,
            id: self.id,
            list_id: self.list_id,
            full_name: self.full_name,
            entity_id: self.entity_id,
            metadata,
        })
    }
}

/// Raw `canonical_entities` row
pub struct EntityRow {
    id: String,
    entity_type: String,
    full_name: String,
}

impl EntityRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entity_type: row.get(1)?,
            full_name: row.get(2)?,
        })
    }

    pub fn hydrate(self) -> Result<CanonicalEntity> {
        let entity_type = self
            .entity_type
            .parse()
            .map_err(|e| corrupt_row("canonical_entities", &self.id, e))?;
        Ok(CanonicalEntity {
            id: self.id,
            full_name: self.full_name,
            entity_type,
        })
    }
}

fn parse_time(id: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt_row("list_items", id, e))
}
