//! SQLite implementation of the list and entity ports

#![allow(clippy::result_large_err)]

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use tracklist_core::errors::{ExError, TrackerError};
use tracklist_core::model::list::normalize_full_name;
use tracklist_core::model::{
    CanonicalEntity, EntityType, List, ListItem, ListItemMetadata, ListItemUpdate, NewListItem,
    SourceType,
};
use tracklist_core::ports::{EntityQueryPort, ListCommandPort, ListQueryPort};

use super::hydration::{EntityRow, ItemRow, ListRow, ENTITY_COLUMNS, ITEM_COLUMNS, LIST_COLUMNS};
use crate::db;
use crate::errors::{lock_poisoned, sqlite, Result};
use crate::migrations::Schema;

/// List store over a single SQLite connection
///
/// The connection sits behind a mutex so the store can be shared as a port
/// (`Send + Sync`).
pub struct SqliteListStore {
    conn: Mutex<Connection>,
}

impl SqliteListStore {
    /// Open (creating and migrating) the list database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = db::open_migrated(path, Schema::ListStore)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory list store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = db::open_in_memory_migrated(Schema::ListStore)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self, op: &'static str) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| lock_poisoned(op))
    }

    /// All lists, oldest first
    pub fn lists(&self) -> Result<Vec<List>> {
        let conn = self.lock("lists")?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM lists ORDER BY created_at, id",
                LIST_COLUMNS
            ))
            .map_err(sqlite("list_store"))?;
        let rows = stmt
            .query_map([], ListRow::from_row)
            .map_err(sqlite("list_store"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite("list_store"))?;
        rows.into_iter().map(ListRow::hydrate).collect()
    }

    /// Register a canonical entity; an existing row for the same normalized
    /// name is returned unchanged
    pub fn insert_entity(
        &self,
        entity_type: EntityType,
        full_name: &str,
    ) -> Result<CanonicalEntity> {
        let normalized = normalize_full_name(full_name);
        let conn = self.lock("insert_entity")?;
        conn.execute(
            "INSERT INTO canonical_entities (id, entity_type, full_name, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(entity_type, full_name) DO NOTHING",
            rusqlite::params![
                Uuid::now_v7().to_string(),
                entity_type.as_str(),
                normalized,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(sqlite("list_store"))?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM canonical_entities WHERE entity_type = ?1 AND full_name = ?2",
                    ENTITY_COLUMNS
                ),
                rusqlite::params![entity_type.as_str(), normalized],
                EntityRow::from_row,
            )
            .map_err(sqlite("list_store"))?;
        row.hydrate()
    }

    fn list_source_type(conn: &Connection, list_id: &str) -> Result<SourceType> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT source_type FROM lists WHERE id = ?1",
                [list_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(sqlite("list_store"))?;
        let raw = raw.ok_or_else(|| TrackerError::ListNotFound {
            list_id: list_id.to_string(),
        })?;
        raw.parse::<SourceType>().map_err(ExError::from)
    }

    fn find_item_locked(
        conn: &Connection,
        list_id: &str,
        full_name: &str,
    ) -> Result<Option<ListItem>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM list_items WHERE list_id = ?1 AND full_name = ?2",
                    ITEM_COLUMNS
                ),
                rusqlite::params![list_id, full_name],
                ItemRow::from_row,
            )
            .optional()
            .map_err(sqlite("list_store"))?;
        row.map(ItemRow::hydrate).transpose()
    }
}

fn encode_metadata(metadata: &ListItemMetadata) -> Result<String> {
    Ok(metadata.to_value()?.to_string())
}

impl ListQueryPort for SqliteListStore {
    fn find_by_source_type(&self, source_type: SourceType) -> Result<Option<List>> {
        let conn = self.lock("find_by_source_type")?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM lists WHERE source_type = ?1 ORDER BY created_at, id LIMIT 1",
                    LIST_COLUMNS
                ),
                [source_type.as_str()],
                ListRow::from_row,
            )
            .optional()
            .map_err(sqlite("list_store"))?;
        row.map(ListRow::hydrate).transpose()
    }

    fn find_item(&self, list_id: &str, full_name: &str) -> Result<Option<ListItem>> {
        let conn = self.lock("find_item")?;
        Self::find_item_locked(&conn, list_id, full_name)
    }

    fn items_in_list(&self, list_id: &str) -> Result<Vec<ListItem>> {
        let conn = self.lock("items_in_list")?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM list_items WHERE list_id = ?1 ORDER BY full_name",
                ITEM_COLUMNS
            ))
            .map_err(sqlite("list_store"))?;
        let rows = stmt
            .query_map([list_id], ItemRow::from_row)
            .map_err(sqlite("list_store"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sqlite("list_store"))?;
        rows.into_iter().map(ItemRow::hydrate).collect()
    }
}

impl ListCommandPort for SqliteListStore {
    fn create(&self, name: &str, source_type: SourceType) -> Result<List> {
        let conn = self.lock("create_list")?;
        let list = List {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            source_type,
        };
        conn.execute(
            "INSERT INTO lists (id, name, source_type, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                list.id,
                list.name,
                source_type.as_str(),
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(sqlite("list_store"))?;
        Ok(list)
    }

    fn create_item(&self, item: NewListItem) -> Result<ListItem> {
        let conn = self.lock("create_item")?;
        let source_type = Self::list_source_type(&conn, &item.list_id)?;
        item.metadata.validate_for(source_type)?;

        if Self::find_item_locked(&conn, &item.list_id, &item.full_name)?.is_some() {
            return Err(TrackerError::ItemAlreadyExists {
                list_id: item.list_id,
                full_name: item.full_name,
            }
            .into());
        }

        let now = Utc::now();
        let stored = ListItem {
            id: Uuid::now_v7().to_string(),
            list_id: item.list_id,
            full_name: item.full_name,
            entity_id: item.entity_id,
            metadata: item.metadata,
            created_at: now,
            updated_at: now,
        };
        conn.execute(
            &format!(
                "INSERT INTO list_items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                ITEM_COLUMNS
            ),
            rusqlite::params![
                stored.id,
                stored.list_id,
                stored.full_name,
                stored.entity_id,
                encode_metadata(&stored.metadata)?,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(sqlite("list_store"))?;
        Ok(stored)
    }

    fn update_item(
        &self,
        list_id: &str,
        full_name: &str,
        update: ListItemUpdate,
    ) -> Result<ListItem> {
        let conn = self.lock("update_item")?;
        let source_type = Self::list_source_type(&conn, list_id)?;
        update.metadata.validate_for(source_type)?;

        let changed = conn
            .execute(
                "UPDATE list_items SET entity_id = ?1, metadata = ?2, updated_at = ?3
                 WHERE list_id = ?4 AND full_name = ?5",
                rusqlite::params![
                    update.entity_id,
                    encode_metadata(&update.metadata)?,
                    Utc::now().to_rfc3339(),
                    list_id,
                    full_name,
                ],
            )
            .map_err(sqlite("list_store"))?;
        if changed == 0 {
            return Err(TrackerError::ItemNotFound {
                list_id: list_id.to_string(),
                full_name: full_name.to_string(),
            }
            .into());
        }

        Self::find_item_locked(&conn, list_id, full_name)?.ok_or_else(|| {
            TrackerError::ItemNotFound {
                list_id: list_id.to_string(),
                full_name: full_name.to_string(),
            }
            .into()
        })
    }

    fn remove_item(&self, list_id: &str, full_name: &str) -> Result<()> {
        let conn = self.lock("remove_item")?;
        conn.execute(
            "DELETE FROM list_items WHERE list_id = ?1 AND full_name = ?2",
            rusqlite::params![list_id, full_name],
        )
        .map_err(sqlite("list_store"))?;
        Ok(())
    }
}

impl EntityQueryPort for SqliteListStore {
    fn find_by_name(
        &self,
        entity_type: EntityType,
        full_name: &str,
    ) -> Result<Option<CanonicalEntity>> {
        let conn = self.lock("find_by_name")?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM canonical_entities WHERE entity_type = ?1 AND full_name = ?2",
                    ENTITY_COLUMNS
                ),
                rusqlite::params![entity_type.as_str(), normalize_full_name(full_name)],
                EntityRow::from_row,
            )
            .optional()
            .map_err(sqlite("list_store"))?;
        row.map(EntityRow::hydrate).transpose()
    }
}
