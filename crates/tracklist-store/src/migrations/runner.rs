#![allow(clippy::result_large_err)]

use std::collections::HashMap;

use rusqlite::{params, Connection};

use super::{Migration, Schema};
use crate::errors::{migration_edited, migration_failed, sqlite, Result};

const CREATE_SCHEMA_VERSION: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    migration_id TEXT NOT NULL UNIQUE,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL
)";

/// Bring `conn` up to date with `schema`
///
/// Each pending migration runs in its own transaction together with its
/// `schema_version` row.
///
/// # Errors
///
/// - `Persistence` — a migration fails, or an applied migration was edited
pub fn apply_migrations(conn: &mut Connection, schema: Schema) -> Result<()> {
    conn.execute(CREATE_SCHEMA_VERSION, [])
        .map_err(sqlite("migrate"))?;
    let recorded = recorded_checksums(conn)?;

    for migration in schema.migrations() {
        let checksum = migration.checksum();
        match recorded.get(migration.id) {
            Some(previous) if *previous == checksum => continue,
            Some(previous) => return Err(migration_edited(migration.id, previous, &checksum)),
            None => apply_one(conn, migration, &checksum)?,
        }
    }
    Ok(())
}

/// Migration ids recorded in `schema_version`, in application order
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT migration_id FROM schema_version ORDER BY id")
        .map_err(sqlite("migrate"))?;
    let rows = stmt
        .query_map([], |row| row.get(0))
        .map_err(sqlite("migrate"))?;
    rows.collect::<std::result::Result<Vec<String>, _>>()
        .map_err(sqlite("migrate"))
}

fn recorded_checksums(conn: &Connection) -> Result<HashMap<String, String>> {
    let mut stmt = conn
        .prepare("SELECT migration_id, checksum FROM schema_version")
        .map_err(sqlite("migrate"))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(sqlite("migrate"))?;
    rows.collect::<std::result::Result<HashMap<_, _>, _>>()
        .map_err(sqlite("migrate"))
}

fn apply_one(conn: &mut Connection, migration: &Migration, checksum: &str) -> Result<()> {
    let tx = conn.transaction().map_err(sqlite("migrate"))?;
    tx.execute_batch(migration.sql)
        .map_err(|e| migration_failed(migration.id, &e.to_string()))?;
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        params![migration.id, chrono::Utc::now().timestamp(), checksum],
    )
    .map_err(sqlite("migrate"))?;
    tx.commit().map_err(sqlite("migrate"))?;

    tracing::debug!(migration_id = migration.id, "applied migration");
    Ok(())
}
