//! SQLite connection setup shared by the change log and the list store.

#![allow(clippy::result_large_err)]

use rusqlite::Connection;
use std::path::Path;

use crate::errors::{io, sqlite, Result};
use crate::migrations::{apply_migrations, Schema};

/// Open `path` (creating its directory), enable WAL and foreign keys, migrate
pub fn open_migrated(path: impl AsRef<Path>, schema: Schema) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(io("create_db_dir"))?;
    }
    let conn = Connection::open(path).map_err(sqlite("open_db"))?;
    // journal_mode answers with a row, so it cannot go through execute()
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .map_err(sqlite("open_db"))?;
    prepare(conn, schema)
}

/// Private in-memory database, migrated (tests and dry runs)
pub fn open_in_memory_migrated(schema: Schema) -> Result<Connection> {
    prepare(
        Connection::open_in_memory().map_err(sqlite("open_db"))?,
        schema,
    )
}

fn prepare(mut conn: Connection, schema: Schema) -> Result<Connection> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .map_err(sqlite("open_db"))?;
    apply_migrations(&mut conn, schema)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("lists.db");
        let conn = open_migrated(&path, Schema::ListStore).unwrap();
        assert!(path.exists());

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_ascii_lowercase(), "wal");
    }
}
