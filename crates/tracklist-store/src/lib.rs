//! Tracklist Store - persistence adapters
//!
//! Provides:
//! - Filesystem snapshot store with atomic writes and retention pruning
//! - SQLite change log, one database per entity type
//! - SQLite list store implementing the list and entity query ports
//! - Embedded, checksummed migrations for both SQLite schemas

pub mod change_log;
pub mod db;
pub mod errors;
pub mod list_store;
pub mod migrations;
pub mod snapshot;

// Re-export key types
pub use change_log::{ChangeQuery, SqliteChangeLog};
pub use errors::Result;
pub use list_store::SqliteListStore;
pub use snapshot::FsSnapshotStore;
