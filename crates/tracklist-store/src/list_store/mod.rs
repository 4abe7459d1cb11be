//! SQLite list store
//!
//! Implements the list query/command ports and the canonical entity query
//! port over one database (`lists`, `list_items`, `canonical_entities`).

mod hydration;
mod sqlite_list_store;

pub use sqlite_list_store::SqliteListStore;
