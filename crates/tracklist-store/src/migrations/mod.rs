//! Embedded, checksummed SQL migrations.
//!
//! The change log and the list store live in separate database files, so each
//! [`Schema`] carries its own ordered migration set. A migration's SHA-256 is
//! recorded when it is applied; an applied migration whose embedded SQL no
//! longer matches its recorded hash fails the open.

mod runner;

use sha2::{Digest, Sha256};

pub use runner::{applied_migrations, apply_migrations};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// One database per entity type
    ChangeLog,
    /// Lists, list items and canonical entities
    ListStore,
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

const CHANGE_LOG: &[Migration] = &[Migration {
    id: "001_changes",
    sql: include_str!("../../migrations/change_log/001_changes.sql"),
}];

const LIST_STORE: &[Migration] = &[
    Migration {
        id: "001_lists",
        sql: include_str!("../../migrations/list_store/001_lists.sql"),
    },
    Migration {
        id: "002_canonical_entities",
        sql: include_str!("../../migrations/list_store/002_canonical_entities.sql"),
    },
];

impl Schema {
    /// Migrations in application order
    pub fn migrations(&self) -> &'static [Migration] {
        match self {
            Schema::ChangeLog => CHANGE_LOG,
            Schema::ListStore => LIST_STORE,
        }
    }
}

impl Migration {
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.sql.as_bytes()))
    }
}
