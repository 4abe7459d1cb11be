//! Mapping of SQLite and filesystem failures onto `ExError`.

use rusqlite::ErrorCode;
use tracklist_core::errors::{ExError, ExErrorKind};

pub type Result<T> = std::result::Result<T, ExError>;

/// `map_err` adapter for rusqlite errors, tagged with the failing operation
///
/// Constraint violations surface as `AlreadyExists`; everything else is
/// `Persistence`.
pub fn sqlite(op: &'static str) -> impl Fn(rusqlite::Error) -> ExError {
    move |err| {
        let kind = match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => ExErrorKind::AlreadyExists,
            _ => ExErrorKind::Persistence,
        };
        ExError::new(kind).with_op(op).with_message(err.to_string())
    }
}

/// `map_err` adapter for filesystem errors
pub fn io(op: &'static str) -> impl Fn(std::io::Error) -> ExError {
    move |err| ExError::new(ExErrorKind::Io).with_op(op).with_message(err.to_string())
}

pub fn migration_failed(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migrate")
        .with_message(format!("migration {} failed: {}", migration_id, reason))
}

/// An applied migration whose embedded SQL has since been edited
pub fn migration_edited(migration_id: &str, recorded: &str, embedded: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migrate")
        .with_message(format!(
            "migration {} was applied with checksum {} but the embedded copy hashes to {}",
            migration_id, recorded, embedded
        ))
}

/// A stored row that no longer decodes into the model
pub fn corrupt_row(table: &str, id: &str, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("hydrate")
        .with_entity_id(id)
        .with_message(format!("undecodable row in {}: {}", table, reason))
}

pub fn lock_poisoned(op: &'static str) -> ExError {
    ExError::new(ExErrorKind::Concurrency)
        .with_op(op)
        .with_message("connection lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_unique_violation_maps_to_already_exists() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .map_err(sqlite("insert_t"))
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::AlreadyExists);
        assert_eq!(err.op(), Some("insert_t"));
    }

    #[test]
    fn test_syntax_error_is_persistence() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .execute("SELEC nothing", [])
            .map_err(sqlite("bad_sql"))
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Persistence);
    }
}
