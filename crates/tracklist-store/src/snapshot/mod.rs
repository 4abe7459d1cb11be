//! Filesystem snapshot store
//!
//! Provides:
//! - One directory per identifier, sharded by the identifier's SHA-256 digest
//! - Numbered revisions with retention pruning
//! - Atomic writes (temp file + rename)
//! - Fail-open reads: a corrupt revision reads as "no snapshot"

mod atomic;
mod fs_store;
mod sharding;

pub use fs_store::FsSnapshotStore;
pub use sharding::identifier_digest;
