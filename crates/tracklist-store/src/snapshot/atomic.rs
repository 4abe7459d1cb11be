//! Atomic write primitives
//!
//! Uses temp→rename pattern to ensure no partial writes

#![allow(clippy::result_large_err)]

use crate::errors::{io, Result};
use std::fs;
use std::path::Path;

/// Atomically write bytes to a file, creating parent directories
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(io("create_snapshot_dir"))?;
    }

    // Same directory as the target so the rename never crosses filesystems
    let temp_path = target_path.with_extension("tmp");

    fs::write(&temp_path, content).map_err(io("write_snapshot_temp"))?;
    fs::rename(&temp_path, target_path).map_err(io("rename_snapshot_temp"))?;

    Ok(())
}
