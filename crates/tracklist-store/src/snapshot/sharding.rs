//! Directory layout for snapshot revisions
//!
//! `<root>/<shard>/<digest>/<seq>.json`, where `digest` is the hex SHA-256 of
//! the identifier and `shard` its first two characters. Hashing keeps
//! identifiers like `acme/widget` out of the path.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const REVISION_EXT: &str = "json";

/// Hex SHA-256 of an identifier
pub fn identifier_digest(identifier: &str) -> String {
    hex::encode(Sha256::digest(identifier.as_bytes()))
}

/// Directory holding all revisions of one identifier
pub fn identifier_dir(root: &Path, identifier: &str) -> PathBuf {
    let digest = identifier_digest(identifier);
    root.join(&digest[..2]).join(digest)
}

/// File name of revision `seq`, zero-padded so lexical order is numeric order
pub fn revision_path(dir: &Path, seq: u64) -> PathBuf {
    dir.join(format!("{:010}.{}", seq, REVISION_EXT))
}

/// Parse a revision number from a path produced by [`revision_path`]
pub fn parse_revision(path: &Path) -> Option<u64> {
    if path.extension()? != REVISION_EXT {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}
