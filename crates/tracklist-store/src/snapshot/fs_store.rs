//! Filesystem-backed snapshot store for one entity type

#![allow(clippy::result_large_err)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracklist_core::clock::{Clock, SystemClock};
use tracklist_core::errors::{serialization_error, ExError, ExErrorKind};
use tracklist_core::model::{EntityType, Snapshot};

use crate::errors::{io, Result};
use crate::snapshot::atomic::atomic_write;
use crate::snapshot::sharding::{identifier_dir, parse_revision, revision_path};

/// Snapshot store rooted at `<base>/<entity-type>`
///
/// Each identifier keeps at most `retention` revisions; older ones are pruned
/// after every write.
pub struct FsSnapshotStore {
    root: PathBuf,
    entity_type: EntityType,
    retention: usize,
    clock: Arc<dyn Clock>,
}

impl FsSnapshotStore {
    /// Create a store for one entity type under `base`
    ///
    /// A retention of zero is treated as one.
    pub fn new(base: impl AsRef<Path>, entity_type: EntityType, retention: usize) -> Self {
        Self {
            root: base.as_ref().join(entity_type.as_str()),
            entity_type,
            retention: retention.max(1),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different time source for `stored_at`
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Latest readable revision, or `None`
    ///
    /// A corrupt latest revision is logged at `warn` and reads as `None`.
    pub fn get_latest<T: DeserializeOwned>(
        &self,
        identifier: &str,
    ) -> Result<Option<Snapshot<T>>> {
        let revisions = self.revisions(identifier)?;
        match revisions.last() {
            Some((_, path)) => Ok(self.read_revision(identifier, path)),
            None => Ok(None),
        }
    }

    /// Store a new revision stamped with the current time, then prune
    pub fn write<T: Serialize + Clone>(&self, identifier: &str, data: &T) -> Result<Snapshot<T>> {
        let revisions = self.revisions(identifier)?;
        let next_seq = revisions.last().map(|(seq, _)| seq + 1).unwrap_or(1);
        let dir = identifier_dir(&self.root, identifier);

        let snapshot = Snapshot::new(identifier, data.clone(), self.clock.now());
        self.persist(&revision_path(&dir, next_seq), &snapshot)?;

        self.prune(identifier)?;
        Ok(snapshot)
    }

    /// Replace the latest revision in place with a fresh `stored_at`
    ///
    /// Writes a first revision when none exist. Used when a refetch found
    /// nothing new, so unchanged data never accumulates revisions.
    pub fn touch<T: Serialize + Clone>(&self, identifier: &str, data: &T) -> Result<Snapshot<T>> {
        let revisions = self.revisions(identifier)?;
        let Some((_, latest)) = revisions.last() else {
            return self.write(identifier, data);
        };

        let snapshot = Snapshot::new(identifier, data.clone(), self.clock.now());
        self.persist(latest, &snapshot)?;
        Ok(snapshot)
    }

    /// Retained revisions, oldest first; corrupt revisions are skipped
    pub fn history<T: DeserializeOwned>(&self, identifier: &str) -> Result<Vec<Snapshot<T>>> {
        Ok(self
            .revisions(identifier)?
            .iter()
            .filter_map(|(_, path)| self.read_revision(identifier, path))
            .collect())
    }

    /// Identifiers with at least one readable revision, sorted
    pub fn identifiers(&self) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();
        for shard in read_dir_or_empty(&self.root)? {
            for dir in read_dir_or_empty(&shard)? {
                let mut revisions = list_revisions(&dir)?;
                // The identifier is only recoverable from file contents
                while let Some((_, path)) = revisions.pop() {
                    let snapshot: Option<Snapshot<serde_json::Value>> =
                        self.read_revision("", &path);
                    if let Some(snapshot) = snapshot {
                        identifiers.push(snapshot.identifier);
                        break;
                    }
                }
            }
        }
        identifiers.sort();
        Ok(identifiers)
    }

    fn revisions(&self, identifier: &str) -> Result<Vec<(u64, PathBuf)>> {
        list_revisions(&identifier_dir(&self.root, identifier))
    }

    fn persist<T: Serialize>(&self, path: &Path, snapshot: &Snapshot<T>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(|e| {
            serialization_error("write_snapshot", e).with_entity_id(snapshot.identifier.as_str())
        })?;
        atomic_write(path, &bytes)
    }

    fn prune(&self, identifier: &str) -> Result<()> {
        let revisions = self.revisions(identifier)?;
        let excess = revisions.len().saturating_sub(self.retention);
        for (_, path) in revisions.iter().take(excess) {
            fs::remove_file(path).map_err(io("prune_snapshot"))?;
        }
        if excess > 0 {
            tracing::debug!(
                entity_type = self.entity_type.as_str(),
                identifier,
                pruned = excess,
                "pruned snapshot revisions"
            );
        }
        Ok(())
    }

    fn read_revision<T: DeserializeOwned>(
        &self,
        identifier: &str,
        path: &Path,
    ) -> Option<Snapshot<T>> {
        let decoded = fs::read(path)
            .map_err(io("read_snapshot"))
            .and_then(|bytes| {
                serde_json::from_slice::<Snapshot<T>>(&bytes).map_err(|e| {
                    ExError::new(ExErrorKind::CorruptSnapshot)
                        .with_op("read_snapshot")
                        .with_message(e.to_string())
                })
            });

        match decoded {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(
                    entity_type = self.entity_type.as_str(),
                    identifier,
                    path = %path.display(),
                    err.code = err.code(),
                    error = %err,
                    "unreadable snapshot treated as absent"
                );
                None
            }
        }
    }
}

fn read_dir_or_empty(dir: &Path) -> Result<Vec<PathBuf>> {
    match fs::read_dir(dir) {
        Ok(entries) => {
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            paths.sort();
            Ok(paths)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(io("list_snapshots")(e)),
    }
}

fn list_revisions(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io("list_revisions")(e)),
    };

    let mut revisions: Vec<(u64, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter_map(|p| parse_revision(&p).map(|seq| (seq, p)))
        .collect();
    revisions.sort_by_key(|(seq, _)| *seq);
    Ok(revisions)
}
