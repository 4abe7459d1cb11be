//! History service: snapshot-backed change tracking for one entity type.
//!
//! ## Tracking order
//! 1. Classify the new data against the previous version
//! 2. Append the Change (add/full/soft) to the change log
//! 3. Write a new snapshot revision, or refresh the latest one when unchanged
//!
//! The change is logged before the snapshot so a crash in between re-emits the
//! change on the next run instead of losing it.
//!
//! The batch driver uses the split steps ([`HistoryService::detect_change`],
//! [`HistoryService::commit_change`]) and commits only after the change was
//! reconciled, so a failed list write is retried by the next run.

#![allow(clippy::result_large_err)]

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracklist_core::clock::Clock;
use tracklist_core::detector::{classify_typed, ChangeDetectorConfig};
use tracklist_core::errors::{ExError, ExErrorKind, Result};
use tracklist_core::model::{Change, ChangeType, EntityType, Snapshot};
use tracklist_core::ports::Fetcher;
use tracklist_core::registry::EntityRegistry;
use tracklist_core::{log_op_end, log_op_error, log_op_start, TrackerConfig};
use tracklist_store::{FsSnapshotStore, SqliteChangeLog};

/// Snapshot history and change emission for entities of type `T`
pub struct HistoryService<T> {
    store: FsSnapshotStore,
    change_log: SqliteChangeLog,
    detector: ChangeDetectorConfig,
    _entity: PhantomData<fn() -> T>,
}

impl<T> HistoryService<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Assemble a service from its parts
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` — the detector config is invalid, or the store and
    ///   change log belong to different entity types
    pub fn new(
        store: FsSnapshotStore,
        change_log: SqliteChangeLog,
        detector: ChangeDetectorConfig,
    ) -> Result<Self> {
        detector.validate()?;
        if store.entity_type() != change_log.entity_type() {
            return Err(ExError::new(ExErrorKind::InvalidConfig)
                .with_op("history_service_new")
                .with_entity_type(store.entity_type().as_str())
                .with_message(format!(
                    "change log is for {}",
                    change_log.entity_type()
                )));
        }
        Ok(Self {
            store,
            change_log,
            detector,
            _entity: PhantomData,
        })
    }

    /// Open the on-disk store and change log for `entity_type` under the
    /// configured data directory
    pub fn open(
        config: &TrackerConfig,
        registry: &EntityRegistry,
        entity_type: EntityType,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let spec = registry.get(entity_type)?;
        Self::open_at(
            &config.snapshot_dir(),
            &config.change_log_dir(),
            spec.detector.clone(),
            entity_type,
            spec.snapshot_retention,
            clock,
        )
    }

    fn open_at(
        snapshot_dir: &Path,
        change_log_dir: &Path,
        detector: ChangeDetectorConfig,
        entity_type: EntityType,
        retention: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let store = FsSnapshotStore::new(snapshot_dir, entity_type, retention).with_clock(clock);
        let change_log = SqliteChangeLog::open(change_log_dir, entity_type)?;
        Self::new(store, change_log, detector)
    }

    pub fn entity_type(&self) -> EntityType {
        self.store.entity_type()
    }

    pub fn detector(&self) -> &ChangeDetectorConfig {
        &self.detector
    }

    pub fn store(&self) -> &FsSnapshotStore {
        &self.store
    }

    pub fn change_log(&self) -> &SqliteChangeLog {
        &self.change_log
    }

    pub fn get_latest_snapshot(&self, identifier: &str) -> Result<Option<Snapshot<T>>> {
        self.store.get_latest(identifier)
    }

    /// True when no snapshot exists or the latest is at least as old as the
    /// staleness threshold
    pub fn should_refresh(&self, identifier: &str) -> Result<bool> {
        let latest: Option<Snapshot<T>> = self.store.get_latest(identifier)?;
        Ok(match latest {
            None => true,
            Some(snapshot) => {
                snapshot.age(self.store.clock().now()) >= self.detector.staleness_threshold
            }
        })
    }

    /// Classify `new_data` against `previous`, log any change and persist the
    /// snapshot
    ///
    /// Returns the emitted change, or `None` when nothing tracked changed (the
    /// latest snapshot's `stored_at` is still refreshed).
    pub fn track_changes(
        &self,
        identifier: &str,
        new_data: &T,
        previous: Option<&T>,
    ) -> Result<Option<Change<T>>> {
        let start = Instant::now();
        log_op_start!(
            "track_changes",
            entity_type = self.entity_type().as_str(),
            identifier = identifier
        );

        let result = self.track_changes_inner(identifier, new_data, previous);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(change) => log_op_end!(
                "track_changes",
                duration_ms = duration_ms,
                identifier = identifier,
                change_type = change.as_ref().map(|c| c.change_type.as_str()).unwrap_or("none")
            ),
            Err(err) => log_op_error!(
                "track_changes",
                err.clone(),
                duration_ms = duration_ms,
                identifier = identifier
            ),
        }
        result
    }

    fn track_changes_inner(
        &self,
        identifier: &str,
        new_data: &T,
        previous: Option<&T>,
    ) -> Result<Option<Change<T>>> {
        match self.detect_change(identifier, new_data, previous)? {
            Some(change) => {
                self.commit_change(&change)?;
                Ok(Some(change))
            }
            None => {
                self.refresh_unchanged(identifier, new_data)?;
                Ok(None)
            }
        }
    }

    /// Classify `new_data` against `previous` without persisting anything
    pub fn detect_change(
        &self,
        identifier: &str,
        new_data: &T,
        previous: Option<&T>,
    ) -> Result<Option<Change<T>>> {
        let classification = classify_typed(previous, new_data, &self.detector)
            .map_err(|e| e.with_entity_id(identifier))?;
        Ok(classification.change_type().map(|change_type| {
            Change::new(
                identifier,
                change_type,
                new_data.clone(),
                previous.cloned(),
                self.store.clock().now(),
            )
        }))
    }

    /// A `full` change re-deriving the list item from data that did not
    /// change, for identifiers whose item went missing
    pub fn restore_change(&self, identifier: &str, data: T) -> Change<T> {
        let previous = Some(data.clone());
        Change::new(
            identifier,
            ChangeType::Full,
            data,
            previous,
            self.store.clock().now(),
        )
    }

    /// Append the change to the log, then write its data as a new revision
    pub fn commit_change(&self, change: &Change<T>) -> Result<()> {
        self.change_log.append(&change.to_value()?)?;
        self.store.write(&change.identifier, &change.data)?;
        Ok(())
    }

    /// Refresh the latest revision's `stored_at` for unchanged data
    pub fn refresh_unchanged(&self, identifier: &str, data: &T) -> Result<()> {
        self.store.touch(identifier, data)?;
        Ok(())
    }

    /// Log a removal carrying the last known data, if any snapshot exists
    pub fn record_removal(&self, identifier: &str) -> Result<Option<Change<T>>> {
        let Some(latest) = self.get_latest_snapshot(identifier)? else {
            return Ok(None);
        };
        let change = Change::new(
            identifier,
            ChangeType::Removal,
            latest.data,
            None,
            self.store.clock().now(),
        );
        self.change_log.append(&change.to_value()?)?;
        Ok(Some(change))
    }
}

/// Flags controlling the network-vs-cache decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Always fetch, ignoring staleness
    pub force: bool,
    /// Never refresh a cached snapshot, however stale
    pub skip_fetch: bool,
}

/// Result of [`fetch_with_history`]
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// Data came from the network; `previous` is the snapshot it replaces
    Fetched {
        data: T,
        previous: Option<Snapshot<T>>,
    },
    /// Cached snapshot returned unchanged
    Cached(Snapshot<T>),
}

impl<T> FetchOutcome<T> {
    pub fn data(&self) -> &T {
        match self {
            FetchOutcome::Fetched { data, .. } => data,
            FetchOutcome::Cached(snapshot) => &snapshot.data,
        }
    }
}

/// Fetch from the network only when forced, when nothing is cached, or when
/// the cache is stale and `skip_fetch` is unset; otherwise return the cache
pub async fn fetch_with_history<T, F>(
    history: &HistoryService<T>,
    fetcher: &F,
    identifier: &str,
    options: FetchOptions,
) -> Result<FetchOutcome<T>>
where
    T: Serialize + DeserializeOwned + Clone,
    F: Fetcher<T> + ?Sized,
{
    let cached = history.get_latest_snapshot(identifier)?;

    let fetch = match &cached {
        None => true,
        Some(_) if options.force => true,
        Some(_) => !options.skip_fetch && history.should_refresh(identifier)?,
    };

    match cached {
        Some(snapshot) if !fetch => Ok(FetchOutcome::Cached(snapshot)),
        previous => {
            let data = fetcher
                .fetch(identifier)
                .await
                .map_err(|e| ExError::from(e).with_entity_id(identifier))?;
            Ok(FetchOutcome::Fetched { data, previous })
        }
    }
}
