//! Sequential batch driver.
//!
//! ## Per identifier
//! 1. Fetch decision (network or cached snapshot)
//! 2. Join run context into fetched data and classify it against the
//!    previous snapshot
//! 3. Reconcile the change into the target list, then commit it to the
//!    change log and snapshot store
//!
//! An identifier with a snapshot but no list item (archived earlier, or a
//! failed list write) is restored from its data even when nothing changed.
//!
//! Errors are recorded per identifier and the batch continues, except:
//! - a rate-limited fetch halts the batch (remaining identifiers untouched)
//! - setup errors (`ListNotSet`, `InvalidConfig`) abort the batch
//!
//! When the batch completes without halting, listed items missing from the
//! upstream listing are archived.

#![allow(clippy::result_large_err)]

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;

use tracklist_core::auxiliary::AuxiliaryContext;
use tracklist_core::tracklist_core_types::RunId;
use tracklist_core::errors::{serialization_error, ExError, Result};
use tracklist_core::model::Change;
use tracklist_core::ports::Fetcher;
use tracklist_core::{log_op_end, log_op_error, log_op_start};

use crate::history::{fetch_with_history, FetchOptions, FetchOutcome, HistoryService};
use crate::reconcile::{HandleOutcome, ReconciliationHandler};

/// Archive reason for items absent from a complete upstream listing
pub const REMOVED_FROM_LISTING: &str = "removed from upstream listing";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub chunk_size: usize,
    pub fetch: FetchOptions,
    /// Archive listed items missing from `identifiers`; only meaningful when
    /// `identifiers` is the complete upstream listing
    pub detect_removals: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            fetch: FetchOptions::default(),
            detect_removals: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Correlates this summary with the run's log events
    pub run_id: RunId,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Served from a fresh cached snapshot without fetching
    pub skipped: usize,
    pub archived: usize,
    pub failed: Vec<(String, ExError)>,
    pub halted: bool,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.unchanged + self.skipped + self.failed.len()
    }
}

/// Run one batch for a single entity type
///
/// The handler must already have its list set; its run cache is rebuilt here
/// from `aux`.
///
/// # Errors
///
/// Only setup errors are returned; per-identifier failures land in
/// [`BatchSummary::failed`].
pub async fn run_batch<T, F>(
    identifiers: &[String],
    fetcher: &F,
    history: &HistoryService<T>,
    handler: &mut ReconciliationHandler,
    aux: AuxiliaryContext,
    options: &BatchOptions,
) -> Result<BatchSummary>
where
    T: Serialize + DeserializeOwned + Clone,
    F: Fetcher<T> + ?Sized,
{
    let start = Instant::now();
    let entity_type = history.entity_type();
    let run_id = RunId::new();
    log_op_start!(
        "run_batch",
        run_id = run_id.as_str(),
        entity_type = entity_type.as_str(),
        total = identifiers.len()
    );

    let result =
        run_batch_inner(&run_id, identifiers, fetcher, history, handler, aux, options).await;
    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(summary) => log_op_end!(
            "run_batch",
            duration_ms = duration_ms,
            run_id = run_id.as_str(),
            entity_type = entity_type.as_str(),
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            archived = summary.archived,
            failed = summary.failed.len(),
            halted = summary.halted
        ),
        Err(err) => log_op_error!(
            "run_batch",
            err.clone(),
            duration_ms = duration_ms,
            run_id = run_id.as_str(),
            entity_type = entity_type.as_str()
        ),
    }
    result
}

async fn run_batch_inner<T, F>(
    run_id: &RunId,
    identifiers: &[String],
    fetcher: &F,
    history: &HistoryService<T>,
    handler: &mut ReconciliationHandler,
    aux: AuxiliaryContext,
    options: &BatchOptions,
) -> Result<BatchSummary>
where
    T: Serialize + DeserializeOwned + Clone,
    F: Fetcher<T> + ?Sized,
{
    handler
        .prepare_run(aux)
        .map_err(|e| e.with_run_id(run_id.clone()))?;

    let mut summary = BatchSummary {
        run_id: run_id.clone(),
        ..BatchSummary::default()
    };
    let total = identifiers.len();
    let chunk_size = options.chunk_size.max(1);

    'chunks: for (chunk, ids) in identifiers.chunks(chunk_size).enumerate() {
        for identifier in ids {
            match process_one(identifier, fetcher, history, handler, options.fetch).await {
                Ok(Processed::Skipped) => summary.skipped += 1,
                Ok(Processed::Unchanged) => summary.unchanged += 1,
                Ok(Processed::Reconciled(outcome)) => match outcome {
                    HandleOutcome::Created(_) => summary.created += 1,
                    HandleOutcome::Updated(_) | HandleOutcome::Merged(_) => summary.updated += 1,
                    HandleOutcome::Archived(_) => summary.archived += 1,
                    HandleOutcome::AlreadyArchived | HandleOutcome::NotTracked => {}
                },
                Err(err) if err.kind().is_fatal() => return Err(err.with_run_id(run_id.clone())),
                Err(err) if err.kind().halts_batch() => {
                    tracing::warn!(
                        identifier = identifier.as_str(),
                        error = %err,
                        "rate limited, halting batch"
                    );
                    summary
                        .failed
                        .push((identifier.clone(), err.with_run_id(run_id.clone())));
                    summary.halted = true;
                    break 'chunks;
                }
                Err(err) => {
                    tracing::warn!(
                        identifier = identifier.as_str(),
                        err.code = err.code(),
                        error = %err,
                        "entity failed, continuing"
                    );
                    summary
                        .failed
                        .push((identifier.clone(), err.with_run_id(run_id.clone())));
                }
            }
        }

        tracing::info!(
            run_id = run_id.as_str(),
            entity_type = history.entity_type().as_str(),
            chunk = chunk + 1,
            processed = summary.processed(),
            total = total,
            "batch progress"
        );
    }

    if options.detect_removals && !summary.halted {
        archive_removed(identifiers, history, handler, &mut summary)?;
    }

    Ok(summary)
}

enum Processed {
    Skipped,
    Unchanged,
    Reconciled(HandleOutcome),
}

async fn process_one<T, F>(
    identifier: &str,
    fetcher: &F,
    history: &HistoryService<T>,
    handler: &mut ReconciliationHandler,
    options: FetchOptions,
) -> Result<Processed>
where
    T: Serialize + DeserializeOwned + Clone,
    F: Fetcher<T> + ?Sized,
{
    let (data, previous) = match fetch_with_history(history, fetcher, identifier, options).await? {
        FetchOutcome::Cached(_) if handler.is_listed(identifier) => return Ok(Processed::Skipped),
        FetchOutcome::Cached(snapshot) => {
            let change = history.restore_change(identifier, snapshot.data);
            return reconcile_and_commit(&change, history, handler);
        }
        FetchOutcome::Fetched { data, previous } => (data, previous.map(|s| s.data)),
    };
    let data = enrich(handler, data, previous.as_ref())?;

    match history.detect_change(identifier, &data, previous.as_ref())? {
        Some(change) => reconcile_and_commit(&change, history, handler),
        None if handler.is_listed(identifier) => {
            history.refresh_unchanged(identifier, &data)?;
            Ok(Processed::Unchanged)
        }
        None => {
            tracing::info!(identifier = identifier, "unchanged but not listed, restoring");
            let change = history.restore_change(identifier, data);
            reconcile_and_commit(&change, history, handler)
        }
    }
}

/// Reconcile first; the change is committed only once the list reflects it
fn reconcile_and_commit<T>(
    change: &Change<T>,
    history: &HistoryService<T>,
    handler: &mut ReconciliationHandler,
) -> Result<Processed>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let outcome = handler.handle(&change.to_value()?)?;
    history.commit_change(change)?;
    Ok(Processed::Reconciled(outcome))
}

fn enrich<T>(handler: &ReconciliationHandler, data: T, previous: Option<&T>) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let encode = |v: &T| serde_json::to_value(v).map_err(|e| serialization_error("enrich", e));
    let previous = previous.map(encode).transpose()?;
    let enriched = handler.enrich(encode(&data)?, previous.as_ref())?;
    serde_json::from_value(enriched).map_err(|e| serialization_error("enrich", e))
}

fn archive_removed<T>(
    identifiers: &[String],
    history: &HistoryService<T>,
    handler: &mut ReconciliationHandler,
    summary: &mut BatchSummary,
) -> Result<()>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let listed: BTreeSet<&str> = identifiers.iter().map(String::as_str).collect();
    let removed: Vec<String> = handler
        .listed_identifiers()
        .into_iter()
        .filter(|name| !listed.contains(name.as_str()))
        .collect();

    for identifier in removed {
        let archived = history
            .record_removal(&identifier)
            .and_then(|_| handler.handle_archival(REMOVED_FROM_LISTING, &identifier));
        match archived {
            Ok(HandleOutcome::Archived(_)) => summary.archived += 1,
            Ok(_) => {}
            Err(err) if err.kind().is_fatal() => {
                return Err(err.with_run_id(summary.run_id.clone()))
            }
            Err(err) => {
                let err = err.with_run_id(summary.run_id.clone());
                summary.failed.push((identifier, err));
            }
        }
    }
    Ok(())
}
