//! Tracklist Engine - pipeline orchestration
//!
//! Coordinates the core detector and the persistence adapters:
//! - History service: staleness decisions, change tracking, fetch policy
//! - Retrying fetch wrapper with exponential backoff
//! - Reconciliation handler with per-entity-type metadata builders
//! - Sequential batch driver with rate-limit halting and removal detection

pub mod batch;
pub mod fetch;
pub mod history;
pub mod reconcile;

pub use batch::{run_batch, BatchOptions, BatchSummary, REMOVED_FROM_LISTING};
pub use fetch::RetryingFetcher;
pub use history::{fetch_with_history, FetchOptions, FetchOutcome, HistoryService};
pub use reconcile::{builder_for, HandleOutcome, MetadataBuilder, ReconciliationHandler};
