//! Ports consumed by the reconciliation handler and batch driver.
//!
//! Persistence adapters (SQLite in `tracklist-store`, in-memory in
//! [`memory`]) implement the list and entity ports; network clients implement
//! [`Fetcher`].

#![allow(clippy::result_large_err)]

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{
    CanonicalEntity, EntityType, List, ListItem, ListItemUpdate, NewListItem, SourceType,
};

/// Read side of the list store
pub trait ListQueryPort: Send + Sync {
    /// First list with the given source type, if any
    fn find_by_source_type(&self, source_type: SourceType) -> Result<Option<List>>;

    /// Item keyed by `(list_id, full_name)`
    fn find_item(&self, list_id: &str, full_name: &str) -> Result<Option<ListItem>>;

    /// All items of a list, ordered by `full_name`
    fn items_in_list(&self, list_id: &str) -> Result<Vec<ListItem>>;
}

/// Write side of the list store
///
/// Implementations validate metadata against the target list's source type
/// and reject mismatches with `MetadataMismatch`.
pub trait ListCommandPort: Send + Sync {
    fn create(&self, name: &str, source_type: SourceType) -> Result<List>;

    /// Insert a new item
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` — `(list_id, full_name)` is taken
    /// - `NotFound` — list does not exist
    /// - `MetadataMismatch` — metadata tag differs from the list's source type
    fn create_item(&self, item: NewListItem) -> Result<ListItem>;

    /// Replace metadata and link of an existing item, bumping `updated_at`
    ///
    /// # Errors
    ///
    /// - `NotFound` — no such item
    /// - `MetadataMismatch` — metadata tag differs from the list's source type
    fn update_item(&self, list_id: &str, full_name: &str, update: ListItemUpdate)
        -> Result<ListItem>;

    /// Delete an item; deleting a missing item is not an error
    fn remove_item(&self, list_id: &str, full_name: &str) -> Result<()>;
}

/// Canonical entity lookup used for linking list items
pub trait EntityQueryPort: Send + Sync {
    /// Resolve by normalized identifier (see [`crate::model::list::normalize_full_name`])
    fn find_by_name(&self, entity_type: EntityType, full_name: &str)
        -> Result<Option<CanonicalEntity>>;
}

/// Failure modes of an upstream fetch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Upstream refused for quota reasons; the batch halts
    #[error("Rate limited by upstream{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    /// Entity no longer exists upstream
    #[error("Not found upstream: {identifier}")]
    NotFound { identifier: String },

    /// Network or decoding failure; retried by `RetryingFetcher`
    #[error("Transport error: {0}")]
    Transport(String),
}

fn retry_after_suffix(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    }
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport(_))
    }
}

impl From<FetchError> for ExError {
    fn from(err: FetchError) -> Self {
        let message = err.to_string();
        let error = match &err {
            FetchError::RateLimited { .. } => ExError::new(ExErrorKind::RateLimited),
            FetchError::NotFound { identifier } => {
                ExError::new(ExErrorKind::UpstreamNotFound).with_entity_id(identifier.clone())
            }
            FetchError::Transport(_) => ExError::new(ExErrorKind::Transport),
        };
        error.with_op("fetch").with_message(message)
    }
}

/// Fetch capability for one entity type
#[async_trait]
pub trait Fetcher<T>: Send + Sync {
    async fn fetch(&self, identifier: &str) -> std::result::Result<T, FetchError>;
}
