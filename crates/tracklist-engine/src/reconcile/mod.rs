//! Reconciliation of detected changes into list items
//!
//! One concrete [`ReconciliationHandler`] drives every entity type; the
//! per-type part (turning a change into list item metadata) is an injected
//! [`MetadataBuilder`].

mod builders;
mod handler;

pub use builders::{
    builder_for, GithubRepositoryBuilder, MetadataBuilder, ObsidianPluginBuilder,
    ObsidianThemeBuilder,
};
pub use handler::{HandleOutcome, ReconciliationHandler, REMOVED_UPSTREAM};
