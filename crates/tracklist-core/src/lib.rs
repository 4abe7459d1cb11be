//! Tracklist Core - change detection and reconciliation kernel
//!
//! This crate holds the storage-independent parts of the tracking pipeline:
//! - Entity, snapshot, change and list item models
//! - The change detector (structural vs volatile classification)
//! - The entity-type registry and TOML configuration
//! - Soft-merge and shape comparison used during reconciliation
//! - Ports for list persistence, canonical entity lookup and upstream fetches
//! - The error and logging facilities shared by every crate

pub mod auxiliary;
pub mod clock;
pub mod config;
pub mod detector;
pub mod errors;
pub mod logging_facility;
pub mod merge;
pub mod model;
pub mod ports;
pub mod registry;

pub use tracklist_core_types;

// Re-export commonly used types
pub use auxiliary::AuxiliaryContext;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use detector::{classify, ChangeDetectorConfig, Classification};
pub use errors::{ExError, ExErrorKind, Result, TrackerError};
pub use model::{Change, ChangeType, EntityType, ListItem, ListItemMetadata, Snapshot, SourceType};
pub use ports::{EntityQueryPort, FetchError, Fetcher, ListCommandPort, ListQueryPort};
pub use registry::{EntityRegistry, EntityTypeSpec};
