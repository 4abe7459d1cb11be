//! Change detector.
//!
//! Compares a freshly fetched entity against its previous snapshot and
//! classifies the delta using a per-entity-type [`ChangeDetectorConfig`].
//!
//! ## Entry point
//!
//! ```ignore
//! use tracklist_core::detector::classify;
//!
//! let classification = classify(previous.as_ref(), &next, &config)?;
//! ```
//!
//! ## Guarantees
//!
//! - **Purity**: no I/O, no clock; identical inputs give identical output.
//! - **Order-insensitive arrays**: `["a", "b"]` equals `["b", "a"]` at any depth.
//! - **Loud configuration**: a config without structural fields is rejected
//!   rather than silently classifying everything as soft.
//! - **Precedence**: structural differences win over volatile ones.

pub mod config;
pub mod engine;
pub mod model;

pub use config::ChangeDetectorConfig;
pub use engine::{canonicalize, classify, classify_typed, diff_fields, field_at};
pub use model::{Classification, FieldDiff};
