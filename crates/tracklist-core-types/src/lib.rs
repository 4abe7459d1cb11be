//! Types shared by the error and logging facilities of every tracklist crate.

pub mod correlation;
pub mod schema;

pub use correlation::RunId;
