//! Structured logging for the tracking pipeline.
//!
//! Binaries call [`init`] once with a [`Profile`]. Library code never installs
//! a subscriber; it logs operation boundaries through [`log_op_start!`],
//! [`log_op_end!`] and [`log_op_error!`] so every tracked operation emits the
//! same `component`/`op`/`event` fields. Tests install the capture layer with
//! [`init_test_capture`] and assert on what was emitted.
//!
//! [`log_op_start!`]: crate::log_op_start
//! [`log_op_end!`]: crate::log_op_end
//! [`log_op_error!`]: crate::log_op_error

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile, LOG_ENV_VAR};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
