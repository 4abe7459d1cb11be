//! Field and event names shared by the logging macros and the test capture layer.

/// Module path of the emitting code
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
/// One of [`EVENT_START`], [`EVENT_END`], [`EVENT_END_ERROR`]
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

pub const FIELD_RUN_ID: &str = "run_id";
pub const FIELD_ENTITY_TYPE: &str = "entity_type";
/// Tracked identifier (`owner/name`, plugin id, theme repo)
pub const FIELD_IDENTIFIER: &str = "identifier";

pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
