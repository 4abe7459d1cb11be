//! Operation boundary macros.
//!
//! Each tracked operation logs exactly one `start` and then either one `end`
//! (with `duration_ms`) or one `end_error` (with `duration_ms`, `err.kind` and
//! `err.code`). Extra `key = value` fields are forwarded to `tracing` as-is.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $op:expr, $event:expr $(, $($field:tt)+)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event
            $(, $($field)+)?
        )
    };
}

/// Log the start of an operation
///
/// ```
/// # use tracklist_core::log_op_start;
/// log_op_start!("track_changes", identifier = "acme/widget");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)+)?) => {
        $crate::__log_op_event!(
            info,
            $op,
            $crate::tracklist_core_types::schema::EVENT_START
            $(, $($field)+)?
        )
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use tracklist_core::log_op_end;
/// log_op_end!("track_changes", duration_ms = 3, change_type = "soft");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)+)?) => {
        $crate::__log_op_event!(
            info,
            $op,
            $crate::tracklist_core_types::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)+)?
        )
    };
}

/// Log a failed operation
///
/// `$err` is anything `Into<ExError>`; pass `err.clone()` to keep the original.
///
/// ```
/// # use tracklist_core::{log_op_error, errors::TrackerError};
/// let err = TrackerError::ListNotSet { entity_type: "obsidian-plugin".to_string() };
/// log_op_error!("handle_change", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)+)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_op_event!(
            error,
            $op,
            $crate::tracklist_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code()
            $(, $($field)+)?
        )
    }};
}
