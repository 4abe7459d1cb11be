//! In-memory capture of log events for test assertions.
//!
//! Events accumulate for the whole test binary, so tests should filter by a
//! unique op name or identifier rather than counting everything.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;
use tracklist_core_types::schema::{
    EVENT_END_ERROR, FIELD_COMPONENT, FIELD_EVENT, FIELD_IDENTIFIER, FIELD_OP,
};

/// One captured event, fields rendered as strings
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(FIELD_OP)
    }

    pub fn event(&self) -> Option<&str> {
        self.field(FIELD_EVENT)
    }

    pub fn component(&self) -> Option<&str> {
        self.field(FIELD_COMPONENT)
    }

    pub fn is(&self, op: &str, event: &str) -> bool {
        self.op() == Some(op) && self.event() == Some(event)
    }
}

#[derive(Default)]
struct FieldRecorder(BTreeMap<String, String>);

impl Visit for FieldRecorder {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    // Numbers and bools fall through to Debug, which renders them plainly
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

type Sink = Arc<Mutex<Vec<CapturedEvent>>>;

/// Layer pushing every event into a shared sink
pub struct TestCaptureLayer {
    sink: Sink,
}

impl TestCaptureLayer {
    pub fn new() -> (Self, TestCapture) {
        let sink = Sink::default();
        (Self { sink: sink.clone() }, TestCapture { sink })
    }
}

impl<S> Layer<S> for TestCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorder = FieldRecorder::default();
        event.record(&mut recorder);
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields: recorder.0,
        };
        if let Ok(mut events) = self.sink.lock() {
            events.push(captured);
        }
    }
}

/// Read handle over the captured events
#[derive(Clone)]
pub struct TestCapture {
    sink: Sink,
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.sink.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn events_for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.op() == Some(op))
    }

    /// Events carrying `identifier = <identifier>`
    pub fn events_for_identifier(&self, identifier: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.field(FIELD_IDENTIFIER) == Some(identifier))
    }

    /// `end_error` events of an operation
    pub fn errors_for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.is(op, EVENT_END_ERROR))
    }

    pub fn count(&self, op: &str, event: &str) -> usize {
        self.matching(|e| e.is(op, event)).len()
    }

    pub fn matching<F>(&self, predicate: F) -> Vec<CapturedEvent>
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().into_iter().filter(|e| predicate(e)).collect()
    }
}

static CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture layer globally (first call only) and return its handle
///
/// If a different subscriber is already installed the handle stays empty.
///
/// ```
/// use tracklist_core::logging_facility::init_test_capture;
/// use tracklist_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_capture_op");
/// assert_eq!(capture.count("doc_capture_op", "start"), 1);
/// ```
pub fn init_test_capture() -> TestCapture {
    CAPTURE
        .get_or_init(|| {
            let (layer, capture) = TestCaptureLayer::new();
            if tracing_subscriber::registry().with(layer).try_init().is_err() {
                eprintln!("test capture not installed: a subscriber is already set");
            }
            capture
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_event_accessors() {
        let fields: BTreeMap<String, String> = [
            (FIELD_OP, "track_changes"),
            (FIELD_EVENT, "end_error"),
            (FIELD_IDENTIFIER, "acme/widget"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let event = CapturedEvent {
            level: Level::ERROR,
            target: "tracklist_engine::history".to_string(),
            fields,
        };

        assert!(event.is("track_changes", EVENT_END_ERROR));
        assert_eq!(event.field(FIELD_IDENTIFIER), Some("acme/widget"));
        assert_eq!(event.component(), None);
    }
}
