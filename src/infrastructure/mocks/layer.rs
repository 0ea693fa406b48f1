//! `tracing` layer that records events for assertions on gate logging.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Layer that keeps every event it sees.
#[derive(Debug, Clone, Default)]
pub struct MockCaptureLayer {
    captured: Arc<Mutex<Vec<CapturedEvent>>>,
}

/// One recorded event.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    /// Every non-message field, rendered with `Debug`.
    pub fields: BTreeMap<String, String>,
}

impl MockCaptureLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far.
    pub fn get_captured(&self) -> Vec<CapturedEvent> {
        self.captured.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.captured.lock().len()
    }

    /// Events whose message equals `message`.
    pub fn count_matching(&self, message: &str) -> usize {
        self.captured
            .lock()
            .iter()
            .filter(|event| event.message == message)
            .count()
    }

    pub fn clear(&self) {
        self.captured.lock().clear();
    }
}

impl<S> Layer<S> for MockCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldRecorder::default();
        event.record(&mut visitor);

        self.captured.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldRecorder {
    message: String,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldRecorder {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}
