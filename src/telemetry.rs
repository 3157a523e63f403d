//! telemetry
//!
//! Optional product-analytics sink.
//!
//! Services hold an `Option<Arc<dyn Telemetry>>`. Leaving it unset changes
//! nothing except that no events are recorded.

use std::sync::{Arc, Mutex, PoisonError};

/// Sink for named events.
pub trait Telemetry: Send + Sync {
    /// Record an event. Must not fail.
    fn capture(&self, event: &str);
}

/// Forwards events to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn capture(&self, event: &str) {
        tracing::info!(target: "forgeline::telemetry", event, "telemetry event");
    }
}

/// Keeps every captured event in memory.
///
/// Used by tests and by callers that batch events themselves.
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events captured so far, oldest first.
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `event` was captured.
    pub fn count(&self, event: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.as_str() == event)
            .count()
    }
}

impl Telemetry for RecordingTelemetry {
    fn capture(&self, event: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_counts_events() {
        let telemetry = RecordingTelemetry::new();
        telemetry.capture("PR Successful");
        telemetry.capture("Other");
        telemetry.capture("PR Successful");

        assert_eq!(telemetry.count("PR Successful"), 2);
        assert_eq!(telemetry.events(), vec!["PR Successful", "Other", "PR Successful"]);
    }

    #[test]
    fn clones_share_events() {
        let telemetry = RecordingTelemetry::new();
        let sink: Arc<dyn Telemetry> = Arc::new(telemetry.clone());
        sink.capture("PR Successful");
        assert_eq!(telemetry.count("PR Successful"), 1);
    }

    #[test]
    fn tracing_sink_does_not_panic_without_subscriber() {
        TracingTelemetry.capture("PR Successful");
    }
}
