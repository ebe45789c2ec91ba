//! Elapsed-time and score instrumentation

use serde::Serialize;
use std::time::{Duration, Instant};

/// Append-only destination for `(event, value)` pairs.
pub trait EventSink {
    /// Record one event with its measured value.
    fn record(&mut self, event: String, value: String);
}

/// A single recorded event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedEvent {
    pub event: String,
    pub value: String,
}

/// Default sink that keeps every event in arrival order
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeRecorder {
    pub events: Vec<TimedEvent>,
}

impl TimeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the value of the first event whose description starts with `prefix`
    pub fn find(&self, prefix: &str) -> Option<&str> {
        self.events
            .iter()
            .find(|e| e.event.starts_with(prefix))
            .map(|e| e.value.as_str())
    }
}

impl EventSink for TimeRecorder {
    fn record(&mut self, event: String, value: String) {
        self.events.push(TimedEvent { event, value });
    }
}

/// Format a duration the way every timing event is reported
pub fn seconds(elapsed: Duration) -> String {
    format!("{:.6}s", elapsed.as_secs_f64())
}

/// Run `f`, recording its wall time under `event`
pub fn timed<T>(sink: &mut dyn EventSink, event: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    sink.record(event.to_string(), seconds(start.elapsed()));
    out
}
