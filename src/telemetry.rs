//! Structured event sink for harness telemetry
//!
//! The harness never logs through process-global state from library code.
//! Callers inject an [`EventSink`] into the trial runner and scheduler; each
//! trial reports through that handle. [`TracingSink`] forwards events to the
//! `tracing` ecosystem, [`CapturingSink`] records them for deterministic test
//! assertions, and [`NullSink`] drops them.

use std::sync::Mutex;

/// Severity of a harness event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Routine progress (data shapes, per-classifier error rates).
    Info,
    /// Degraded-but-continuing conditions (single-member class, failed fit).
    Warn,
}

/// One recorded event: level, dotted event name, and key/value fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event severity.
    pub level: Level,
    /// Dotted event name, e.g. `trial.complete`.
    pub name: String,
    /// Key/value payload, stringified.
    pub fields: Vec<(String, String)>,
}

/// Injectable structured-logging capability.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn log(&self, level: Level, name: &str, fields: &[(&str, String)]);
}

/// Sink that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn log(&self, level: Level, name: &str, fields: &[(&str, String)]) {
        // tracing requires static field names, so the payload is rendered
        // into a single `fields` string.
        let rendered = fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        match level {
            Level::Info => tracing::info!(event = name, fields = %rendered),
            Level::Warn => tracing::warn!(event = name, fields = %rendered),
        }
    }
}

/// Sink that records every event, for tests.
#[derive(Debug, Default)]
pub struct CapturingSink {
    events: Mutex<Vec<Event>>,
}

impl CapturingSink {
    /// Create an empty capturing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("capturing sink lock poisoned").clone()
    }

    /// Count of recorded events with the given name.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name == name).count()
    }
}

impl EventSink for CapturingSink {
    fn log(&self, level: Level, name: &str, fields: &[(&str, String)]) {
        let event = Event {
            level,
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn log(&self, _level: Level, _name: &str, _fields: &[(&str, String)]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capturing_sink_records_events() {
        let sink = CapturingSink::new();
        sink.log(Level::Info, "trial.start", &[("dataset", "leukemia".into())]);
        sink.log(Level::Warn, "partition.single_member_class", &[]);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "trial.start");
        assert_eq!(events[0].level, Level::Info);
        assert_eq!(events[0].fields[0], ("dataset".to_string(), "leukemia".to_string()));
        assert_eq!(sink.count("partition.single_member_class"), 1);
    }

    #[test]
    fn test_null_sink_is_silent() {
        let sink = NullSink;
        sink.log(Level::Info, "anything", &[("k", "v".into())]);
        // Nothing observable; this exercises the no-op path.
    }
}
