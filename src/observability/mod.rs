//! Observability for typea
//!
//! Structured JSON-line logging of registry changes, expression loading
//! and (at trace level) individual validation outcomes.
//!
//! Observability is read-only: it never changes a validation result.

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
