//! Observable events
//!
//! Events are explicit and typed; each maps to a fixed severity.

use std::fmt;

use super::Severity;

/// Observable events in typea
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Registry
    /// A new type was minted
    TypeRegistered,
    /// Checks were merged into an existing type
    TypeExtended,

    // Loading
    /// Expression file parsed and stored
    ExpressionLoaded,
    /// CLI configuration loaded
    ConfigLoaded,

    // Validation
    /// Validation call succeeded
    ValidationSucceeded,
    /// Validation call failed
    ValidationFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::TypeRegistered => "TYPE_REGISTERED",
            Event::TypeExtended => "TYPE_EXTENDED",
            Event::ExpressionLoaded => "EXPRESSION_LOADED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ValidationSucceeded => "VALIDATION_SUCCEEDED",
            Event::ValidationFailed => "VALIDATION_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ValidationSucceeded | Event::ValidationFailed => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::TypeRegistered,
            Event::TypeExtended,
            Event::ExpressionLoaded,
            Event::ConfigLoaded,
            Event::ValidationSucceeded,
            Event::ValidationFailed,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_validation_events_are_trace() {
        assert_eq!(Event::ValidationFailed.severity(), Severity::Trace);
        assert_eq!(Event::TypeRegistered.severity(), Severity::Info);
    }
}
