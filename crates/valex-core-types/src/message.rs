//! Validation messages
//!
//! A `ValidationMessage` is the unit of user-visible validation output: one
//! finding about one property (or about the object as a whole when the
//! property is `None`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a validation message
///
/// Ordered from least to most severe so that sorted message sets list
/// informational findings first and errors last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Advisory information, never blocks
    Info,
    /// Something looks wrong but may be accepted
    Warning,
    /// The value is invalid
    Error,
}

impl Severity {
    /// Stable upper-case label, also used as the serialized form
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable (property, severity, text) finding
///
/// Equality and ordering cover all three fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValidationMessage {
    property: Option<String>,
    severity: Severity,
    message: String,
}

impl ValidationMessage {
    /// Create a message scoped to a property
    pub fn new(property: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            severity,
            message: message.into(),
        }
    }

    /// Create a message about the object as a whole
    pub fn global(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            property: None,
            severity,
            message: message.into(),
        }
    }

    /// Property this message refers to, if any
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Human readable text
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.property {
            Some(property) => write!(f, "[{}] {}: {}", self.severity, property, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_covers_all_fields() {
        let a = ValidationMessage::new("name", Severity::Error, "is required");
        let b = ValidationMessage::new("name", Severity::Error, "is required");
        let c = ValidationMessage::new("name", Severity::Warning, "is required");
        let d = ValidationMessage::new("other", Severity::Error, "is required");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_global_message_has_no_property() {
        let msg = ValidationMessage::global(Severity::Info, "saved");
        assert_eq!(msg.property(), None);
        assert_eq!(msg.to_string(), "[INFO] saved");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_display_includes_property() {
        let msg = ValidationMessage::new("age", Severity::Error, "must be positive");
        assert_eq!(msg.to_string(), "[ERROR] age: must be positive");
    }

    #[test]
    fn test_serialization() {
        let msg = ValidationMessage::new("age", Severity::Warning, "looks old");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"WARNING\""));
        let back: ValidationMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
