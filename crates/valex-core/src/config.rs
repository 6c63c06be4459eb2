//! Validator configuration
//!
//! Plain serde struct so hosts can keep it next to their other settings.
//!
//! ```json
//! { "context_id": "signup", "collect_all_errors": false, "severity": "WARNING" }
//! ```

use serde::{Deserialize, Serialize};
use valex_core_types::Severity;

use crate::errors::{Result, ValexError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Rules context passed to the rules source
    pub context_id: Option<String>,
    /// Evaluate every `And` child instead of stopping at the first failure
    pub collect_all_errors: bool,
    /// Severity given to messages produced from violations
    pub severity: Severity,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            context_id: None,
            collect_all_errors: false,
            severity: Severity::Error,
        }
    }
}

impl ValidatorConfig {
    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn with_collect_all_errors(mut self, collect_all_errors: bool) -> Self {
        self.collect_all_errors = collect_all_errors;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Parse a JSON document; absent fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for malformed JSON or unknown fields.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ValexError::InvalidConfig {
            reason: e.to_string(),
        })
    }
}
