//! Text to value conversion at the form boundary
//!
//! Parse failures are values, not panics: every formatter returns
//! [`InvalidFormat`] carrying the rejected text and a hint of what was
//! expected, which a translator can turn into a message.

use chrono::NaiveDate;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::errors::ValexError;

/// Text a formatter could not parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse {input:?}: expected {expected}")]
pub struct InvalidFormat {
    pub input: String,
    pub expected: String,
}

impl InvalidFormat {
    pub fn new(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
        }
    }
}

impl From<InvalidFormat> for ValexError {
    fn from(err: InvalidFormat) -> Self {
        ValexError::InvalidFormat {
            input: err.input,
            expected: err.expected,
        }
    }
}

/// Two-way conversion between display text and a property value
pub trait ValueFormatter {
    fn format(&self, value: &Value) -> String;

    /// Parse display text; blank text parses to null
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` when the text is not in the expected format.
    fn parse(&self, text: &str) -> Result<Value, InvalidFormat>;

    /// Hint shown to users when parsing fails
    fn expected_format(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerFormatter;

impl ValueFormatter for IntegerFormatter {
    fn format(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn parse(&self, text: &str) -> Result<Value, InvalidFormat> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| InvalidFormat::new(text, self.expected_format()))
    }

    fn expected_format(&self) -> String {
        "a whole number".to_string()
    }
}

/// Fixed-scale decimal numbers
#[derive(Debug, Clone, Copy)]
pub struct DecimalFormatter {
    scale: usize,
}

impl Default for DecimalFormatter {
    fn default() -> Self {
        Self { scale: 2 }
    }
}

impl DecimalFormatter {
    pub fn new(scale: usize) -> Self {
        Self { scale }
    }
}

impl ValueFormatter for DecimalFormatter {
    fn format(&self, value: &Value) -> String {
        match value.as_f64() {
            Some(n) => format!("{:.*}", self.scale, n),
            None => match value {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }

    fn parse(&self, text: &str) -> Result<Value, InvalidFormat> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        let within_scale = match trimmed.split_once('.') {
            Some((_, fraction)) => {
                fraction.len() <= self.scale && fraction.bytes().all(|b| b.is_ascii_digit())
            }
            None => true,
        };
        if !within_scale {
            return Err(InvalidFormat::new(text, self.expected_format()));
        }
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| InvalidFormat::new(text, self.expected_format()))
    }

    fn expected_format(&self) -> String {
        format!("a number with up to {} decimals", self.scale)
    }
}

/// Calendar dates stored as ISO-8601 strings
#[derive(Debug, Clone)]
pub struct DateFormatter {
    pattern: String,
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::new("%Y-%m-%d")
    }
}

impl DateFormatter {
    /// `pattern` uses chrono's strftime syntax
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl ValueFormatter for DateFormatter {
    fn format(&self, value: &Value) -> String {
        match value {
            Value::String(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(date) => date.format(&self.pattern).to_string(),
                Err(_) => s.clone(),
            },
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn parse(&self, text: &str) -> Result<Value, InvalidFormat> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        NaiveDate::parse_from_str(trimmed, &self.pattern)
            .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
            .map_err(|_| InvalidFormat::new(text, self.expected_format()))
    }

    fn expected_format(&self) -> String {
        self.pattern.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_parse() {
        let f = IntegerFormatter;
        assert_eq!(f.parse(" 42 ").unwrap(), json!(42));
        assert_eq!(f.parse("").unwrap(), Value::Null);
        let err = f.parse("4x").unwrap_err();
        assert_eq!(err.input, "4x");
        assert_eq!(err.expected, "a whole number");
    }

    #[test]
    fn test_decimal_round_trip_display() {
        let f = DecimalFormatter::new(2);
        assert_eq!(f.format(&json!(1.5)), "1.50");
        assert_eq!(f.parse("1.25").unwrap(), json!(1.25));
        assert!(f.parse("one").is_err());
    }

    #[test]
    fn test_decimal_rejects_excess_scale() {
        let f = DecimalFormatter::new(2);
        assert_eq!(f.parse("-3.5").unwrap(), json!(-3.5));
        assert_eq!(f.parse("7").unwrap(), json!(7.0));
        let err = f.parse("1.255").unwrap_err();
        assert_eq!(err.input, "1.255");
        assert_eq!(err.expected, "a number with up to 2 decimals");
        assert!(f.parse("1.2e3").is_err());
        assert!(DecimalFormatter::new(0).parse("4.0").is_err());
    }

    #[test]
    fn test_date_pattern() {
        let f = DateFormatter::new("%d/%m/%Y");
        assert_eq!(f.parse("31/01/2024").unwrap(), json!("2024-01-31"));
        assert_eq!(f.format(&json!("2024-01-31")), "31/01/2024");
        let err = f.parse("2024-01-31").unwrap_err();
        assert_eq!(err.expected, "%d/%m/%Y");
    }

    #[test]
    fn test_into_valex_error() {
        let err: ValexError = InvalidFormat::new("x", "a whole number").into();
        assert_eq!(
            err,
            ValexError::InvalidFormat {
                input: "x".to_string(),
                expected: "a whole number".to_string()
            }
        );
    }
}
