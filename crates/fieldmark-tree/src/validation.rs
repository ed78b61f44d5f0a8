//! Validation Records
//!
//! Validation failures as produced by the form runtime, their
//! classification into blocking errors and advisory warnings, and the
//! built-in constraint validators.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Kind prefix reserved for advisory warnings
pub const WARNING_PREFIX: &str = "warn:";

/// A single validation failure.
///
/// `kind` is optional because records coming from the runtime (or from JSON)
/// may be malformed. A record without a usable kind is never classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(default, deserialize_with = "lenient_kind", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Accepts any JSON value for `kind`; anything but a string becomes `None`.
fn lenient_kind<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.as_str().map(str::to_owned)))
}

impl ValidationError {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            message: None,
        }
    }

    pub fn with_message(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            message: Some(message.into()),
        }
    }

    /// Record with no kind at all
    pub fn malformed(message: Option<String>) -> Self {
        Self { kind: None, message }
    }

    /// Kind if present and non-empty
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref().filter(|k| !k.is_empty())
    }

    pub fn severity(&self) -> Severity {
        classify(self)
    }
}

/// Classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Advisory; never marks the control invalid
    Warning,
    /// Marks the control invalid
    Blocking,
    /// Malformed record, treated as "no error"
    Invalid,
}

pub fn classify(error: &ValidationError) -> Severity {
    match error.kind() {
        Some(kind) if kind.starts_with(WARNING_PREFIX) => Severity::Warning,
        Some(_) => Severity::Blocking,
        None => Severity::Invalid,
    }
}

pub fn is_warning(error: &ValidationError) -> bool {
    classify(error) == Severity::Warning
}

pub fn is_blocking(error: &ValidationError) -> bool {
    classify(error) == Severity::Blocking
}

/// Build a warning record. `None` leaves the message absent, which is not
/// the same as `Some("")`.
pub fn make_warning(kind: &str, message: Option<&str>) -> ValidationError {
    ValidationError {
        kind: Some(format!("{WARNING_PREFIX}{kind}")),
        message: message.map(str::to_owned),
    }
}

/// Errors split by severity; malformed records are dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
    pub ignored: usize,
}

impl Classified {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

pub fn partition<'a>(records: impl IntoIterator<Item = &'a ValidationError>) -> Classified {
    let mut out = Classified::default();
    for record in records {
        match classify(record) {
            Severity::Blocking => out.errors.push(record.clone()),
            Severity::Warning => out.warnings.push(record.clone()),
            Severity::Invalid => out.ignored += 1,
        }
    }
    out
}

/// Built-in constraints for a leaf field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Length above which a `warn:maxLength` warning is reported
    pub soft_max_length: Option<usize>,
}

impl Constraints {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Validate a value
    pub fn validate(&self, value: &Value) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if is_empty_value(value) {
            if self.required {
                errors.push(ValidationError::with_message("required", "This field is required."));
            }
            // Other constraints do not apply to empty values
            return errors;
        }

        if let Some(len) = value_length(value) {
            if let Some(min) = self.min_length {
                if len < min {
                    errors.push(ValidationError::with_message(
                        "minLength",
                        format!("Please lengthen this text to {min} characters or more."),
                    ));
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    errors.push(ValidationError::with_message(
                        "maxLength",
                        format!("Please shorten this text to {max} characters or less."),
                    ));
                }
            }
            if let Some(soft) = self.soft_max_length {
                if len > soft {
                    errors.push(make_warning(
                        "maxLength",
                        Some(&format!("Consider keeping this under {soft} characters.")),
                    ));
                }
            }
        }

        if let Some(number) = value.as_f64() {
            if let Some(min) = self.min {
                if number < min {
                    errors.push(ValidationError::with_message(
                        "min",
                        format!("Value must be greater or equal to {min}."),
                    ));
                }
            }
            if let Some(max) = self.max {
                if number > max {
                    errors.push(ValidationError::with_message(
                        "max",
                        format!("Value must be less or equal to {max}."),
                    ));
                }
            }
        }

        errors
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn value_length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}
