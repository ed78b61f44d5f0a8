//! Submission Results
//!
//! What a submit handler may hand back and what the overlay reports.

use serde::{Deserialize, Serialize};

use fieldmark_tree::{FieldKey, ValidationError};

/// Kind of the form-level error recorded when a handler fails outright
pub const SUBMIT_FAILURE_KIND: &str = "submit";

/// An error reported by the server, for a field or the whole form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Dotted field path (`items[0].name`); absent for form-level errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServerError {
    pub fn field(path: &str, kind: &str) -> Self {
        Self {
            field: Some(path.to_string()),
            kind: kind.to_string(),
            message: None,
        }
    }

    pub fn form(kind: &str, message: &str) -> Self {
        Self {
            field: None,
            kind: kind.to_string(),
            message: Some(message.to_string()),
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn key(&self) -> Option<FieldKey> {
        self.field.as_deref().map(FieldKey::parse)
    }

    pub fn to_validation_error(&self) -> ValidationError {
        ValidationError {
            kind: Some(self.kind.clone()),
            message: self.message.clone(),
        }
    }
}

/// Why a submit handler did not succeed
#[derive(Debug)]
pub enum SubmitFailure {
    /// The server rejected the value with field or form errors
    Rejected(Vec<ServerError>),
    /// The handler itself failed
    Failed(anyhow::Error),
}

impl From<Vec<ServerError>> for SubmitFailure {
    fn from(errors: Vec<ServerError>) -> Self {
        Self::Rejected(errors)
    }
}

impl From<ServerError> for SubmitFailure {
    fn from(error: ServerError) -> Self {
        Self::Rejected(vec![error])
    }
}

impl From<anyhow::Error> for SubmitFailure {
    fn from(error: anyhow::Error) -> Self {
        Self::Failed(error)
    }
}

/// Result of [`crate::FormOverlay::submit`] when nothing went wrong locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Handler accepted the value
    Submitted,
    /// Blocking client errors; the handler was not called
    Invalid,
    /// Handler returned server errors, now applied to the form
    Rejected {
        field_errors: usize,
        form_errors: usize,
    },
}
