//! Error Display Strategies
//!
//! When a field's messages become visible, relative to dirty, touched and
//! submitted state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::form::FormContextState;

/// Policy governing when messages are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorDisplayStrategy {
    /// As soon as the value differs from its initial value
    Immediate,
    /// After the field was touched once
    #[default]
    OnTouch,
    /// After the enclosing form was submitted once
    OnSubmit,
}

impl ErrorDisplayStrategy {
    pub const ALL: [ErrorDisplayStrategy; 3] = [Self::Immediate, Self::OnTouch, Self::OnSubmit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::OnTouch => "on-touch",
            Self::OnSubmit => "on-submit",
        }
    }
}

impl fmt::Display for ErrorDisplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorDisplayStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
    }
}

/// Interaction flags of one field, as reported by the form runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldStatus {
    pub touched: bool,
    pub dirty: bool,
}

/// Whether the strategy lets the field's messages render right now
pub fn should_show(
    strategy: ErrorDisplayStrategy,
    field: FieldStatus,
    form: &FormContextState,
) -> bool {
    match strategy {
        ErrorDisplayStrategy::Immediate => field.dirty,
        ErrorDisplayStrategy::OnTouch => field.touched,
        ErrorDisplayStrategy::OnSubmit => form.has_submitted_once,
    }
}

/// A field's own decision combined with an ancestor forcing display
pub fn combine_show_errors(own: bool, ancestor_forced: bool) -> bool {
    own || ancestor_forced
}
