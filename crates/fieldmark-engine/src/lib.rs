//! fieldmark Engine
//!
//! Error visibility and accessibility overlay for form models.
//!
//! Given a field tree with validation results, the engine derives which
//! messages are visible, whether each is a blocking error or a warning, and
//! the ARIA wiring every control needs. Configuration cascades through
//! nested scopes; every form boundary tracks its own submission state.
//!
//! # Example
//! ```rust
//! use fieldmark_engine::{ConfigScope, FieldKey, FieldTree, FormContext, FormOverlay, Options};
//! use fieldmark_engine::tree::ValidationError;
//! use serde_json::json;
//!
//! let scope = ConfigScope::root(Options::new());
//! let mut tree = FieldTree::from_value(&json!({"email": ""}));
//! let email = tree.lookup(&FieldKey::parse("email")).unwrap();
//! tree.set_errors(email, vec![ValidationError::new("required")]).unwrap();
//!
//! let mut overlay = FormOverlay::new(tree, FormContext::new("login", &scope, None));
//! assert!(!overlay.field(email).unwrap().visible());
//!
//! overlay.blur(email).unwrap();
//! let view = overlay.field(email).unwrap();
//! assert!(view.visible());
//! assert_eq!(view.attributes.unwrap().described_by, vec!["login-email--error"]);
//! ```

mod config;
mod derive;
mod form;
mod overlay;
mod strategy;
mod submit;

pub use config::{ConfigScope, Options, ResolvedConfig};
pub use derive::{FieldRuntimeState, FieldView};
pub use form::{DebugRecord, FormContext, FormContextState, FormEvent, FormId, SubmitGuard};
pub use overlay::{FormOverlay, FormView, SummaryEntry};
pub use strategy::{ErrorDisplayStrategy, FieldStatus, combine_show_errors, should_show};
pub use submit::{SUBMIT_FAILURE_KIND, ServerError, SubmitFailure, SubmitOutcome};

pub use fieldmark_tree::{FieldId, FieldKey, FieldResolutionError, FieldTree, TreeError};

// Re-export sub-crates for advanced usage
pub use fieldmark_a11y as a11y;
pub use fieldmark_tree as tree;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Invalid configuration input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid options record: {0}")]
    Parse(String),

    #[error("unknown error display strategy `{0}` (expected immediate, on-touch or on-submit)")]
    UnknownStrategy(String),
}

/// Submission could not run or its handler failed
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("a submission is already in progress for form `{0}`")]
    AlreadySubmitting(String),

    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}
