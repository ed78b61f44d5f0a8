//! fieldmark Accessibility
//!
//! Accessibility wiring for validated form fields.
//!
//! Features:
//! - Message container roles and live-region politeness
//! - `aria-invalid` / `aria-describedby` derivation
//! - Form busy state

pub mod aria;
pub mod binder;

pub use aria::{AccessibilityAttributes, AriaRole, LiveRegionMode, busy_attribute};
pub use binder::{bind, bind_key};

/// Accessibility error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum A11yError {
    #[error("Invalid message role: {0}")]
    InvalidRole(String),

    #[error("Invalid boolean for {attribute}: {value}")]
    InvalidBoolean { attribute: String, value: String },
}
