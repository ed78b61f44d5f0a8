//! Attribute Binder
//!
//! Pure mapping from a field's visible messages to its accessibility
//! attributes. There is no memory of earlier announcements: the same input
//! always yields the same output.

use fieldmark_tree::{
    FieldKey, ValidationError, error_container_id, is_blocking, is_warning, warning_container_id,
};

use crate::{AccessibilityAttributes, AriaRole};

/// Bind attributes for the field rendered with `field_dom_id`.
///
/// Only blocking records in `errors` and warning records in `warnings`
/// count; anything else is ignored.
pub fn bind(
    field_dom_id: &str,
    errors: &[ValidationError],
    warnings: &[ValidationError],
    visible: bool,
) -> AccessibilityAttributes {
    if !visible {
        return AccessibilityAttributes::default();
    }

    let has_errors = errors.iter().any(is_blocking);
    let has_warnings = warnings.iter().any(is_warning);

    let mut described_by = Vec::with_capacity(2);
    if has_errors {
        described_by.push(error_container_id(field_dom_id));
    }
    if has_warnings {
        described_by.push(warning_container_id(field_dom_id));
    }

    let role = if has_errors {
        Some(AriaRole::Alert)
    } else if has_warnings {
        Some(AriaRole::Status)
    } else {
        None
    };

    AccessibilityAttributes {
        invalid: has_errors,
        described_by,
        role,
    }
}

/// [`bind`] for a key rendered under a form's id prefix
pub fn bind_key(
    key: &FieldKey,
    prefix: &str,
    errors: &[ValidationError],
    warnings: &[ValidationError],
    visible: bool,
) -> AccessibilityAttributes {
    bind(&key.dom_id(prefix), errors, warnings, visible)
}
