//! fieldmark Tree
//!
//! Arena-backed field tree for form models.
//!
//! Features:
//! - Groups, arrays and leaves addressed by generational handles
//! - Structural and per-field generation counters
//! - Validation records and warning/blocking classification
//! - Path resolution to stable, collision-free DOM ids

mod generation;
mod path;
mod resolve;
mod tree;
pub mod validation;

use std::fmt;

pub use generation::{Cached, Generation};
pub use path::{error_container_id, warning_container_id, FieldKey, PathSegment, DOM_ID_SEPARATOR};
pub use resolve::{ResolutionPolicy, Resolved, SYNTHETIC_MARKER};
pub use tree::FieldTree;
pub use validation::{
    classify, is_blocking, is_warning, make_warning, partition, Classified, Constraints, Severity,
    ValidationError, WARNING_PREFIX,
};

/// Field identifier (arena slot plus slot generation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl FieldId {
    /// Root field of every tree
    pub const ROOT: FieldId = FieldId {
        index: 0,
        generation: 0,
    };

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// A field handle that could not be traced back to the form root
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldResolutionError {
    #[error("field handle {0} does not refer to a live field")]
    Dangling(FieldId),

    #[error("field {field} is detached from the form root (partial path `{partial}`)")]
    Detached { field: FieldId, partial: FieldKey },
}

impl FieldResolutionError {
    pub fn field(&self) -> FieldId {
        match self {
            Self::Dangling(field) => *field,
            Self::Detached { field, .. } => *field,
        }
    }

    /// Path from the topmost reachable ancestor, if any
    pub fn partial_path(&self) -> Option<&FieldKey> {
        match self {
            Self::Dangling(_) => None,
            Self::Detached { partial, .. } => Some(partial),
        }
    }
}

/// Structural misuse of the tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("field handle {0} does not refer to a live field")]
    Stale(FieldId),

    #[error("field {0} is not a group")]
    NotAGroup(FieldId),

    #[error("field {0} is not an array")]
    NotAnArray(FieldId),

    #[error("field {0} is not a leaf")]
    NotALeaf(FieldId),

    #[error("property `{name}` already exists on {parent}")]
    DuplicateProperty { parent: FieldId, name: String },

    #[error("no property `{name}` on {parent}")]
    NoSuchProperty { parent: FieldId, name: String },

    #[error("index {index} out of bounds for array {array} of length {len}")]
    IndexOutOfBounds {
        array: FieldId,
        index: usize,
        len: usize,
    },

    #[error("the form root cannot be detached")]
    RootImmutable,
}
