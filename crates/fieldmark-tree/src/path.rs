//! Field Paths
//!
//! A [`FieldKey`] is the ordered list of segments leading from the form root
//! to a field. Keys describe the field's *current* position: removing an
//! earlier array item shifts the keys of every later sibling, so keys must
//! be re-resolved after each structural change instead of being cached.
//!
//! # Text form
//! Keys display as `items[0].name`. A property that would read back as
//! something else (all digits, empty, or containing `.`, `[`, `]`, `"` or
//! `\`) is written quoted, as in `codes["0"]`, with `"` and `\` escaped
//! by a backslash. [`FieldKey::parse`] reads both forms.
//!
//! # DOM ids
//! `dom_id` renders a key as `<prefix>-<seg>-<seg>...` where
//! - array indices are plain decimal digits,
//! - property names keep ASCII letters and digits, every other byte (and a
//!   leading digit) is written as `_xx` lowercase hex, and the empty name
//!   is written as a lone `_`.
//!
//! A rendered segment never contains `-` and a property never renders as
//! all digits, so distinct keys always yield distinct ids.

use std::fmt;

/// Separator between rendered segments
pub const DOM_ID_SEPARATOR: char = '-';

/// One step from a parent to a child
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Property(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        PathSegment::Property(name.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Structural identifier of a field
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    segments: Vec<PathSegment>,
}

impl FieldKey {
    /// The form root
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.segments.push(segment.into());
    }

    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut key = self.clone();
        key.push(segment);
        key
    }

    /// Check whether `self` is `other` or one of its ancestors
    pub fn is_prefix_of(&self, other: &FieldKey) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Parse a path such as `items.0.name`, `items[0].name` or
    /// `codes["0"]`. Bare all-digit parts are indices; quoted parts are
    /// always property names.
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        let mut bare = String::new();
        let mut chars = path.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '.' | ']' => push_bare(&mut bare, &mut segments),
                '[' => {
                    push_bare(&mut bare, &mut segments);
                    if chars.next_if_eq(&'"').is_some() {
                        let mut name = String::new();
                        while let Some(c) = chars.next() {
                            match c {
                                '"' => break,
                                '\\' => name.extend(chars.next()),
                                other => name.push(other),
                            }
                        }
                        segments.push(PathSegment::Property(name));
                    }
                }
                other => bare.push(other),
            }
        }
        push_bare(&mut bare, &mut segments);
        Self { segments }
    }

    /// Render as a DOM id under the given prefix
    pub fn dom_id(&self, prefix: &str) -> String {
        let mut id = escape_name(prefix);
        for segment in &self.segments {
            id.push(DOM_ID_SEPARATOR);
            match segment {
                PathSegment::Property(name) => id.push_str(&escape_name(name)),
                PathSegment::Index(index) => id.push_str(&index.to_string()),
            }
        }
        id
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Property(name) if needs_quotes(name) => {
                    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "[\"{escaped}\"]")?
                }
                PathSegment::Property(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Property(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Id of the element holding a field's blocking errors
pub fn error_container_id(field_dom_id: &str) -> String {
    format!("{field_dom_id}--error")
}

/// Id of the element holding a field's warnings
pub fn warning_container_id(field_dom_id: &str) -> String {
    format!("{field_dom_id}--warning")
}

fn push_bare(part: &mut String, segments: &mut Vec<PathSegment>) {
    if part.is_empty() {
        return;
    }
    let segment = match part.parse::<usize>() {
        Ok(index) => PathSegment::Index(index),
        Err(_) => PathSegment::Property(part.clone()),
    };
    segments.push(segment);
    part.clear();
}

fn needs_quotes(name: &str) -> bool {
    name.is_empty()
        || name.parse::<usize>().is_ok()
        || name.contains(['.', '[', ']', '"', '\\'])
}

fn escape_name(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }
    let mut out = String::with_capacity(name.len());
    for (i, byte) in name.bytes().enumerate() {
        let keep = byte.is_ascii_alphabetic() || (byte.is_ascii_digit() && i > 0);
        if keep {
            out.push(byte as char);
        } else {
            out.push_str(&format!("_{byte:02x}"));
        }
    }
    out
}
