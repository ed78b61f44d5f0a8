//! Policy-gated resolution
//!
//! Strict resolution surfaces [`FieldResolutionError`]. Lenient resolution
//! substitutes a synthetic key built from whatever partial path is
//! available, so the field still renders.

use crate::{FieldId, FieldKey, FieldResolutionError, FieldTree, PathSegment};

/// Leading segment of keys synthesized for unreachable fields
pub const SYNTHETIC_MARKER: &str = "~unresolved";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    Strict,
    #[default]
    Lenient,
}

impl ResolutionPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Lenient }
    }
}

/// Outcome of a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub key: FieldKey,
    /// Set when `key` is a lenient fallback
    pub degraded: Option<FieldResolutionError>,
}

impl Resolved {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

impl FieldResolutionError {
    /// Best-effort key for a field that cannot be traced to the root.
    ///
    /// The slot index keeps two unreachable fields apart; it is not stable
    /// across slot reuse.
    pub fn synthetic_key(&self) -> FieldKey {
        let field = self.field();
        let mut key = FieldKey::new(vec![
            PathSegment::Property(SYNTHETIC_MARKER.to_string()),
            PathSegment::Index(field.index() as usize),
        ]);
        match self.partial_path() {
            Some(partial) => {
                for segment in partial.segments() {
                    key.push(segment.clone());
                }
            }
            None => key.push(PathSegment::Index(field.generation() as usize)),
        }
        key
    }
}

impl FieldTree {
    /// Resolve under a policy
    pub fn resolve_with(
        &self,
        id: FieldId,
        policy: ResolutionPolicy,
    ) -> Result<Resolved, FieldResolutionError> {
        match self.resolve(id) {
            Ok(key) => Ok(Resolved {
                key,
                degraded: None,
            }),
            Err(err) if policy == ResolutionPolicy::Strict => {
                tracing::debug!(
                    target: "fieldmark::tree",
                    error = %err,
                    "strict field resolution failed"
                );
                Err(err)
            }
            Err(err) => {
                let key = err.synthetic_key();
                tracing::warn!(
                    target: "fieldmark::tree",
                    error = %err,
                    fallback = %key,
                    "using synthetic field key"
                );
                Ok(Resolved {
                    key,
                    degraded: Some(err),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_fallback_uses_partial_path() {
        let mut tree = FieldTree::from_value(&json!({"address": {"city": "Oslo"}}));
        let address = tree.lookup(&FieldKey::parse("address")).unwrap();
        let city = tree.lookup(&FieldKey::parse("address.city")).unwrap();
        tree.detach(address).unwrap();

        let resolved = tree.resolve_with(city, ResolutionPolicy::Lenient).unwrap();
        assert!(resolved.is_degraded());
        let segments = resolved.key.segments();
        assert_eq!(segments[0], PathSegment::Property(SYNTHETIC_MARKER.into()));
        assert_eq!(segments.last(), Some(&PathSegment::Property("city".into())));
    }

    #[test]
    fn test_strict_propagates() {
        let mut tree = FieldTree::from_value(&json!({"tags": ["a", "b"]}));
        let tags = tree.lookup(&FieldKey::parse("tags")).unwrap();
        let first = tree.lookup(&FieldKey::parse("tags[0]")).unwrap();
        tree.remove_item(tags, 0).unwrap();

        let err = tree.resolve_with(first, ResolutionPolicy::Strict).unwrap_err();
        assert_eq!(err, FieldResolutionError::Dangling(first));
    }

    #[test]
    fn test_synthetic_keys_do_not_collide_with_real_ones() {
        let mut tree = FieldTree::from_value(&json!({"a": 1, "b": 2}));
        let a = tree.lookup(&FieldKey::parse("a")).unwrap();
        let b = tree.lookup(&FieldKey::parse("b")).unwrap();
        tree.detach(a).unwrap();

        let fallback = tree.resolve_with(a, ResolutionPolicy::Lenient).unwrap().key;
        let real = tree.resolve_with(b, ResolutionPolicy::Lenient).unwrap().key;
        assert_ne!(fallback.dom_id("f"), real.dom_id("f"));
    }

    #[test]
    fn test_resolved_fields_are_not_degraded() {
        let tree = FieldTree::from_value(&json!({"a": 1}));
        let a = tree.lookup(&FieldKey::parse("a")).unwrap();
        let resolved = tree.resolve_with(a, ResolutionPolicy::Strict).unwrap();
        assert_eq!(resolved.key, FieldKey::parse("a"));
        assert!(!resolved.is_degraded());
    }
}
