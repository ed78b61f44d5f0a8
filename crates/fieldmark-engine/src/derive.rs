//! Derived Field State
//!
//! Per-field visibility and accessibility output, computed on demand and
//! cached together with the generations of every input it read:
//! - the tree instance and its structure generation (keys change with
//!   structure)
//! - the state generations of the field and each ancestor
//! - the form context revision
//! - the display-override revision
//!
//! A read whose inputs moved recomputes synchronously before returning, so
//! no stale key or visibility is ever observed.

use std::collections::{HashMap, HashSet};

use fieldmark_a11y::{AccessibilityAttributes, bind};
use fieldmark_tree::{
    Cached, FieldId, FieldKey, FieldResolutionError, FieldTree, Generation, ResolutionPolicy,
    ValidationError, partition,
};

use crate::form::FormContext;
use crate::strategy::{FieldStatus, combine_show_errors, should_show};

/// Visible state of one field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRuntimeState {
    pub visible: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

/// Everything a presentation component needs for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub key: FieldKey,
    pub dom_id: String,
    pub state: FieldRuntimeState,
    /// `None` when `autoAria` is off
    pub attributes: Option<AccessibilityAttributes>,
    /// The key is a lenient fallback and may not be stable
    pub degraded: bool,
}

impl FieldView {
    pub fn visible(&self) -> bool {
        self.state.visible
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.state.errors
    }

    pub fn warnings(&self) -> &[ValidationError] {
        &self.state.warnings
    }
}

/// Input generations a derived value was computed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InputStamp {
    tree: u64,
    structure: Generation,
    /// Field first, then ancestors upwards
    states: Vec<Option<Generation>>,
    form: Generation,
    overrides: Generation,
}

impl InputStamp {
    pub(crate) fn capture(
        tree: &FieldTree,
        id: FieldId,
        form: &FormContext,
        overrides: Generation,
    ) -> Self {
        let states = std::iter::once(id)
            .chain(tree.ancestors(id))
            .map(|field| tree.state_generation(field))
            .collect();
        Self {
            tree: tree.instance(),
            structure: tree.structure_generation(),
            states,
            form: form.revision(),
            overrides,
        }
    }
}

pub(crate) type Derived = Result<FieldView, FieldResolutionError>;

/// Cache of derived field views keyed by handle
#[derive(Debug, Default)]
pub(crate) struct DerivationCache {
    entries: HashMap<FieldId, Cached<Derived, InputStamp>>,
    recomputations: u64,
    /// Tree instance and structure generation the entries were last pruned at
    synced: Option<(u64, Generation)>,
}

impl DerivationCache {
    /// Cached value if `stamp` still matches, else recompute and store
    pub(crate) fn get_or_compute(
        &mut self,
        id: FieldId,
        stamp: InputStamp,
        compute: impl FnOnce() -> Derived,
    ) -> Derived {
        if let Some(value) = self.entries.get(&id).and_then(|entry| entry.get_if_valid(&stamp)) {
            return value.clone();
        }
        let value = compute();
        self.recomputations += 1;
        self.entries.insert(id, Cached::new(value.clone(), stamp));
        value
    }

    pub(crate) fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Drop entries of fields that no longer exist
    pub(crate) fn prune(&mut self, tree: &FieldTree) {
        self.entries.retain(|id, _| tree.contains(*id));
    }

    /// Prune once per structural change; a different tree drops everything
    pub(crate) fn sync(&mut self, tree: &FieldTree) {
        let current = (tree.instance(), tree.structure_generation());
        match self.synced {
            Some(synced) if synced == current => return,
            Some((instance, _)) if instance == current.0 => self.prune(tree),
            _ => self.entries.clear(),
        }
        self.synced = Some(current);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Compute a field's view from scratch
pub(crate) fn derive_field(
    tree: &FieldTree,
    id: FieldId,
    form: &FormContext,
    forced: &HashSet<FieldId>,
) -> Derived {
    let config = form.config();
    let policy = ResolutionPolicy::from_strict(config.strict_field_resolution);
    let resolved = tree.resolve_with(id, policy)?;
    let dom_id = resolved.key.dom_id(form.dom_prefix());

    let records = tree.errors(id);
    let classified = partition(&records);
    if classified.ignored > 0 && config.debug {
        tracing::debug!(
            target: "fieldmark::derive",
            field = %resolved.key,
            ignored = classified.ignored,
            "ignored validation records without a kind"
        );
    }

    let form_state = form.state();
    let status = FieldStatus {
        touched: tree.is_touched(id),
        dirty: tree.is_dirty(id),
    };
    let own = should_show(form_state.active_strategy, status, &form_state);
    let ancestor_forced = std::iter::once(id)
        .chain(tree.ancestors(id))
        .any(|field| forced.contains(&field));
    let show = combine_show_errors(own, ancestor_forced) && !tree.is_effectively_disabled(id);
    let visible = show && !classified.is_empty();

    let attributes = config
        .auto_aria
        .then(|| bind(&dom_id, &classified.errors, &classified.warnings, visible));

    if config.debug {
        tracing::debug!(
            target: "fieldmark::derive",
            form = %form.name(),
            field = %resolved.key,
            visible,
            errors = classified.errors.len(),
            warnings = classified.warnings.len(),
            "field state recomputed"
        );
    }

    Ok(FieldView {
        key: resolved.key,
        dom_id,
        state: FieldRuntimeState {
            visible,
            errors: classified.errors,
            warnings: classified.warnings,
        },
        attributes,
        degraded: resolved.degraded.is_some(),
    })
}
