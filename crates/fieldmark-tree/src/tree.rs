//! Field Tree (arena-based allocation)
//!
//! Groups, arrays and leaves live in one arena. Handles carry the slot
//! generation, so a handle to a removed field never aliases a field that
//! later reuses the slot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};

use crate::validation::{Constraints, ValidationError, is_blocking};
use crate::{FieldId, FieldKey, FieldResolutionError, Generation, PathSegment, TreeError};

#[derive(Debug)]
enum NodeKind {
    Group(Vec<(String, FieldId)>),
    Array(Vec<FieldId>),
    Leaf { value: Value, initial: Value },
}

#[derive(Debug)]
struct FieldNode {
    parent: Option<FieldId>,
    kind: NodeKind,
    touched: bool,
    dirty: bool,
    disabled: bool,
    /// Client-side errors (constraint output or pushed by a validator)
    errors: Vec<ValidationError>,
    /// Errors applied from a submission, cleared on the next value change
    server_errors: Vec<ValidationError>,
    constraints: Option<Constraints>,
    state: Generation,
}

impl FieldNode {
    fn new(parent: Option<FieldId>, kind: NodeKind) -> Self {
        Self {
            parent,
            kind,
            touched: false,
            dirty: false,
            disabled: false,
            errors: Vec::new(),
            server_errors: Vec::new(),
            constraints: None,
            state: Generation::INITIAL,
        }
    }

    fn touched_flag(&mut self) -> &mut bool {
        &mut self.touched
    }

    fn dirty_flag(&mut self) -> &mut bool {
        &mut self.dirty
    }

    fn revalidate(&mut self) {
        if let (Some(constraints), NodeKind::Leaf { value, .. }) = (&self.constraints, &self.kind) {
            self.errors = constraints.validate(value);
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<FieldNode>,
}

static NEXT_TREE_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Arena-based field tree
#[derive(Debug)]
pub struct FieldTree {
    /// Process-unique; handles of two trees may coincide, instances never do
    instance: u64,
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    structure: Generation,
}

impl Default for FieldTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldTree {
    /// Create a tree with an empty root group
    pub fn new() -> Self {
        let mut tree = Self {
            instance: NEXT_TREE_INSTANCE.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free_list: Vec::new(),
            structure: Generation::INITIAL,
        };
        tree.alloc(FieldNode::new(None, NodeKind::Group(Vec::new())));
        tree
    }

    /// Build a tree from a JSON value: objects become groups, arrays become
    /// arrays and everything else becomes a leaf.
    ///
    /// A non-object value is wrapped as the single property `value`.
    pub fn from_value(value: &Value) -> Self {
        let mut tree = Self::new();
        match value {
            Value::Object(map) => {
                let mut props = Vec::with_capacity(map.len());
                for (name, child) in map {
                    let id = tree.build(FieldId::ROOT, child);
                    props.push((name.clone(), id));
                }
                if let Some(root) = tree.node_mut(FieldId::ROOT) {
                    root.kind = NodeKind::Group(props);
                }
            }
            other => {
                let id = tree.build(FieldId::ROOT, other);
                if let Some(root) = tree.node_mut(FieldId::ROOT) {
                    root.kind = NodeKind::Group(vec![("value".to_string(), id)]);
                }
            }
        }
        tree
    }

    pub fn root(&self) -> FieldId {
        FieldId::ROOT
    }

    /// Identity of this tree instance
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Generation of the tree's shape; bumped by every add, remove or detach
    pub fn structure_generation(&self) -> Generation {
        self.structure
    }

    /// Generation of one field's own state
    pub fn state_generation(&self, id: FieldId) -> Option<Generation> {
        self.node(id).map(|n| n.state)
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live fields (attached or detached)
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Arena
    // ------------------------------------------------------------------

    fn alloc(&mut self, node: FieldNode) -> FieldId {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            FieldId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            FieldId {
                index,
                generation: 0,
            }
        }
    }

    fn free(&mut self, id: FieldId) {
        let children = self.children(id);
        for child in children {
            self.free(child);
        }
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(id.index);
            }
        }
    }

    fn node(&self, id: FieldId) -> Option<&FieldNode> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, id: FieldId) -> Option<&mut FieldNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    fn live_mut(&mut self, id: FieldId) -> Result<&mut FieldNode, TreeError> {
        self.node_mut(id).ok_or(TreeError::Stale(id))
    }

    fn build(&mut self, parent: FieldId, value: &Value) -> FieldId {
        match value {
            Value::Object(map) => {
                let id = self.alloc(FieldNode::new(Some(parent), NodeKind::Group(Vec::new())));
                let mut props = Vec::with_capacity(map.len());
                for (name, child) in map {
                    props.push((name.clone(), self.build(id, child)));
                }
                if let Some(node) = self.node_mut(id) {
                    node.kind = NodeKind::Group(props);
                }
                id
            }
            Value::Array(items) => {
                let id = self.alloc(FieldNode::new(Some(parent), NodeKind::Array(Vec::new())));
                let children = items.iter().map(|item| self.build(id, item)).collect();
                if let Some(node) = self.node_mut(id) {
                    node.kind = NodeKind::Array(children);
                }
                id
            }
            scalar => {
                let leaf = NodeKind::Leaf {
                    value: scalar.clone(),
                    initial: scalar.clone(),
                };
                self.alloc(FieldNode::new(Some(parent), leaf))
            }
        }
    }

    fn build_leaf(&mut self, parent: FieldId, value: Value) -> FieldId {
        let leaf = NodeKind::Leaf {
            initial: value.clone(),
            value,
        };
        self.alloc(FieldNode::new(Some(parent), leaf))
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Add a property built from `value` to a group
    pub fn add_property(
        &mut self,
        group: FieldId,
        name: &str,
        value: &Value,
    ) -> Result<FieldId, TreeError> {
        self.check_new_property(group, name)?;
        let id = self.build(group, value);
        self.attach_property(group, name, id)
    }

    /// Add a leaf property whose value is kept as-is, even for objects/arrays
    pub fn add_leaf(
        &mut self,
        group: FieldId,
        name: &str,
        value: Value,
    ) -> Result<FieldId, TreeError> {
        self.check_new_property(group, name)?;
        let id = self.build_leaf(group, value);
        self.attach_property(group, name, id)
    }

    fn check_new_property(&self, group: FieldId, name: &str) -> Result<(), TreeError> {
        match self.node(group).map(|n| &n.kind) {
            None => Err(TreeError::Stale(group)),
            Some(NodeKind::Group(props)) if props.iter().any(|(n, _)| n == name) => {
                Err(TreeError::DuplicateProperty {
                    parent: group,
                    name: name.to_string(),
                })
            }
            Some(NodeKind::Group(_)) => Ok(()),
            Some(_) => Err(TreeError::NotAGroup(group)),
        }
    }

    fn attach_property(
        &mut self,
        group: FieldId,
        name: &str,
        id: FieldId,
    ) -> Result<FieldId, TreeError> {
        match &mut self.live_mut(group)?.kind {
            NodeKind::Group(props) => props.push((name.to_string(), id)),
            _ => return Err(TreeError::NotAGroup(group)),
        }
        self.bump_structure("add_property", group);
        Ok(id)
    }

    /// Remove a property (and its subtree) from a group
    pub fn remove_property(&mut self, group: FieldId, name: &str) -> Result<(), TreeError> {
        let removed = match &mut self.live_mut(group)?.kind {
            NodeKind::Group(props) => {
                let pos = props.iter().position(|(n, _)| n == name).ok_or_else(|| {
                    TreeError::NoSuchProperty {
                        parent: group,
                        name: name.to_string(),
                    }
                })?;
                props.remove(pos).1
            }
            _ => return Err(TreeError::NotAGroup(group)),
        };
        self.free(removed);
        self.bump_structure("remove_property", group);
        Ok(())
    }

    /// Append an item built from `value` to an array
    pub fn push_item(&mut self, array: FieldId, value: &Value) -> Result<FieldId, TreeError> {
        let len = self.array_items(array)?.len();
        self.insert_item(array, len, value)
    }

    /// Insert an item built from `value` at `index`, shifting later items
    pub fn insert_item(
        &mut self,
        array: FieldId,
        index: usize,
        value: &Value,
    ) -> Result<FieldId, TreeError> {
        let len = self.array_items(array)?.len();
        if index > len {
            return Err(TreeError::IndexOutOfBounds { array, index, len });
        }
        let id = self.build(array, value);
        if let NodeKind::Array(items) = &mut self.live_mut(array)?.kind {
            items.insert(index, id);
        }
        self.bump_structure("insert_item", array);
        Ok(id)
    }

    /// Remove the item at `index`; later items shift down by one
    pub fn remove_item(&mut self, array: FieldId, index: usize) -> Result<(), TreeError> {
        let len = self.array_items(array)?.len();
        if index >= len {
            return Err(TreeError::IndexOutOfBounds { array, index, len });
        }
        let removed = match &mut self.live_mut(array)?.kind {
            NodeKind::Array(items) => items.remove(index),
            _ => return Err(TreeError::NotAnArray(array)),
        };
        self.free(removed);
        self.bump_structure("remove_item", array);
        Ok(())
    }

    /// Unlink a field from its parent while keeping it alive.
    ///
    /// The detached subtree can still be read, but it no longer resolves to
    /// a rooted path.
    pub fn detach(&mut self, id: FieldId) -> Result<(), TreeError> {
        if id == FieldId::ROOT {
            return Err(TreeError::RootImmutable);
        }
        let parent = self.node(id).ok_or(TreeError::Stale(id))?.parent;
        let Some(parent) = parent else {
            return Ok(());
        };
        if let Some(node) = self.node_mut(parent) {
            match &mut node.kind {
                NodeKind::Group(props) => props.retain(|(_, child)| *child != id),
                NodeKind::Array(items) => items.retain(|child| *child != id),
                NodeKind::Leaf { .. } => {}
            }
        }
        self.live_mut(id)?.parent = None;
        self.bump_structure("detach", id);
        Ok(())
    }

    fn bump_structure(&mut self, op: &str, at: FieldId) {
        let current = self.structure.bump();
        tracing::trace!(
            target: "fieldmark::tree",
            op,
            field = %at,
            generation = current.value(),
            "structure changed"
        );
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: FieldId) -> Option<FieldId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Direct children in order
    pub fn children(&self, id: FieldId) -> Vec<FieldId> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Group(props)) => props.iter().map(|(_, child)| *child).collect(),
            Some(NodeKind::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    fn array_items(&self, array: FieldId) -> Result<&[FieldId], TreeError> {
        match self.node(array).map(|n| &n.kind) {
            None => Err(TreeError::Stale(array)),
            Some(NodeKind::Array(items)) => Ok(items),
            Some(_) => Err(TreeError::NotAnArray(array)),
        }
    }

    /// Number of items in an array field
    pub fn item_count(&self, array: FieldId) -> Result<usize, TreeError> {
        self.array_items(array).map(|items| items.len())
    }

    pub fn is_leaf(&self, id: FieldId) -> bool {
        matches!(self.node(id).map(|n| &n.kind), Some(NodeKind::Leaf { .. }))
    }

    /// Child at one path segment
    pub fn child(&self, parent: FieldId, segment: &PathSegment) -> Option<FieldId> {
        match (self.node(parent).map(|n| &n.kind), segment) {
            (Some(NodeKind::Group(props)), PathSegment::Property(name)) => {
                props.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
            }
            (Some(NodeKind::Array(items)), PathSegment::Index(index)) => items.get(*index).copied(),
            _ => None,
        }
    }

    /// Field currently at `key`
    pub fn lookup(&self, key: &FieldKey) -> Option<FieldId> {
        key.segments()
            .iter()
            .try_fold(FieldId::ROOT, |current, segment| self.child(current, segment))
    }

    /// Ancestors from the parent upwards
    pub fn ancestors(&self, id: FieldId) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// All fields reachable from the root, depth-first in document order
    pub fn walk(&self) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut stack = vec![FieldId::ROOT];
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolve a field's current position from the root
    pub fn resolve(&self, id: FieldId) -> Result<FieldKey, FieldResolutionError> {
        let detached = |mut segments: Vec<PathSegment>| {
            segments.reverse();
            FieldResolutionError::Detached {
                field: id,
                partial: FieldKey::new(segments),
            }
        };
        let mut segments = Vec::new();
        let mut current = id;
        let mut node = self.node(id).ok_or(FieldResolutionError::Dangling(id))?;

        while let Some(parent_id) = node.parent {
            let Some(parent) = self.node(parent_id) else {
                return Err(detached(segments));
            };
            let segment = match &parent.kind {
                NodeKind::Group(props) => props
                    .iter()
                    .find(|(_, child)| *child == current)
                    .map(|(name, _)| PathSegment::Property(name.clone())),
                NodeKind::Array(items) => items
                    .iter()
                    .position(|child| *child == current)
                    .map(PathSegment::Index),
                NodeKind::Leaf { .. } => None,
            };
            let Some(segment) = segment else {
                return Err(detached(segments));
            };
            segments.push(segment);
            current = parent_id;
            node = parent;
        }

        if current != FieldId::ROOT {
            return Err(detached(segments));
        }
        segments.reverse();
        Ok(FieldKey::new(segments))
    }

    // ------------------------------------------------------------------
    // Field state
    // ------------------------------------------------------------------

    /// Assembled value of a field and its descendants
    pub fn value(&self, id: FieldId) -> Option<Value> {
        let node = self.node(id)?;
        Some(match &node.kind {
            NodeKind::Leaf { value, .. } => value.clone(),
            NodeKind::Array(items) => {
                Value::Array(items.iter().filter_map(|item| self.value(*item)).collect())
            }
            NodeKind::Group(props) => {
                let mut map = Map::new();
                for (name, child) in props {
                    if let Some(v) = self.value(*child) {
                        map.insert(name.clone(), v);
                    }
                }
                Value::Object(map)
            }
        })
    }

    /// Set a leaf's value, re-running its constraints.
    ///
    /// The field becomes dirty once the value differs from its initial value
    /// and stays dirty until [`FieldTree::reset`]; its groups and arrays
    /// become dirty with it. Server errors are cleared.
    pub fn set_value(&mut self, id: FieldId, value: Value) -> Result<(), TreeError> {
        let node = self.live_mut(id)?;
        let changed = match &mut node.kind {
            NodeKind::Leaf { value: current, initial } => {
                let changed = value != *initial;
                *current = value;
                changed
            }
            _ => return Err(TreeError::NotALeaf(id)),
        };
        if changed {
            node.dirty = true;
        }
        node.server_errors.clear();
        node.revalidate();
        node.state.bump();
        if changed {
            self.flag_ancestors(id, FieldNode::dirty_flag);
        }
        Ok(())
    }

    /// Mark a field touched, together with every group and array above it
    pub fn mark_touched(&mut self, id: FieldId) -> Result<(), TreeError> {
        let node = self.live_mut(id)?;
        if !node.touched {
            node.touched = true;
            node.state.bump();
        }
        self.flag_ancestors(id, FieldNode::touched_flag);
        Ok(())
    }

    /// Set a sticky flag on each ancestor, stopping at the first one that
    /// already has it (everything above is flagged too)
    fn flag_ancestors(&mut self, id: FieldId, flag: fn(&mut FieldNode) -> &mut bool) {
        for ancestor in self.ancestors(id) {
            let Some(node) = self.node_mut(ancestor) else {
                break;
            };
            let slot = flag(node);
            if *slot {
                break;
            }
            *slot = true;
            node.state.bump();
        }
    }

    /// Mark every attached field touched
    pub fn mark_all_touched(&mut self) {
        for id in self.walk() {
            if let Some(node) = self.node_mut(id) {
                if !node.touched {
                    node.touched = true;
                    node.state.bump();
                }
            }
        }
    }

    pub fn set_disabled(&mut self, id: FieldId, disabled: bool) -> Result<(), TreeError> {
        let node = self.live_mut(id)?;
        if node.disabled != disabled {
            node.disabled = disabled;
            node.state.bump();
        }
        Ok(())
    }

    /// Replace a field's client-side errors
    pub fn set_errors(
        &mut self,
        id: FieldId,
        errors: Vec<ValidationError>,
    ) -> Result<(), TreeError> {
        let node = self.live_mut(id)?;
        if node.errors != errors {
            node.errors = errors;
            node.state.bump();
        }
        Ok(())
    }

    /// Attach constraints to a leaf and validate it immediately
    pub fn set_constraints(
        &mut self,
        id: FieldId,
        constraints: Constraints,
    ) -> Result<(), TreeError> {
        let node = self.live_mut(id)?;
        if !matches!(node.kind, NodeKind::Leaf { .. }) {
            return Err(TreeError::NotALeaf(id));
        }
        node.constraints = Some(constraints);
        node.revalidate();
        node.state.bump();
        Ok(())
    }

    /// Add an error reported by the server for this field
    pub fn apply_server_error(
        &mut self,
        id: FieldId,
        error: ValidationError,
    ) -> Result<(), TreeError> {
        let node = self.live_mut(id)?;
        node.server_errors.push(error);
        node.state.bump();
        Ok(())
    }

    pub fn clear_server_errors(&mut self) {
        for slot in &mut self.slots {
            if let Some(node) = slot.node.as_mut() {
                if !node.server_errors.is_empty() {
                    node.server_errors.clear();
                    node.state.bump();
                }
            }
        }
    }

    pub fn is_touched(&self, id: FieldId) -> bool {
        self.node(id).is_some_and(|n| n.touched)
    }

    pub fn is_dirty(&self, id: FieldId) -> bool {
        self.node(id).is_some_and(|n| n.dirty)
    }

    pub fn is_disabled(&self, id: FieldId) -> bool {
        self.node(id).is_some_and(|n| n.disabled)
    }

    /// Disabled itself or through a disabled ancestor
    pub fn is_effectively_disabled(&self, id: FieldId) -> bool {
        self.is_disabled(id) || self.ancestors(id).into_iter().any(|a| self.is_disabled(a))
    }

    /// Current errors of a field: client errors followed by server errors
    pub fn errors(&self, id: FieldId) -> Vec<ValidationError> {
        self.node(id)
            .map(|n| n.errors.iter().chain(&n.server_errors).cloned().collect())
            .unwrap_or_default()
    }

    /// Errors of a field and all its descendants
    pub fn error_summary(&self, id: FieldId) -> Vec<(FieldId, ValidationError)> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.extend(self.errors(current).into_iter().map(|e| (current, e)));
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// No attached, enabled field carries a blocking error
    pub fn is_valid(&self) -> bool {
        self.walk()
            .into_iter()
            .filter(|id| !self.is_effectively_disabled(*id))
            .all(|id| !self.errors(id).iter().any(is_blocking))
    }

    /// Restore initial values and clear interaction state; the shape is kept
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            if let Some(node) = slot.node.as_mut() {
                if let NodeKind::Leaf { value, initial } = &mut node.kind {
                    *value = initial.clone();
                }
                node.touched = false;
                node.dirty = false;
                node.server_errors.clear();
                node.revalidate();
                node.state.bump();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_warning;
    use serde_json::json;

    fn sample() -> FieldTree {
        FieldTree::from_value(&json!({
            "email": "",
            "items": [{"name": "a"}, {"name": "b"}, {"name": "c"}],
        }))
    }

    fn key(path: &str) -> FieldKey {
        FieldKey::parse(path)
    }

    #[test]
    fn test_from_value_and_lookup() {
        let tree = sample();
        let name = tree.lookup(&key("items[1].name")).unwrap();
        assert_eq!(tree.value(name), Some(json!("b")));
        assert_eq!(tree.resolve(name).unwrap(), key("items[1].name"));
        assert_eq!(tree.value(tree.root()).unwrap()["items"][2]["name"], json!("c"));
    }

    #[test]
    fn test_distinct_fields_distinct_keys() {
        let tree = sample();
        let keys: Vec<FieldKey> =
            tree.walk().into_iter().map(|id| tree.resolve(id).unwrap()).collect();
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn test_remove_item_shifts_keys() {
        let mut tree = sample();
        let items = tree.lookup(&key("items")).unwrap();
        let first = tree.lookup(&key("items[1]")).unwrap();
        let second = tree.lookup(&key("items[2]")).unwrap();
        let before = tree.structure_generation();

        tree.remove_item(items, 1).unwrap();

        assert_ne!(tree.structure_generation(), before);
        assert_eq!(tree.resolve(second).unwrap(), key("items[1]"));
        assert_eq!(tree.resolve(first), Err(FieldResolutionError::Dangling(first)));
        assert_eq!(tree.item_count(items), Ok(2));
    }

    #[test]
    fn test_stale_handle_not_aliased_by_reused_slot() {
        let mut tree = sample();
        let items = tree.lookup(&key("items")).unwrap();
        let old = tree.lookup(&key("items[0].name")).unwrap();
        tree.remove_item(items, 0).unwrap();
        let fresh = tree.push_item(items, &json!("x")).unwrap();

        assert!(!tree.contains(old));
        assert!(tree.contains(fresh));
        assert_eq!(tree.set_value(old, json!("z")), Err(TreeError::Stale(old)));
    }

    #[test]
    fn test_insert_item() {
        let mut tree = sample();
        let items = tree.lookup(&key("items")).unwrap();
        let last = tree.lookup(&key("items[2]")).unwrap();
        let inserted = tree.insert_item(items, 0, &json!({"name": "z"})).unwrap();
        assert_eq!(tree.resolve(inserted).unwrap(), key("items[0]"));
        assert_eq!(tree.resolve(last).unwrap(), key("items[3]"));
        assert!(matches!(
            tree.insert_item(items, 10, &json!(1)),
            Err(TreeError::IndexOutOfBounds { index: 10, len: 4, .. })
        ));
    }

    #[test]
    fn test_detach_gives_partial_path() {
        let mut tree = sample();
        let item = tree.lookup(&key("items[0]")).unwrap();
        let name = tree.lookup(&key("items[0].name")).unwrap();
        tree.detach(item).unwrap();

        let err = tree.resolve(name).unwrap_err();
        assert_eq!(err.partial_path(), Some(&key("name")));
        assert_eq!(tree.detach(FieldId::ROOT), Err(TreeError::RootImmutable));
    }

    #[test]
    fn test_properties() {
        let mut tree = FieldTree::new();
        let root = tree.root();
        let email = tree.add_property(root, "email", &json!("")).unwrap();
        assert!(matches!(
            tree.add_property(root, "email", &json!("")),
            Err(TreeError::DuplicateProperty { .. })
        ));
        assert_eq!(tree.add_property(email, "x", &json!(1)), Err(TreeError::NotAGroup(email)));

        tree.remove_property(root, "email").unwrap();
        assert!(!tree.contains(email));
        assert!(matches!(
            tree.remove_property(root, "email"),
            Err(TreeError::NoSuchProperty { .. })
        ));
    }

    #[test]
    fn test_dirty_touched_and_reset() {
        let mut tree = sample();
        let email = tree.lookup(&key("email")).unwrap();
        let before = tree.state_generation(email).unwrap();

        tree.set_value(email, json!("a@b.c")).unwrap();
        assert!(tree.is_dirty(email));
        assert_ne!(tree.state_generation(email), Some(before));

        // sticky even when typed back to the initial value
        tree.set_value(email, json!("")).unwrap();
        assert!(tree.is_dirty(email));

        tree.mark_all_touched();
        assert!(tree.is_touched(email));
        assert!(tree.is_touched(tree.lookup(&key("items[2].name")).unwrap()));

        tree.reset();
        assert!(!tree.is_dirty(email));
        assert!(!tree.is_touched(email));
    }

    #[test]
    fn test_groups_follow_descendant_interaction() {
        let mut tree = FieldTree::from_value(&json!({
            "passwords": {"pw": "", "confirm": ""},
            "items": [{"name": "a"}],
        }));
        let passwords = tree.lookup(&key("passwords")).unwrap();
        let pw = tree.lookup(&key("passwords.pw")).unwrap();
        let items = tree.lookup(&key("items")).unwrap();
        let item = tree.lookup(&key("items[0]")).unwrap();
        let name = tree.lookup(&key("items[0].name")).unwrap();
        let group_state = tree.state_generation(passwords);

        tree.mark_touched(pw).unwrap();
        assert!(tree.is_touched(passwords));
        assert!(tree.is_touched(tree.root()));
        assert!(!tree.is_dirty(passwords));
        assert_ne!(tree.state_generation(passwords), group_state);

        // unchanged value: nothing becomes dirty
        tree.set_value(name, json!("a")).unwrap();
        assert!(!tree.is_dirty(item));

        tree.set_value(name, json!("b")).unwrap();
        assert!(tree.is_dirty(item));
        assert!(tree.is_dirty(items));
        assert!(!tree.is_touched(items));

        tree.reset();
        assert!(!tree.is_touched(passwords));
        assert!(!tree.is_dirty(items));
    }

    #[test]
    fn test_tree_instances_are_distinct() {
        let first = sample();
        let second = sample();
        assert_ne!(first.instance(), second.instance());
        assert_eq!(first.structure_generation(), second.structure_generation());
    }

    #[test]
    fn test_constraints_and_server_errors() {
        let mut tree = sample();
        let email = tree.lookup(&key("email")).unwrap();
        tree.set_constraints(email, Constraints::required()).unwrap();
        assert_eq!(tree.errors(email)[0].kind(), Some("required"));
        assert!(!tree.is_valid());

        tree.set_value(email, json!("me@example.com")).unwrap();
        assert!(tree.errors(email).is_empty());
        assert!(tree.is_valid());

        tree.apply_server_error(email, ValidationError::new("taken")).unwrap();
        assert_eq!(tree.errors(email).len(), 1);
        assert!(!tree.is_valid());

        tree.set_value(email, json!("other@example.com")).unwrap();
        assert!(tree.errors(email).is_empty());
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut tree = sample();
        let email = tree.lookup(&key("email")).unwrap();
        tree.set_errors(email, vec![make_warning("disposable", None)]).unwrap();
        assert!(tree.is_valid());
    }

    #[test]
    fn test_disabled_fields_ignored_for_validity() {
        let mut tree = sample();
        let email = tree.lookup(&key("email")).unwrap();
        tree.set_errors(email, vec![ValidationError::new("required")]).unwrap();
        tree.set_disabled(email, true).unwrap();
        assert!(tree.is_valid());
    }

    #[test]
    fn test_error_summary() {
        let mut tree = sample();
        let items = tree.lookup(&key("items")).unwrap();
        let name = tree.lookup(&key("items[1].name")).unwrap();
        tree.set_errors(name, vec![ValidationError::new("required")]).unwrap();
        let summary = tree.error_summary(items);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].0, name);
    }
}
