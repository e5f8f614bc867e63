//! Arena-backed node graph.
//!
//! Ownership edges (parent/children) form a strict tree; links are plain
//! ids into the same arena and never own anything. Uses a generational
//! arena so stale ids from destroyed nodes resolve to nothing instead of
//! aliasing a new node.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use generational_arena::Arena;
use termtree::Tree;
use tracing::{debug, instrument, trace};

use crate::domain::collection::Collection;
use crate::domain::composite::{Derivation, Field, Schema};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::event::dispatch;
use crate::domain::leaf::{
    BooleanLeaf, Leaf, LeafRejection, LeafResult, MeasureLeaf, NumberLeaf, Scalar, TextLeaf,
};
use crate::domain::node::{
    EventKind, Node, NodeBody, NodeEvent, NodeEvents, NodeId, NodeListener,
};
use crate::domain::types::{names, Blueprint, LeafTemplate, TypeId, TypeRegistry};
use crate::domain::units::Unit;

/// Session context: type registry, node arena and type-wide events.
#[derive(Debug)]
pub struct Graph {
    registry: TypeRegistry,
    nodes: Arena<Node>,
    type_events: HashMap<TypeId, NodeEvents>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Graph over the built-in types.
    pub fn new() -> Self {
        Self::with_registry(TypeRegistry::with_builtins())
    }

    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self {
            registry,
            nodes: Arena::new(),
            type_events: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn node(&self, id: NodeId) -> DomainResult<&Node> {
        self.nodes.get(id.0).ok_or(DomainError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomainResult<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(DomainError::NodeNotFound(id))
    }

    /// Nodes without an owner.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    // ------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------

    /// Instantiates a registered type by name.
    pub fn create(&mut self, type_name: &str, name: &str) -> DomainResult<NodeId> {
        let type_id = self.registry.lookup(type_name)?;
        self.create_typed(type_id, name)
    }

    /// Instantiates a type from its blueprint.
    ///
    /// Fails with a configuration error when the type declares no blueprint,
    /// or when a measure type declares no unit table.
    #[instrument(level = "debug", skip(self))]
    pub fn create_typed(&mut self, type_id: TypeId, name: &str) -> DomainResult<NodeId> {
        let type_name = self.registry.name(type_id).to_string();
        let blueprint = self.registry.blueprint(type_id).ok_or_else(|| {
            DomainError::configuration(&type_name, "type declares no blueprint")
        })?;
        let item = self.registry.lookup(names::ITEM)?;

        match blueprint {
            Blueprint::Group => Ok(self.insert_node(type_id, name, NodeBody::Group, vec![item])),
            Blueprint::Leaf(template) => {
                let leaf = build_leaf(template)
                    .map_err(|r| DomainError::configuration(&type_name, r.reason))?;
                Ok(self.insert_node(type_id, name, NodeBody::Leaf(leaf), vec![]))
            }
            Blueprint::Composite(schema) => {
                let allowed = vec![
                    self.registry.lookup(names::SIMPLE)?,
                    self.registry.lookup(names::COMPLEX)?,
                ];
                let body = NodeBody::Composite {
                    schema,
                    reference: None,
                };
                let id = self.insert_node(type_id, name, body, allowed);
                for field in schema.fields {
                    let child = self.create(field.type_name, field.name)?;
                    self.apply_field(child, field)
                        .map_err(|r| DomainError::configuration(&type_name, r.reason))?;
                    self.add_child(id, child, None)?;
                }
                if schema.derivation == Some(Derivation::GeoPosition) {
                    crate::domain::geo::prepare_position(self, id)?;
                }
                Ok(id)
            }
        }
    }

    fn insert_node(
        &mut self,
        type_id: TypeId,
        name: &str,
        body: NodeBody,
        allowed: Vec<TypeId>,
    ) -> NodeId {
        let item = self.registry.get(names::ITEM).into_iter().collect();
        let node = Node {
            type_id,
            name: name.to_string(),
            parent: None,
            children: Collection::new(allowed),
            links: Collection::new(item),
            updated: false,
            changed_at: Utc::now(),
            events: NodeEvents::default(),
            body,
        };
        let id = NodeId(self.nodes.insert(node));
        trace!("created {} '{}' as {}", self.registry.name(type_id), name, id);
        id
    }

    /// Applies the per-field overrides of a schema to a freshly built child.
    fn apply_field(&mut self, child: NodeId, field: &Field) -> LeafResult<()> {
        let Ok(node) = self.node_mut(child) else {
            return Ok(());
        };
        let NodeBody::Leaf(leaf) = &mut node.body else {
            return Ok(());
        };
        if field.min.is_some() || field.max.is_some() {
            let number = leaf.numeric_mut()?;
            number.set_min(field.min);
            number.set_max(field.max);
        }
        if !field.one_of.is_empty() {
            leaf.set_valid_values(Some(
                field.one_of.iter().map(|v| Scalar::from(*v)).collect(),
            ))?;
        }
        if let Some(preset) = field.default {
            leaf.set_default(Some(preset.into()))?;
        }
        if let Some(unit) = field.unit {
            leaf.measure_mut()?.select_unit(unit)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------
    // Type queries
    // ------------------------------------------------------------

    pub fn type_name(&self, id: NodeId) -> DomainResult<&str> {
        Ok(self.registry.name(self.node(id)?.type_id))
    }

    /// True if the node's type is `type_name` or one of its subtypes.
    pub fn is(&self, id: NodeId, type_name: &str) -> DomainResult<bool> {
        Ok(self.registry.is_named(self.node(id)?.type_id, type_name))
    }

    pub(crate) fn expect_type(&self, id: NodeId, type_name: &str) -> DomainResult<()> {
        if self.is(id, type_name)? {
            Ok(())
        } else {
            Err(DomainError::WrongNodeType {
                node: self.node(id)?.name.clone(),
                expected: type_name.to_string(),
            })
        }
    }

    /// Static schema of a composite node.
    pub fn schema(&self, id: NodeId) -> DomainResult<&'static Schema> {
        let node = self.node(id)?;
        match node.body {
            NodeBody::Composite { schema, .. } => Ok(schema),
            _ => Err(DomainError::WrongNodeType {
                node: node.name.clone(),
                expected: names::COMPLEX.to_string(),
            }),
        }
    }

    pub(crate) fn reference(&self, id: NodeId) -> DomainResult<Option<NodeId>> {
        match self.node(id)?.body {
            NodeBody::Composite { reference, .. } => Ok(reference.filter(|r| self.contains(*r))),
            _ => Ok(None),
        }
    }

    pub(crate) fn set_reference(&mut self, id: NodeId, target: Option<NodeId>) -> DomainResult<()> {
        let node = self.node_mut(id)?;
        match &mut node.body {
            NodeBody::Composite { reference, .. } => {
                *reference = target;
                Ok(())
            }
            _ => Err(DomainError::WrongNodeType {
                node: node.name.clone(),
                expected: names::COMPLEX.to_string(),
            }),
        }
    }

    // ------------------------------------------------------------
    // Ownership
    // ------------------------------------------------------------

    /// Moves `child` under `parent` at `position` (see [`Collection::add`]).
    ///
    /// A child that already has an owner is detached from it first.
    #[instrument(level = "debug", skip(self))]
    pub fn add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        position: Option<isize>,
    ) -> DomainResult<usize> {
        let child_type = self.node(child)?.type_id;
        let owner = self.node(parent)?;
        if !owner.children.allows(&self.registry, child_type) {
            return Err(DomainError::TypeNotAllowed {
                owner: owner.name.clone(),
                item_type: self.registry.name(child_type).to_string(),
            });
        }
        if self.ancestors(parent).contains(&child) || parent == child {
            return Err(DomainError::OwnershipCycle(self.node(child)?.name.clone()));
        }

        self.detach(child)?;
        let index = self.node_mut(parent)?.children.add(child, position);
        self.node_mut(child)?.parent = Some(parent);
        self.invalidate(child)?;
        Ok(index)
    }

    /// Removes `child` from its owner's children. No-op for roots.
    pub fn detach(&mut self, child: NodeId) -> DomainResult<()> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };
        self.node_mut(child)?.parent = None;
        if self.contains(parent) {
            self.node_mut(parent)?.children.remove(child);
            self.invalidate(parent)?;
        }
        Ok(())
    }

    /// Owners of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(id.0).and_then(|n| n.parent);
        while let Some(p) = current {
            chain.push(p);
            current = self.nodes.get(p.0).and_then(|n| n.parent);
        }
        chain
    }

    pub fn child(&self, parent: NodeId, name: &str) -> DomainResult<NodeId> {
        let owner = self.node(parent)?;
        owner
            .children
            .get_by_name(&self.nodes, name)
            .ok_or_else(|| DomainError::ChildNotFound {
                parent: owner.name.clone(),
                name: name.to_string(),
            })
    }

    pub fn child_at(&self, parent: NodeId, index: usize) -> DomainResult<Option<NodeId>> {
        Ok(self.node(parent)?.children.get_by_index(index))
    }

    /// Follows a dot-separated path of child names, e.g. `relativePosition.x`.
    pub fn resolve(&self, root: NodeId, path: &str) -> DomainResult<NodeId> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(root, |current, segment| self.child(current, segment))
    }

    /// Destroys `id` and everything it owns. Linked nodes survive; dangling
    /// ids are purged from every links collection.
    #[instrument(level = "debug", skip(self))]
    pub fn destroy(&mut self, id: NodeId) -> DomainResult<()> {
        self.node(id)?;
        self.detach(id)?;

        let doomed: Vec<NodeId> = self.iter_postorder(id).map(|(i, _)| i).collect();
        for dead in &doomed {
            self.nodes.remove(dead.0);
        }
        let doomed: HashSet<NodeId> = doomed.into_iter().collect();
        for (_, node) in self.nodes.iter_mut() {
            for dead in node.links.snapshot() {
                if doomed.contains(&dead) {
                    node.links.remove(dead);
                }
            }
            if let NodeBody::Composite { reference, .. } = &mut node.body {
                if reference.is_some_and(|r| doomed.contains(&r)) {
                    *reference = None;
                }
            }
        }
        debug!("destroyed {} node(s)", doomed.len());
        Ok(())
    }

    /// Destroys every child of `id`; returns how many were owned.
    pub fn clear_children(&mut self, id: NodeId) -> DomainResult<usize> {
        let children = self.node_mut(id)?.children.take_all();
        let count = children.len();
        for child in children {
            if self.contains(child) {
                self.node_mut(child)?.parent = None;
                self.destroy(child)?;
            }
        }
        self.invalidate(id)?;
        Ok(count)
    }

    // ------------------------------------------------------------
    // Links
    // ------------------------------------------------------------

    /// Makes `dependent` follow the invalidation of `source`.
    pub fn link(&mut self, source: NodeId, dependent: NodeId) -> DomainResult<bool> {
        self.node(dependent)?;
        let links = &mut self.node_mut(source)?.links;
        if links.contains(dependent) {
            return Ok(false);
        }
        links.add(dependent, None);
        self.invalidate(dependent)?;
        Ok(true)
    }

    pub fn unlink(&mut self, source: NodeId, dependent: NodeId) -> DomainResult<usize> {
        Ok(self.node_mut(source)?.links.remove(dependent))
    }

    // ------------------------------------------------------------
    // Invalidation and update
    // ------------------------------------------------------------

    /// Marks `id` invalid and propagates to its owners and linked nodes,
    /// recursively, visiting each node once. Modified events fire after
    /// all flags are set, in visitation order.
    #[instrument(level = "trace", skip(self))]
    pub fn invalidate(&mut self, id: NodeId) -> DomainResult<()> {
        self.node(id)?;
        let now = Utc::now();
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(current.0) else {
                continue;
            };
            node.updated = false;
            node.changed_at = now;
            order.push(current);
            queue.extend(node.parent);
            queue.extend(node.links.iter());
        }

        for source in order {
            self.fire(source, EventKind::Modified, id, None);
        }
        Ok(())
    }

    /// Brings `id` and its subtree up to date.
    ///
    /// No-op when already valid and not `forced`. Otherwise: pre-update
    /// events, recomputation of derived state from the children as they are,
    /// recursive update of the children in order, mark valid, post-update
    /// events.
    #[instrument(level = "trace", skip(self))]
    pub fn update(&mut self, id: NodeId, delta_time: f64, forced: bool) -> DomainResult<()> {
        if self.node(id)?.updated && !forced {
            return Ok(());
        }
        self.fire(id, EventKind::PreUpdate, id, Some(delta_time));
        if !self.contains(id) {
            debug!("{} destroyed by a pre-update listener", id);
            return Ok(());
        }
        self.recompute(id)?;

        for child in self.node(id)?.children.snapshot() {
            if self.contains(child) {
                self.update(child, delta_time, forced)?;
            }
        }

        // a listener further down may have destroyed the node
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.updated = true;
            node.changed_at = Utc::now();
            self.fire(id, EventKind::PostUpdate, id, Some(delta_time));
        }
        Ok(())
    }

    fn recompute(&mut self, id: NodeId) -> DomainResult<()> {
        match self.node(id)?.body {
            NodeBody::Composite { schema, .. } => match schema.derivation {
                Some(Derivation::GeoPosition) => crate::domain::geo::derive_position(self, id),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------
    // Events
    // ------------------------------------------------------------

    /// Fires the instance event of `source`, then the type-wide event of its type.
    fn fire(&mut self, source: NodeId, kind: EventKind, origin: NodeId, delta_time: Option<f64>) {
        let Some(node) = self.nodes.get(source.0) else {
            return;
        };
        let instance = node.events.get(kind).snapshot();
        let type_wide = self
            .type_events
            .get(&node.type_id)
            .map(|events| events.get(kind).snapshot())
            .unwrap_or_default();
        let event = NodeEvent {
            kind,
            source,
            origin,
            delta_time,
        };
        dispatch(&instance, self, &event);
        dispatch(&type_wide, self, &event);
    }

    /// Subscribes to an event of one node.
    pub fn on(&mut self, id: NodeId, kind: EventKind, listener: NodeListener) -> DomainResult<bool> {
        Ok(self.node_mut(id)?.events.get_mut(kind).add(listener))
    }

    pub fn off(&mut self, id: NodeId, kind: EventKind, listener: &NodeListener) -> DomainResult<bool> {
        Ok(self.node_mut(id)?.events.get_mut(kind).remove(listener))
    }

    /// Subscribes to an event of every node whose concrete type is `type_name`.
    pub fn on_type(
        &mut self,
        type_name: &str,
        kind: EventKind,
        listener: NodeListener,
    ) -> DomainResult<bool> {
        let type_id = self.registry.lookup(type_name)?;
        Ok(self
            .type_events
            .entry(type_id)
            .or_default()
            .get_mut(kind)
            .add(listener))
    }

    pub fn off_type(
        &mut self,
        type_name: &str,
        kind: EventKind,
        listener: &NodeListener,
    ) -> DomainResult<bool> {
        let type_id = self.registry.lookup(type_name)?;
        Ok(self
            .type_events
            .get_mut(&type_id)
            .is_some_and(|events| events.get_mut(kind).remove(listener)))
    }

    // ------------------------------------------------------------
    // Scalar leaves
    // ------------------------------------------------------------

    pub fn leaf(&self, id: NodeId) -> DomainResult<&Leaf> {
        let node = self.node(id)?;
        node.leaf().ok_or_else(|| DomainError::NotALeaf(node.name.clone()))
    }

    /// Runs `change` on a leaf; invalidates the leaf if it reports a change.
    fn change_leaf<F>(&mut self, id: NodeId, change: F) -> DomainResult<bool>
    where
        F: FnOnce(&mut Leaf) -> LeafResult<bool>,
    {
        let node = self.node_mut(id)?;
        let NodeBody::Leaf(leaf) = &mut node.body else {
            return Err(DomainError::NotALeaf(node.name.clone()));
        };
        let changed = change(leaf).map_err(|r| DomainError::validation(&node.name, r.reason))?;
        if changed {
            self.invalidate(id)?;
        }
        Ok(changed)
    }

    /// Effective value of a leaf.
    pub fn value(&self, id: NodeId) -> DomainResult<Option<Scalar>> {
        Ok(self.leaf(id)?.value())
    }

    pub fn number(&self, id: NodeId) -> DomainResult<Option<f64>> {
        Ok(self.value(id)?.and_then(|v| v.as_number()))
    }

    pub fn text(&self, id: NodeId) -> DomainResult<Option<String>> {
        Ok(self.value(id)?.and_then(|v| v.as_text().map(str::to_string)))
    }

    pub fn boolean(&self, id: NodeId) -> DomainResult<Option<bool>> {
        Ok(self.value(id)?.and_then(|v| v.as_bool()))
    }

    /// Assigns a leaf value. Rejected values surface as `Validation` errors and
    /// leave the leaf untouched; an unchanged value is a no-op.
    pub fn set_value(&mut self, id: NodeId, value: Option<Scalar>) -> DomainResult<bool> {
        self.change_leaf(id, |leaf| leaf.set_value(value))
    }

    pub fn set_default(&mut self, id: NodeId, value: Option<Scalar>) -> DomainResult<bool> {
        self.change_leaf(id, |leaf| leaf.set_default(value))
    }

    pub fn set_valid_values(&mut self, id: NodeId, valid: Option<Vec<Scalar>>) -> DomainResult<bool> {
        self.change_leaf(id, |leaf| leaf.set_valid_values(valid))
    }

    pub fn set_min(&mut self, id: NodeId, min: Option<f64>) -> DomainResult<bool> {
        self.change_leaf(id, |leaf| Ok(leaf.numeric_mut()?.set_min(min)))
    }

    pub fn set_max(&mut self, id: NodeId, max: Option<f64>) -> DomainResult<bool> {
        self.change_leaf(id, |leaf| Ok(leaf.numeric_mut()?.set_max(max)))
    }

    /// Installs a regular-expression validator on a string leaf.
    pub fn set_pattern(&mut self, id: NodeId, pattern: Option<&str>) -> DomainResult<bool> {
        self.change_leaf(id, |leaf| match leaf {
            Leaf::Text(text) => text.set_pattern(pattern),
            other => Err(LeafRejection {
                reason: format!("{} leaf has no pattern", other.kind_name()),
            }),
        })
    }

    /// Selects the display unit of a measure by id or abbreviation.
    pub fn select_unit(&mut self, id: NodeId, key: &str) -> DomainResult<bool> {
        self.change_leaf(id, |leaf| leaf.measure_mut()?.select_unit(key))
    }

    pub fn select_unit_index(&mut self, id: NodeId, index: usize) -> DomainResult<bool> {
        self.change_leaf(id, |leaf| leaf.measure_mut()?.select_unit_index(index))
    }

    pub fn unit(&self, id: NodeId) -> DomainResult<Unit> {
        let node = self.node(id)?;
        node.leaf()
            .and_then(Leaf::measure)
            .map(|m| *m.unit())
            .ok_or_else(|| DomainError::WrongNodeType {
                node: node.name.clone(),
                expected: names::MEASURE.to_string(),
            })
    }

    /// Unsets a leaf value so its default applies.
    pub fn reset(&mut self, id: NodeId) -> DomainResult<bool> {
        self.change_leaf(id, |leaf| Ok(leaf.reset()))
    }

    /// Leaves: value unset or equal to the default. Others: all children default.
    pub fn is_default(&self, id: NodeId) -> DomainResult<bool> {
        self.reduce_leaves(id, Leaf::is_default)
    }

    /// Leaves: neither value nor default. Others: all children undefined.
    pub fn is_undefined(&self, id: NodeId) -> DomainResult<bool> {
        self.reduce_leaves(id, Leaf::is_undefined)
    }

    fn reduce_leaves(&self, id: NodeId, predicate: fn(&Leaf) -> bool) -> DomainResult<bool> {
        let node = self.node(id)?;
        if let Some(leaf) = node.leaf() {
            return Ok(predicate(leaf));
        }
        for child in node.children.iter() {
            if !self.reduce_leaves(child, predicate)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------

    /// Pre-order walk of the subtree owned by `root`.
    pub fn iter(&self, root: NodeId) -> PreOrderIter<'_> {
        PreOrderIter::new(self, root)
    }

    /// Post-order walk: children before their owner.
    pub fn iter_postorder(&self, root: NodeId) -> PostOrderIter<'_> {
        PostOrderIter::new(self, root)
    }

    /// Depth of the ownership tree below `root` (a lone node has depth 1).
    pub fn depth(&self, root: NodeId) -> usize {
        match self.nodes.get(root.0) {
            None => 0,
            Some(node) => {
                1 + node
                    .children
                    .iter()
                    .map(|child| self.depth(child))
                    .max()
                    .unwrap_or(0)
            }
        }
    }

    /// Renders the subtree as `name: type = value` lines.
    pub fn to_tree(&self, root: NodeId) -> Tree<String> {
        let Some(node) = self.nodes.get(root.0) else {
            return Tree::new("Empty tree".to_string());
        };
        let mut label = format!("{}: {}", node.name, self.registry.name(node.type_id));
        if let Some(leaf) = node.leaf() {
            match leaf.value() {
                Some(value) => label.push_str(&format!(" = {}", value)),
                None => label.push_str(" = <undefined>"),
            }
            if let Some(measure) = leaf.measure() {
                label.push_str(&format!(" {}", measure.unit().id));
            }
        }
        if !node.updated {
            label.push_str(" *");
        }
        Tree::new(label).with_leaves(node.children.iter().map(|c| self.to_tree(c)))
    }
}

fn build_leaf(template: LeafTemplate) -> LeafResult<Leaf> {
    Ok(match template {
        LeafTemplate::Number => Leaf::Number(NumberLeaf::new()),
        LeafTemplate::Text => Leaf::Text(TextLeaf::new()),
        LeafTemplate::Boolean => Leaf::Boolean(BooleanLeaf::new()),
        LeafTemplate::Measure { units } => Leaf::Measure(MeasureLeaf::new(units)?),
    })
}

pub struct PreOrderIter<'a> {
    graph: &'a Graph,
    stack: Vec<NodeId>,
}

impl<'a> PreOrderIter<'a> {
    fn new(graph: &'a Graph, root: NodeId) -> Self {
        Self {
            graph,
            stack: vec![root],
        }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.graph.nodes.get(current.0) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.snapshot().into_iter().rev());
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIter<'a> {
    graph: &'a Graph,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIter<'a> {
    fn new(graph: &'a Graph, root: NodeId) -> Self {
        Self {
            graph,
            stack: vec![(root, false)],
        }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.graph.nodes.get(current.0) {
                if visited {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                for child in node.children.snapshot().into_iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}
