//! Ordered, owner-scoped node collections.
//!
//! A collection only stores node ids. Name lookup resolves through the
//! arena; destruction of elements (`clear`) is done by the graph.

use generational_arena::Arena;
use tracing::instrument;

use crate::domain::node::{Node, NodeId};
use crate::domain::types::{TypeId, TypeRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    allowed: Vec<TypeId>,
    items: Vec<NodeId>,
}

impl Collection {
    pub fn new(allowed: Vec<TypeId>) -> Self {
        Self {
            allowed,
            items: Vec::new(),
        }
    }

    pub fn allowed(&self) -> &[TypeId] {
        &self.allowed
    }

    /// True if `item_type` is a subtype of any allowed type.
    pub fn allows(&self, registry: &TypeRegistry, item_type: TypeId) -> bool {
        self.allowed.iter().any(|&t| registry.is(item_type, t))
    }

    /// Inserts `item`; returns the index it landed on.
    ///
    /// * `None` appends.
    /// * `Some(p)` with `p >= 0` inserts at `p`, clamped to the current size.
    /// * `Some(p)` with `p < 0` counts back from the end (`size + p`), clamped to 0,
    ///   so `-1` inserts immediately before the last element.
    #[instrument(level = "trace", skip(self))]
    pub fn add(&mut self, item: NodeId, position: Option<isize>) -> usize {
        let size = self.items.len();
        let index = match position {
            None => size,
            Some(p) if p >= 0 => (p as usize).min(size),
            Some(p) => size.saturating_sub(p.unsigned_abs()),
        };
        self.items.insert(index, item);
        index
    }

    /// Removes every occurrence of `item`; returns how many were removed.
    pub fn remove(&mut self, item: NodeId) -> usize {
        let before = self.items.len();
        self.items.retain(|&i| i != item);
        before - self.items.len()
    }

    pub fn contains(&self, item: NodeId) -> bool {
        self.items.contains(&item)
    }

    pub fn get_by_index(&self, index: usize) -> Option<NodeId> {
        self.items.get(index).copied()
    }

    /// First element whose node name equals `name`.
    pub fn get_by_name(&self, nodes: &Arena<Node>, name: &str) -> Option<NodeId> {
        self.items
            .iter()
            .copied()
            .find(|id| nodes.get(id.index()).is_some_and(|n| n.name() == name))
    }

    pub fn index_of(&self, item: NodeId) -> Option<usize> {
        self.items.iter().position(|&i| i == item)
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items.iter().copied()
    }

    /// Copy of the elements, safe to iterate while the graph is mutated.
    pub fn snapshot(&self) -> Vec<NodeId> {
        self.items.clone()
    }

    /// Empties the sequence and hands back what it held.
    pub(crate) fn take_all(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.items)
    }
}
