//! Node records and the events they carry.

use std::fmt;

use chrono::{DateTime, Utc};
use generational_arena::Index;

use crate::domain::collection::Collection;
use crate::domain::composite::Schema;
use crate::domain::event::{Event, Listener};
use crate::domain::graph::Graph;
use crate::domain::leaf::Leaf;
use crate::domain::types::TypeId;

/// Handle of a node in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

impl NodeId {
    pub(crate) fn index(self) -> Index {
        self.0
    }
}

impl From<Index> for NodeId {
    fn from(index: Index) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "{}v{}", slot, generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Modified,
    PreUpdate,
    PostUpdate,
}

/// Payload of node events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeEvent {
    pub kind: EventKind,
    /// Node whose event is firing.
    pub source: NodeId,
    /// Node where the change started (equals `source` for update events).
    pub origin: NodeId,
    /// Tick length, for update events.
    pub delta_time: Option<f64>,
}

pub type NodeListener = Listener<Graph, NodeEvent>;

#[derive(Debug, Clone)]
pub struct NodeEvents {
    modified: Event<Graph, NodeEvent>,
    pre_update: Event<Graph, NodeEvent>,
    post_update: Event<Graph, NodeEvent>,
}

impl Default for NodeEvents {
    fn default() -> Self {
        Self {
            modified: Event::new("modified"),
            pre_update: Event::new("pre_update"),
            post_update: Event::new("post_update"),
        }
    }
}

impl NodeEvents {
    pub fn get(&self, kind: EventKind) -> &Event<Graph, NodeEvent> {
        match kind {
            EventKind::Modified => &self.modified,
            EventKind::PreUpdate => &self.pre_update,
            EventKind::PostUpdate => &self.post_update,
        }
    }

    pub(crate) fn get_mut(&mut self, kind: EventKind) -> &mut Event<Graph, NodeEvent> {
        match kind {
            EventKind::Modified => &mut self.modified,
            EventKind::PreUpdate => &mut self.pre_update,
            EventKind::PostUpdate => &mut self.post_update,
        }
    }
}

/// What a node holds besides its edges.
#[derive(Debug, Clone)]
pub enum NodeBody {
    Group,
    Leaf(Leaf),
    Composite {
        schema: &'static Schema,
        /// Non-owning node the derived state is computed against.
        reference: Option<NodeId>,
    },
}

#[derive(Debug)]
pub struct Node {
    pub(crate) type_id: TypeId,
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Collection,
    pub(crate) links: Collection,
    pub(crate) updated: bool,
    pub(crate) changed_at: DateTime<Utc>,
    pub(crate) events: NodeEvents,
    pub(crate) body: NodeBody,
}

impl Node {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &Collection {
        &self.children
    }

    pub fn links(&self) -> &Collection {
        &self.links
    }

    /// False while derived state needs recomputation.
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Time of the last invalidation or update.
    pub fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    pub fn events(&self) -> &NodeEvents {
        &self.events
    }

    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    pub fn leaf(&self) -> Option<&Leaf> {
        match &self.body {
            NodeBody::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }
}
