//! Domain layer: type registry, node graph and leaf values
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod collection;
pub mod composite;
pub mod error;
pub mod event;
pub mod geo;
pub mod graph;
pub mod leaf;
pub mod node;
pub mod types;
pub mod units;

pub use collection::Collection;
pub use composite::{Field, Schema};
pub use error::{DomainError, DomainResult};
pub use event::{Event, Flow, Listener};
pub use geo::{geodetic_to_pose, Ellipsoid, Pose};
pub use graph::Graph;
pub use leaf::{Leaf, Scalar, Validate};
pub use node::{EventKind, Node, NodeBody, NodeEvent, NodeId, NodeListener};
pub use types::{names, Blueprint, LeafTemplate, TypeId, TypeRegistry};
pub use units::Unit;
