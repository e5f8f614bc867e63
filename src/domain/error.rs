//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeId;

/// Domain errors represent violations of the object-graph rules.
/// These are independent of payload parsing and I/O concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// A node type lacks the static metadata needed to construct it.
    #[error("configuration error for type '{type_name}': {reason}")]
    Configuration { type_name: String, reason: String },

    #[error("type already registered: {0}")]
    DuplicateTypeName(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A candidate value failed `check_value`; prior state is unchanged.
    #[error("invalid value for '{node}': {reason}")]
    Validation { node: String, reason: String },

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("'{parent}' has no child named '{name}'")]
    ChildNotFound { parent: String, name: String },

    #[error("type '{item_type}' not allowed in collection of '{owner}'")]
    TypeNotAllowed { owner: String, item_type: String },

    #[error("node '{0}' is not a scalar leaf")]
    NotALeaf(String),

    #[error("node '{node}' is not a {expected}")]
    WrongNodeType { node: String, expected: String },

    #[error("attaching '{0}' would make it its own ancestor")]
    OwnershipCycle(String),
}

impl DomainError {
    pub fn validation(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            node: node.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
