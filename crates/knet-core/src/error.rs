//! Errors raised when a fragment or a graph mutation would break the
//! live-graph invariants.

use thiserror::Error;

use crate::id::NodeId;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A node id was not found in the live graph.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// A node id is empty or carries neither a gene nor a protein prefix.
    #[error("invalid node id: '{id}'")]
    InvalidNodeId { id: String },

    /// A node with this id is already present.
    #[error("duplicate node: {id}")]
    DuplicateNode { id: NodeId },

    /// An edge references an endpoint that is not in the live graph.
    #[error("dangling edge {from} -> {to}: endpoint {missing} not in graph")]
    DanglingEdge {
        from: NodeId,
        to: NodeId,
        missing: NodeId,
    },

    /// An edge `type` the client does not understand.
    #[error("unknown relation type: '{kind}'")]
    UnknownRelation { kind: String },

    /// A fragment element could not be turned into a typed node or edge.
    #[error("invalid element: {reason}")]
    InvalidElement { reason: String },
}
