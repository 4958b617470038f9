//! Graph model for the knowledge-network client.
//!
//! Holds the live gene/protein graph a client session works on, the merge of
//! server fragments into it, the visibility filters layered on top, the
//! search-result hierarchy used to seed it, and the flat export of whatever is
//! currently visible.

pub mod edge;
pub mod error;
pub mod export;
pub mod filter;
pub mod fragment;
pub mod graph;
pub mod hierarchy;
pub mod id;
pub mod layout;
pub mod merge;
pub mod node;

// Re-export commonly used types
pub use edge::{Edge, Relation, RelationKind};
pub use error::CoreError;
pub use export::{export_document, ExportTables};
pub use filter::VisibilityFilter;
pub use fragment::{GraphFragment, WireFragment};
pub use graph::{EdgeEntry, GraphCounts, LiveGraph, NodeEntry};
pub use hierarchy::{commit_selection, Leaf, ResultTree};
pub use id::{EntityKind, NodeId};
pub use layout::Position;
pub use merge::{notices_for, MergeReport, Notice, TRUNCATION_LIMIT};
pub use node::{Gene, Node, Protein};
