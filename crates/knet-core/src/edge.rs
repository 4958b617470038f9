//! Relation edges between genes and proteins.
//!
//! [`Relation`] carries the per-kind payload; [`RelationKind`] is the payload-
//! free discriminant used as part of an edge's identity, so two HOMOLOG edges
//! between the same endpoints count as the same edge whatever their scores.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::NodeId;

/// Edge kinds as the server names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Homolog,
    Coding,
    /// Gene located upstream on the same contig (`5_NB`).
    Upstream,
    /// Gene located downstream on the same contig (`3_NB`).
    Downstream,
}

impl RelationKind {
    /// The edge `type` string used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            RelationKind::Homolog => "HOMOLOG",
            RelationKind::Coding => "CODING",
            RelationKind::Upstream => "5_NB",
            RelationKind::Downstream => "3_NB",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "HOMOLOG" => Some(RelationKind::Homolog),
            "CODING" => Some(RelationKind::Coding),
            "5_NB" => Some(RelationKind::Upstream),
            "3_NB" => Some(RelationKind::Downstream),
            _ => None,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Typed relation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Relation {
    /// Sequence homology. Symmetric in meaning, stored in one direction only.
    Homolog {
        /// Percent identity, 0–100.
        percent_match: f64,
        /// Clustering bucket the relation was computed under.
        sensitivity: String,
        local_similarity: Option<f64>,
    },
    /// Gene codes for protein.
    Coding,
    Upstream,
    Downstream,
}

impl Relation {
    pub fn kind(&self) -> RelationKind {
        match self {
            Relation::Homolog { .. } => RelationKind::Homolog,
            Relation::Coding => RelationKind::Coding,
            Relation::Upstream => RelationKind::Upstream,
            Relation::Downstream => RelationKind::Downstream,
        }
    }

    /// Sensitivity bucket for HOMOLOG relations, `None` otherwise.
    pub fn sensitivity(&self) -> Option<&str> {
        match self {
            Relation::Homolog { sensitivity, .. } => Some(sensitivity),
            _ => None,
        }
    }

    pub fn percent_match(&self) -> Option<f64> {
        match self {
            Relation::Homolog { percent_match, .. } => Some(*percent_match),
            _ => None,
        }
    }
}

/// A directed edge between two live nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub relation: Relation,
}

impl Edge {
    pub fn kind(&self) -> RelationKind {
        self.relation.kind()
    }

    /// Identity used for de-duplication.
    pub fn key(&self) -> (NodeId, NodeId, RelationKind) {
        (self.source.clone(), self.target.clone(), self.kind())
    }
}
