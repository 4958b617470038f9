//! Node identifiers.
//!
//! Server ids are opaque strings whose first character names the entity kind:
//! `g` for genes, `p` for proteins. [`NodeId`] keeps that string immutable and
//! exposes the kind and the numeric suffix used for export ordering.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Which kind of entity an id denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Gene,
    Protein,
}

impl EntityKind {
    /// The id prefix for this kind.
    pub fn prefix(self) -> char {
        match self {
            EntityKind::Gene => 'g',
            EntityKind::Protein => 'p',
        }
    }

    /// The `type` value the server sends for this kind.
    pub fn wire_name(self) -> &'static str {
        match self {
            EntityKind::Gene => "Gene",
            EntityKind::Protein => "Protein",
        }
    }

    /// Parses a wire `type` value.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "Gene" => Some(EntityKind::Gene),
            "Protein" => Some(EntityKind::Protein),
            _ => None,
        }
    }
}

/// Globally unique, kind-prefixed node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wraps a server id, rejecting ids that do not start with a known prefix.
    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        match raw.chars().next() {
            Some('g') | Some('p') => Ok(NodeId(raw)),
            _ => Err(CoreError::InvalidNodeId { id: raw }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Entity kind derived from the id prefix.
    pub fn kind(&self) -> EntityKind {
        if self.0.starts_with('g') {
            EntityKind::Gene
        } else {
            EntityKind::Protein
        }
    }

    /// The number following the prefix, if the rest of the id is numeric.
    pub fn numeric_suffix(&self) -> Option<u64> {
        self.0.get(1..).and_then(|rest| rest.parse().ok())
    }

    /// Export ordering: numeric suffixes ascending, then non-numeric ids
    /// lexically.
    pub fn export_order(&self, other: &NodeId) -> Ordering {
        match (self.numeric_suffix(), other.numeric_suffix()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
