//! Graph fragments as the server sends them, and their typed form.
//!
//! Search and expansion replies are JSON documents of the shape
//! `{"nodes": [{"data": {...}}], "edges": [{"data": {...}}]}`. [`WireFragment`]
//! mirrors that shape field-for-field; [`GraphFragment`] is the validated,
//! typed batch the merger consumes.
//!
//! The server writes some numbers as JSON strings (`"perc_match":"77"`) and
//! others as bare numbers (`"start":1200`), so every numeric field accepts
//! either spelling.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::edge::{Edge, Relation, RelationKind};
use crate::error::CoreError;
use crate::id::{EntityKind, NodeId};
use crate::node::{Gene, Node, Protein};

/// One `{"data": ...}` wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element<T> {
    pub data: T,
}

/// Node attributes exactly as they appear on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromosome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contig: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strand: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub start: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub stop: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nt_seq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aa_seq: Option<String>,
}

/// Edge attributes exactly as they appear on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub perc_match: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub sensitivity: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub local_sim: Option<f64>,
}

/// A search or expansion reply before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireFragment {
    #[serde(default)]
    pub nodes: Vec<Element<NodeData>>,
    #[serde(default)]
    pub edges: Vec<Element<EdgeData>>,
}

impl WireFragment {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// A validated batch of nodes and edges, in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphFragment {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphFragment {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

impl TryFrom<WireFragment> for GraphFragment {
    type Error = CoreError;

    fn try_from(wire: WireFragment) -> Result<Self, Self::Error> {
        let nodes = wire
            .nodes
            .into_iter()
            .map(|el| Node::try_from(el.data))
            .collect::<Result<Vec<_>, _>>()?;
        let edges = wire
            .edges
            .into_iter()
            .map(|el| Edge::try_from(el.data))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GraphFragment { nodes, edges })
    }
}

impl TryFrom<NodeData> for Node {
    type Error = CoreError;

    fn try_from(data: NodeData) -> Result<Self, Self::Error> {
        let id = NodeId::parse(data.id)?;
        let kind = match data.kind.as_deref() {
            Some(name) => EntityKind::from_wire(name).ok_or_else(|| CoreError::InvalidElement {
                reason: format!("node {id} has unknown type '{name}'"),
            })?,
            None => id.kind(),
        };
        if kind != id.kind() {
            return Err(CoreError::InvalidElement {
                reason: format!("node {id} is typed {} but not prefixed '{}'", kind.wire_name(), kind.prefix()),
            });
        }

        let node = match kind {
            EntityKind::Gene => Node::Gene(Gene {
                id,
                name: data.name.unwrap_or_default(),
                assembly: data.species.unwrap_or_default(),
                contig: data.contig.unwrap_or_default(),
                chromosome: data.chromosome,
                strand: data.strand,
                start: data.start,
                stop: data.stop,
                annotation: data.description.unwrap_or_default(),
                nucleotide_seq: data.nt_seq,
            }),
            EntityKind::Protein => Node::Protein(Protein {
                id,
                name: data.name.unwrap_or_default(),
                assembly: data.species.unwrap_or_default(),
                chromosome: data.chromosome,
                annotation: data.description,
                amino_acid_seq: data.aa_seq,
            }),
        };
        Ok(node)
    }
}

impl TryFrom<EdgeData> for Edge {
    type Error = CoreError;

    fn try_from(data: EdgeData) -> Result<Self, Self::Error> {
        let source = NodeId::parse(data.source)?;
        let target = NodeId::parse(data.target)?;
        let kind = RelationKind::from_wire(&data.kind)
            .ok_or(CoreError::UnknownRelation { kind: data.kind })?;

        let relation = match kind {
            RelationKind::Homolog => {
                let percent_match = data.perc_match.ok_or_else(|| CoreError::InvalidElement {
                    reason: format!("HOMOLOG edge {source} -> {target} has no perc_match"),
                })?;
                if !(0.0..=100.0).contains(&percent_match) {
                    return Err(CoreError::InvalidElement {
                        reason: format!(
                            "HOMOLOG edge {source} -> {target} has perc_match {percent_match} outside 0-100"
                        ),
                    });
                }
                Relation::Homolog {
                    percent_match,
                    sensitivity: data.sensitivity.unwrap_or_default(),
                    local_similarity: data.local_sim,
                }
            }
            RelationKind::Coding => Relation::Coding,
            RelationKind::Upstream => Relation::Upstream,
            RelationKind::Downstream => Relation::Downstream,
        };

        Ok(Edge {
            source,
            target,
            relation,
        })
    }
}

// ---------------------------------------------------------------------------
// Lenient scalar decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected unsigned integer, got {n}"))),
        Some(Scalar::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Scalar::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected unsigned integer, got '{s}'"))),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected number, got {n}"))),
        Some(Scalar::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Scalar::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected number, got '{s}'"))),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => None,
        Some(Scalar::Number(n)) => Some(n.to_string()),
        Some(Scalar::Text(s)) => Some(s),
    })
}
