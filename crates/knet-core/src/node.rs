//! Gene and protein nodes.
//!
//! [`Node`] is the typed payload of a live-graph vertex. Every accessor that
//! the filters, the result hierarchy and the export need is available on
//! [`Node`] directly so callers rarely match on the variant.

use serde::{Deserialize, Serialize};

use crate::id::{EntityKind, NodeId};

/// A gene located on a contig of one assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    pub id: NodeId,
    pub name: String,
    /// Assembly (species) the gene belongs to.
    pub assembly: String,
    pub contig: String,
    pub chromosome: Option<String>,
    pub strand: Option<String>,
    pub start: Option<u64>,
    pub stop: Option<u64>,
    /// Free-text functional annotation.
    pub annotation: String,
    pub nucleotide_seq: Option<String>,
}

/// A protein coded by a gene of one assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protein {
    pub id: NodeId,
    pub name: String,
    pub assembly: String,
    pub chromosome: Option<String>,
    pub annotation: Option<String>,
    pub amino_acid_seq: Option<String>,
}

/// A live-graph vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Gene(Gene),
    Protein(Protein),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Gene(g) => &g.id,
            Node::Protein(p) => &p.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Node::Gene(_) => EntityKind::Gene,
            Node::Protein(_) => EntityKind::Protein,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Gene(g) => &g.name,
            Node::Protein(p) => &p.name,
        }
    }

    /// The assembly this node is filtered by.
    pub fn assembly(&self) -> &str {
        match self {
            Node::Gene(g) => &g.assembly,
            Node::Protein(p) => &p.assembly,
        }
    }

    /// Contig for genes. Proteins carry none.
    pub fn contig(&self) -> Option<&str> {
        match self {
            Node::Gene(g) => Some(&g.contig),
            Node::Protein(_) => None,
        }
    }

    pub fn annotation(&self) -> Option<&str> {
        match self {
            Node::Gene(g) => Some(&g.annotation),
            Node::Protein(p) => p.annotation.as_deref(),
        }
    }

    /// Label shown for a result leaf: `name: annotation`.
    pub fn label(&self) -> String {
        match self.annotation() {
            Some(annotation) if !annotation.is_empty() => {
                format!("{}: {}", self.name(), annotation)
            }
            _ => self.name().to_string(),
        }
    }

    pub fn as_gene(&self) -> Option<&Gene> {
        match self {
            Node::Gene(g) => Some(g),
            Node::Protein(_) => None,
        }
    }

    pub fn as_protein(&self) -> Option<&Protein> {
        match self {
            Node::Protein(p) => Some(p),
            Node::Gene(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gene() -> Node {
        Node::Gene(Gene {
            id: NodeId::parse("g1").unwrap(),
            name: "TaFT1".into(),
            assembly: "Wheat".into(),
            contig: "chr7A".into(),
            chromosome: None,
            strand: Some("+".into()),
            start: Some(100),
            stop: Some(900),
            annotation: "flowering locus T".into(),
            nucleotide_seq: None,
        })
    }

    fn protein() -> Node {
        Node::Protein(Protein {
            id: NodeId::parse("p1").unwrap(),
            name: "TaFT1-P".into(),
            assembly: "Wheat".into(),
            chromosome: None,
            annotation: None,
            amino_acid_seq: Some("MSR".into()),
        })
    }

    #[test]
    fn accessors_cover_both_variants() {
        let g = gene();
        assert_eq!(g.kind(), EntityKind::Gene);
        assert_eq!(g.assembly(), "Wheat");
        assert_eq!(g.contig(), Some("chr7A"));
        assert!(g.as_gene().is_some());

        let p = protein();
        assert_eq!(p.kind(), EntityKind::Protein);
        assert_eq!(p.contig(), None);
        assert_eq!(p.annotation(), None);
        assert!(p.as_protein().is_some());
    }

    #[test]
    fn label_includes_annotation_when_present() {
        assert_eq!(gene().label(), "TaFT1: flowering locus T");
        assert_eq!(protein().label(), "TaFT1-P");
    }
}
