//! Flat export of the visible subgraph.
//!
//! The document has two sections, genes then proteins, each a header line, a
//! column line and one comma-joined row per visible entity. The last column
//! lists homologs as `otherId:percent%` entries or the literal `None`.
//!
//! HOMOLOG relations are stored in one direction only, so the adjacency used
//! for the homolog column is symmetrized here: an edge `a → b` contributes to
//! both `a` and `b`.

use std::collections::HashMap;
use std::fmt::Write as _;

use smallvec::SmallVec;

use crate::graph::LiveGraph;
use crate::id::NodeId;
use crate::node::Node;

pub const GENE_SECTION: &str = "### Gene data ###";
pub const PROTEIN_SECTION: &str = "### Protein data ###";
pub const GENE_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "assembly",
    "contig",
    "start",
    "stop",
    "annotation",
    "homologs",
];
pub const PROTEIN_COLUMNS: [&str; 4] = ["id", "name", "assembly", "homologs"];

/// One exported gene.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneRow {
    pub id: NodeId,
    pub name: String,
    pub assembly: String,
    pub contig: String,
    pub start: Option<u64>,
    pub stop: Option<u64>,
    pub annotation: String,
}

/// One exported protein.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteinRow {
    pub id: NodeId,
    pub name: String,
    pub assembly: String,
}

/// One side of a homolog relation.
#[derive(Debug, Clone, PartialEq)]
pub struct HomologLink {
    pub other: NodeId,
    pub percent_match: f64,
}

impl HomologLink {
    fn render(&self) -> String {
        format!("{}:{}%", self.other, format_percent(self.percent_match))
    }
}

/// Rows and adjacency collected from the visible graph.
#[derive(Debug, Clone, Default)]
pub struct ExportTables {
    /// Sorted by numeric id suffix.
    pub genes: Vec<GeneRow>,
    /// Sorted by numeric id suffix.
    pub proteins: Vec<ProteinRow>,
    /// Symmetrized homolog adjacency, in edge order per entity.
    pub adjacency: HashMap<NodeId, SmallVec<[HomologLink; 4]>>,
}

impl ExportTables {
    /// Collects visible nodes and displayed HOMOLOG edges.
    pub fn collect(graph: &LiveGraph) -> Self {
        let mut tables = ExportTables::default();

        for entry in graph.nodes_where(|entry| entry.visible) {
            match &entry.node {
                Node::Gene(g) => tables.genes.push(GeneRow {
                    id: g.id.clone(),
                    name: g.name.clone(),
                    assembly: g.assembly.clone(),
                    contig: g.contig.clone(),
                    start: g.start,
                    stop: g.stop,
                    annotation: g.annotation.clone(),
                }),
                Node::Protein(p) => tables.proteins.push(ProteinRow {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    assembly: p.assembly.clone(),
                }),
            }
        }
        tables.genes.sort_by(|a, b| a.id.export_order(&b.id));
        tables.proteins.sort_by(|a, b| a.id.export_order(&b.id));

        for entry in graph.displayed_edges() {
            let Some(percent_match) = entry.edge.relation.percent_match() else {
                continue;
            };
            let (source, target) = (&entry.edge.source, &entry.edge.target);
            tables
                .adjacency
                .entry(source.clone())
                .or_default()
                .push(HomologLink {
                    other: target.clone(),
                    percent_match,
                });
            tables
                .adjacency
                .entry(target.clone())
                .or_default()
                .push(HomologLink {
                    other: source.clone(),
                    percent_match,
                });
        }

        tables
    }

    /// The homolog column for one entity.
    pub fn homologs(&self, id: &NodeId) -> String {
        match self.adjacency.get(id) {
            Some(links) if !links.is_empty() => links
                .iter()
                .map(HomologLink::render)
                .collect::<Vec<_>>()
                .join(","),
            _ => "None".to_string(),
        }
    }

    /// Renders the two-section document.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(GENE_SECTION);
        out.push('\n');
        out.push_str(&GENE_COLUMNS.join(","));
        out.push('\n');
        for row in &self.genes {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                row.id,
                row.name,
                row.assembly,
                row.contig,
                opt(row.start),
                opt(row.stop),
                row.annotation,
                self.homologs(&row.id)
            );
        }

        out.push_str(PROTEIN_SECTION);
        out.push('\n');
        out.push_str(&PROTEIN_COLUMNS.join(","));
        out.push('\n');
        for row in &self.proteins {
            let _ = writeln!(
                out,
                "{},{},{},{}",
                row.id,
                row.name,
                row.assembly,
                self.homologs(&row.id)
            );
        }

        out
    }
}

/// Exports the currently visible part of `graph`.
pub fn export_document(graph: &LiveGraph) -> String {
    ExportTables::collect(graph).render()
}

fn opt(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Whole percentages print without a fractional part.
fn format_percent(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
