//! LiveGraph: the mutable working set of one client session.
//!
//! [`LiveGraph`] wraps a `StableGraph` of gene/protein vertices and relation
//! edges together with two indexes: server id → vertex index, and the set of
//! `(source, target, kind)` triples already present. All mutations go through
//! `LiveGraph` methods so both indexes stay in step with the graph.
//!
//! # Invariants
//!
//! - Node ids are unique.
//! - At most one edge per `(source, target, kind)` triple.
//! - Both endpoints of every edge are present. Removing a node removes its
//!   incident edges.
//!
//! Every vertex and edge carries a `visible` flag. The flags are written by
//! [`crate::filter::VisibilityFilter`]; new elements start visible.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::Directed;
use serde::Serialize;

use crate::edge::{Edge, RelationKind};
use crate::error::CoreError;
use crate::id::{EntityKind, NodeId};
use crate::layout::Position;
use crate::node::Node;

/// A live vertex with its display state.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    pub node: Node,
    /// Canvas position, if one has been assigned. Seed nodes are left to the
    /// layout engine; expansion results are placed around their anchor.
    pub position: Option<Position>,
    pub visible: bool,
}

/// A live edge with its own display state.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEntry {
    pub edge: Edge,
    pub visible: bool,
}

/// Shown/hidden tallies for the status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphCounts {
    pub genes_shown: usize,
    pub genes_hidden: usize,
    pub proteins_shown: usize,
    pub proteins_hidden: usize,
}

impl fmt::Display for GraphCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing {} genes ({} hidden) and {} proteins ({} hidden)",
            self.genes_shown, self.genes_hidden, self.proteins_shown, self.proteins_hidden
        )
    }
}

/// The client-side graph.
#[derive(Debug, Clone, Default)]
pub struct LiveGraph {
    graph: StableGraph<NodeEntry, EdgeEntry, Directed, u32>,
    index: HashMap<NodeId, NodeIndex<u32>>,
    edge_keys: HashSet<(NodeId, NodeId, RelationKind)>,
}

impl LiveGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph holding exactly `nodes`, without edges or positions.
    /// Repeated ids keep their first occurrence.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut graph = LiveGraph::new();
        for node in nodes {
            // Duplicates are dropped; the first payload wins.
            let _ = graph.insert_node(node, None);
        }
        graph
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.entry(id).map(|entry| &entry.node)
    }

    pub fn entry(&self, id: &NodeId) -> Option<&NodeEntry> {
        self.index
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn position(&self, id: &NodeId) -> Option<Position> {
        self.entry(id).and_then(|entry| entry.position)
    }

    /// Whether an edge with the same `(source, target, kind)` is present.
    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edge_keys.contains(&edge.key())
    }

    pub fn is_node_visible(&self, id: &NodeId) -> bool {
        self.entry(id).is_some_and(|entry| entry.visible)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    // -----------------------------------------------------------------------
    // Iteration
    // -----------------------------------------------------------------------

    pub fn nodes(&self) -> impl Iterator<Item = &NodeEntry> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeEntry> {
        self.graph.edge_weights()
    }

    /// Nodes matching `pred`.
    pub fn nodes_where<'a, F>(&'a self, mut pred: F) -> impl Iterator<Item = &'a NodeEntry> + 'a
    where
        F: FnMut(&NodeEntry) -> bool + 'a,
    {
        self.graph.node_weights().filter(move |&entry| pred(entry))
    }

    /// Edges matching `pred`.
    pub fn edges_where<'a, F>(&'a self, mut pred: F) -> impl Iterator<Item = &'a EdgeEntry> + 'a
    where
        F: FnMut(&EdgeEntry) -> bool + 'a,
    {
        self.graph.edge_weights().filter(move |&entry| pred(entry))
    }

    /// Whether an edge is on screen: its own flag is set and neither endpoint
    /// is hidden.
    pub fn is_edge_displayed(&self, entry: &EdgeEntry) -> bool {
        entry.visible
            && self.is_node_visible(&entry.edge.source)
            && self.is_node_visible(&entry.edge.target)
    }

    /// Edges that are on screen.
    pub fn displayed_edges(&self) -> impl Iterator<Item = &EdgeEntry> {
        self.graph
            .edge_weights()
            .filter(move |entry| self.is_edge_displayed(entry))
    }

    pub(crate) fn node_entries_mut(&mut self) -> impl Iterator<Item = &mut NodeEntry> {
        self.graph.node_weights_mut()
    }

    pub(crate) fn edge_entries_mut(&mut self) -> impl Iterator<Item = &mut EdgeEntry> {
        self.graph.edge_weights_mut()
    }

    pub fn counts(&self) -> GraphCounts {
        let mut counts = GraphCounts::default();
        for entry in self.graph.node_weights() {
            match (entry.node.kind(), entry.visible) {
                (EntityKind::Gene, true) => counts.genes_shown += 1,
                (EntityKind::Gene, false) => counts.genes_hidden += 1,
                (EntityKind::Protein, true) => counts.proteins_shown += 1,
                (EntityKind::Protein, false) => counts.proteins_hidden += 1,
            }
        }
        counts
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Adds a node in the visible state. Errors if the id is already present.
    pub fn insert_node(&mut self, node: Node, position: Option<Position>) -> Result<(), CoreError> {
        if self.index.contains_key(node.id()) {
            return Err(CoreError::DuplicateNode {
                id: node.id().clone(),
            });
        }
        let id = node.id().clone();
        let idx = self.graph.add_node(NodeEntry {
            node,
            position,
            visible: true,
        });
        self.index.insert(id, idx);
        Ok(())
    }

    /// Adds an edge in the visible state.
    ///
    /// Returns `Ok(false)` if an edge with the same identity is already
    /// present. Errors if either endpoint is missing.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<bool, CoreError> {
        let from = self.require(&edge.source, &edge)?;
        let to = self.require(&edge.target, &edge)?;
        if !self.edge_keys.insert(edge.key()) {
            return Ok(false);
        }
        self.graph.add_edge(
            from,
            to,
            EdgeEntry {
                edge,
                visible: true,
            },
        );
        Ok(true)
    }

    fn require(&self, endpoint: &NodeId, edge: &Edge) -> Result<NodeIndex<u32>, CoreError> {
        self.index
            .get(endpoint)
            .copied()
            .ok_or_else(|| CoreError::DanglingEdge {
                from: edge.source.clone(),
                to: edge.target.clone(),
                missing: endpoint.clone(),
            })
    }

    /// Removes a node and every edge touching it. Returns the removed node.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<Node, CoreError> {
        let idx = self
            .index
            .remove(id)
            .ok_or_else(|| CoreError::NodeNotFound { id: id.clone() })?;
        self.edge_keys
            .retain(|(source, target, _)| source != id && target != id);
        match self.graph.remove_node(idx) {
            Some(entry) => Ok(entry.node),
            None => Err(CoreError::NodeNotFound { id: id.clone() }),
        }
    }

    pub fn set_position(&mut self, id: &NodeId, position: Position) -> Result<(), CoreError> {
        let entry = self.entry_mut(id)?;
        entry.position = Some(position);
        Ok(())
    }

    /// Sets one node's display flag directly.
    pub fn set_node_visible(&mut self, id: &NodeId, visible: bool) -> Result<(), CoreError> {
        let entry = self.entry_mut(id)?;
        entry.visible = visible;
        Ok(())
    }

    fn entry_mut(&mut self, id: &NodeId) -> Result<&mut NodeEntry, CoreError> {
        self.index
            .get(id)
            .and_then(|&idx| self.graph.node_weight_mut(idx))
            .ok_or_else(|| CoreError::NodeNotFound { id: id.clone() })
    }

    /// Drops every node and edge.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.index.clear();
        self.edge_keys.clear();
    }

    #[cfg(test)]
    pub(crate) fn assert_consistency(&self) {
        assert_eq!(self.index.len(), self.graph.node_count());
        assert_eq!(self.edge_keys.len(), self.graph.edge_count());
        for (id, &idx) in &self.index {
            let entry = self.graph.node_weight(idx).expect("index points at a live node");
            assert_eq!(entry.node.id(), id);
        }
        for entry in self.graph.edge_weights() {
            assert!(self.index.contains_key(&entry.edge.source));
            assert!(self.index.contains_key(&entry.edge.target));
            assert!(self.edge_keys.contains(&entry.edge.key()));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::edge::Relation;
    use crate::node::{Gene, Protein};

    pub(crate) fn gene(id: &str, assembly: &str) -> Node {
        Node::Gene(Gene {
            id: NodeId::parse(id).unwrap(),
            name: format!("{id}-name"),
            assembly: assembly.to_string(),
            contig: "chr1".to_string(),
            chromosome: None,
            strand: None,
            start: Some(1),
            stop: Some(2),
            annotation: String::new(),
            nucleotide_seq: None,
        })
    }

    pub(crate) fn protein(id: &str, assembly: &str) -> Node {
        Node::Protein(Protein {
            id: NodeId::parse(id).unwrap(),
            name: format!("{id}-name"),
            assembly: assembly.to_string(),
            chromosome: None,
            annotation: None,
            amino_acid_seq: None,
        })
    }

    pub(crate) fn homolog(source: &str, target: &str, percent: f64, bucket: &str) -> Edge {
        Edge {
            source: NodeId::parse(source).unwrap(),
            target: NodeId::parse(target).unwrap(),
            relation: Relation::Homolog {
                percent_match: percent,
                sensitivity: bucket.to_string(),
                local_similarity: None,
            },
        }
    }

    pub(crate) fn coding(source: &str, target: &str) -> Edge {
        Edge {
            source: NodeId::parse(source).unwrap(),
            target: NodeId::parse(target).unwrap(),
            relation: Relation::Coding,
        }
    }

    fn id(s: &str) -> NodeId {
        NodeId::parse(s).unwrap()
    }

    #[test]
    fn insert_and_lookup() {
        let mut g = LiveGraph::new();
        g.insert_node(gene("g1", "Wheat"), None).unwrap();
        assert!(g.contains(&id("g1")));
        assert_eq!(g.node(&id("g1")).unwrap().assembly(), "Wheat");
        assert!(g.is_node_visible(&id("g1")));
        assert_eq!(g.position(&id("g1")), None);
        g.assert_consistency();
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let mut g = LiveGraph::new();
        g.insert_node(gene("g1", "Wheat"), None).unwrap();
        let err = g.insert_node(gene("g1", "Barley"), None).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateNode { .. }));
        assert_eq!(g.node(&id("g1")).unwrap().assembly(), "Wheat");
    }

    #[test]
    fn edge_requires_both_endpoints() {
        let mut g = LiveGraph::new();
        g.insert_node(gene("g1", "Wheat"), None).unwrap();
        let err = g.insert_edge(homolog("g1", "g2", 80.0, "1.4")).unwrap_err();
        match err {
            CoreError::DanglingEdge { missing, .. } => assert_eq!(missing, id("g2")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn duplicate_edge_is_ignored() {
        let mut g = LiveGraph::new();
        g.insert_node(gene("g1", "Wheat"), None).unwrap();
        g.insert_node(gene("g2", "Wheat"), None).unwrap();
        assert!(g.insert_edge(homolog("g1", "g2", 80.0, "1.4")).unwrap());
        assert!(!g.insert_edge(homolog("g1", "g2", 95.0, "2.0")).unwrap());
        // Reverse direction is a distinct identity.
        assert!(g.insert_edge(homolog("g2", "g1", 80.0, "1.4")).unwrap());
        assert_eq!(g.edge_count(), 2);
        g.assert_consistency();
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut g = LiveGraph::new();
        g.insert_node(gene("g1", "Wheat"), None).unwrap();
        g.insert_node(gene("g2", "Wheat"), None).unwrap();
        g.insert_node(protein("p1", "Wheat"), None).unwrap();
        g.insert_edge(homolog("g1", "g2", 80.0, "1.4")).unwrap();
        g.insert_edge(coding("g1", "p1")).unwrap();

        let removed = g.remove_node(&id("g1")).unwrap();
        assert_eq!(removed.id(), &id("g1"));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 0);
        g.assert_consistency();

        // The same edge may be re-established once the node is back.
        g.insert_node(gene("g1", "Wheat"), None).unwrap();
        assert!(g.insert_edge(coding("g1", "p1")).unwrap());
        g.assert_consistency();
    }

    #[test]
    fn remove_missing_node_errors() {
        let mut g = LiveGraph::new();
        assert!(matches!(
            g.remove_node(&id("g404")),
            Err(CoreError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn displayed_edges_follow_endpoints() {
        let mut g = LiveGraph::new();
        g.insert_node(gene("g1", "Wheat"), None).unwrap();
        g.insert_node(gene("g2", "Barley"), None).unwrap();
        g.insert_edge(homolog("g1", "g2", 80.0, "1.4")).unwrap();
        assert_eq!(g.displayed_edges().count(), 1);

        g.set_node_visible(&id("g2"), false).unwrap();
        assert_eq!(g.displayed_edges().count(), 0);
        // The edge's own flag is untouched.
        assert!(g.edges().all(|e| e.visible));
    }

    #[test]
    fn counts_split_by_kind_and_visibility() {
        let mut g = LiveGraph::new();
        g.insert_node(gene("g1", "Wheat"), None).unwrap();
        g.insert_node(gene("g2", "Barley"), None).unwrap();
        g.insert_node(protein("p1", "Wheat"), None).unwrap();
        g.set_node_visible(&id("g2"), false).unwrap();

        let counts = g.counts();
        assert_eq!(
            counts,
            GraphCounts {
                genes_shown: 1,
                genes_hidden: 1,
                proteins_shown: 1,
                proteins_hidden: 0,
            }
        );
        assert_eq!(
            counts.to_string(),
            "Showing 1 genes (1 hidden) and 1 proteins (0 hidden)"
        );
    }

    #[test]
    fn predicate_iteration() {
        let mut g = LiveGraph::new();
        g.insert_node(gene("g1", "Wheat"), None).unwrap();
        g.insert_node(gene("g2", "Barley"), None).unwrap();
        g.insert_node(protein("p1", "Wheat"), None).unwrap();
        let wheat: Vec<&NodeId> = g
            .nodes_where(|e| e.node.assembly() == "Wheat")
            .map(|e| e.node.id())
            .collect();
        assert_eq!(wheat.len(), 2);
    }

    #[test]
    fn from_nodes_keeps_first_duplicate() {
        let g = LiveGraph::from_nodes(vec![gene("g1", "Wheat"), gene("g1", "Barley")]);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node(&id("g1")).unwrap().assembly(), "Wheat");
    }
}
