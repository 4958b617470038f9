//! Search-result hierarchy and selection commit.
//!
//! A search reply is a flat node list. [`ResultTree`] groups it as
//! assembly → contig → entity so a user can pick a subset before anything is
//! drawn. Leaves own the full node payload, so committing a selection rebuilds
//! nodes rather than bare ids.
//!
//! Committing installs only the selected nodes. Edges from the search reply
//! are not carried over; relations come back through expansion requests.

use indexmap::IndexMap;

use crate::fragment::GraphFragment;
use crate::graph::LiveGraph;
use crate::id::NodeId;
use crate::node::Node;

/// Contig label for entities that carry no contig (proteins).
pub const UNPLACED_CONTIG: &str = "unplaced";

/// A selectable entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub node: Node,
}

impl Leaf {
    pub fn id(&self) -> &NodeId {
        self.node.id()
    }

    pub fn label(&self) -> String {
        self.node.label()
    }
}

/// Assembly → contig → leaves, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTree {
    assemblies: IndexMap<String, IndexMap<String, Vec<Leaf>>>,
    total: usize,
}

impl ResultTree {
    /// Groups a search reply. Repeated ids keep their first occurrence.
    pub fn build(fragment: &GraphFragment) -> Self {
        let mut tree = ResultTree::default();
        let mut seen = std::collections::HashSet::new();
        for node in &fragment.nodes {
            if !seen.insert(node.id().clone()) {
                continue;
            }
            let contig = node.contig().unwrap_or(UNPLACED_CONTIG);
            tree.assemblies
                .entry(node.assembly().to_string())
                .or_default()
                .entry(contig.to_string())
                .or_default()
                .push(Leaf { node: node.clone() });
            tree.total += 1;
        }
        tree
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn leaf_count(&self) -> usize {
        self.total
    }

    pub fn assemblies(&self) -> impl Iterator<Item = &str> {
        self.assemblies.keys().map(String::as_str)
    }

    /// Contig names under one assembly.
    pub fn contigs<'a>(&'a self, assembly: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.assemblies
            .get(assembly)
            .into_iter()
            .flat_map(|contigs| contigs.keys().map(String::as_str))
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.assemblies
            .values()
            .flat_map(|contigs| contigs.values())
            .flatten()
    }

    /// Leaves whose ids are in `ids`, in tree order. Unknown ids are ignored.
    pub fn select(&self, ids: &[NodeId]) -> Vec<&Leaf> {
        self.leaves().filter(|leaf| ids.contains(leaf.id())).collect()
    }

    /// Every leaf under one assembly, optionally narrowed to one contig.
    pub fn select_branch(&self, assembly: &str, contig: Option<&str>) -> Vec<&Leaf> {
        let Some(contigs) = self.assemblies.get(assembly) else {
            return Vec::new();
        };
        contigs
            .iter()
            .filter(|(name, _)| contig.map_or(true, |wanted| wanted == name.as_str()))
            .flat_map(|(_, leaves)| leaves)
            .collect()
    }

    pub fn select_all(&self) -> Vec<&Leaf> {
        self.leaves().collect()
    }
}

/// Replaces the live graph's contents with exactly the selected leaves.
pub fn commit_selection<'a>(
    graph: &mut LiveGraph,
    selected: impl IntoIterator<Item = &'a Leaf>,
) -> usize {
    *graph = LiveGraph::from_nodes(selected.into_iter().map(|leaf| leaf.node.clone()));
    graph.node_count()
}
