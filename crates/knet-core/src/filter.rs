//! Visibility filters over the live graph.
//!
//! Two independent predicates decide what is displayed:
//!
//! - a per-assembly flag, applied to nodes,
//! - a sensitivity selection, applied to HOMOLOG edges.
//!
//! Deleted elements are removed from the graph outright, so the third term of
//! the composition (`NOT deleted`) holds for everything the filters see.
//!
//! Each operation recomputes the affected elements from the full filter state
//! rather than toggling them, which makes the operations idempotent and
//! order-independent.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::edge::{Edge, RelationKind};
use crate::graph::LiveGraph;
use crate::node::Node;

/// Assembly flags plus the current sensitivity bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibilityFilter {
    /// One flag per known assembly, in the order they were registered.
    assemblies: IndexMap<String, bool>,
    /// Selected HOMOLOG bucket; `None` lets every bucket through.
    sensitivity: Option<String>,
}

impl VisibilityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the known assemblies with `names`, all shown. The sensitivity
    /// selection is kept.
    pub fn reinitialize<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assemblies = names.into_iter().map(|name| (name.into(), true)).collect();
    }

    /// Known assemblies and their flags.
    pub fn assemblies(&self) -> impl Iterator<Item = (&str, bool)> {
        self.assemblies
            .iter()
            .map(|(name, shown)| (name.as_str(), *shown))
    }

    /// Unregistered assemblies are shown.
    pub fn is_assembly_shown(&self, assembly: &str) -> bool {
        self.assemblies.get(assembly).copied().unwrap_or(true)
    }

    pub fn sensitivity(&self) -> Option<&str> {
        self.sensitivity.as_deref()
    }

    pub fn node_passes(&self, node: &Node) -> bool {
        self.is_assembly_shown(node.assembly())
    }

    /// Non-HOMOLOG edges always pass.
    pub fn edge_passes(&self, edge: &Edge) -> bool {
        if edge.kind() != RelationKind::Homolog {
            return true;
        }
        match &self.sensitivity {
            Some(selected) => edge.relation.sensitivity() == Some(selected.as_str()),
            None => true,
        }
    }

    /// Sets one assembly's flag and recomputes every node of that assembly.
    pub fn set_assembly_visibility(&mut self, graph: &mut LiveGraph, assembly: &str, visible: bool) {
        self.assemblies.insert(assembly.to_string(), visible);
        for entry in graph.node_entries_mut() {
            if entry.node.assembly() == assembly {
                entry.visible = visible;
            }
        }
    }

    /// Shows every assembly again and recomputes all nodes.
    pub fn reset_all_visible(&mut self, graph: &mut LiveGraph) {
        for shown in self.assemblies.values_mut() {
            *shown = true;
        }
        for entry in graph.node_entries_mut() {
            entry.visible = true;
        }
    }

    /// Selects a sensitivity bucket and recomputes every HOMOLOG edge.
    pub fn apply_sensitivity(&mut self, graph: &mut LiveGraph, bucket: Option<&str>) {
        self.sensitivity = bucket.map(str::to_string);
        for entry in graph.edge_entries_mut() {
            if entry.edge.kind() == RelationKind::Homolog {
                entry.visible = self.edge_passes(&entry.edge);
            }
        }
    }

    /// Re-derives every element's flag from the current filter state.
    pub fn refresh_all(&self, graph: &mut LiveGraph) {
        for entry in graph.node_entries_mut() {
            entry.visible = self.node_passes(&entry.node);
        }
        for entry in graph.edge_entries_mut() {
            entry.visible = self.edge_passes(&entry.edge);
        }
    }
}
