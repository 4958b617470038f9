//! Fragment merge.
//!
//! [`LiveGraph::merge`] folds a server fragment into the live graph. Nodes are
//! keyed by id and edges by `(source, target, kind)`, so merging the same
//! fragment twice is a no-op the second time. Edges whose endpoints are not in
//! the graph after the node pass are skipped, never inserted.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::fragment::GraphFragment;
use crate::graph::LiveGraph;
use crate::id::NodeId;
use crate::layout::{radial, Position};

/// Node count at which the server is assumed to have capped its reply.
pub const TRUNCATION_LIMIT: usize = 100;

/// Advisory, non-fatal outcome of a search or merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Notice {
    /// The reply added nothing new.
    NoResults,
    /// The reply hit the server-side node cap.
    ResultsTruncated { count: usize },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoResults => f.write_str("No new nodes found."),
            Notice::ResultsTruncated { count } => write!(
                f,
                "Reached maximum number of node hits ({TRUNCATION_LIMIT}, got {count}). \
                 Not all nodes may be shown; consider a more restrictive query."
            ),
        }
    }
}

/// Notices for a reply carrying `received` nodes of which `fresh` were new.
pub fn notices_for(received: usize, fresh: usize) -> Vec<Notice> {
    let mut notices = Vec::new();
    if fresh == 0 {
        notices.push(Notice::NoResults);
    }
    if received >= TRUNCATION_LIMIT {
        notices.push(Notice::ResultsTruncated { count: received });
    }
    notices
}

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    /// Newly inserted node ids, in fragment order.
    pub added_nodes: Vec<NodeId>,
    pub added_edges: usize,
    pub duplicate_nodes: usize,
    pub duplicate_edges: usize,
    /// Edges skipped because an endpoint is absent.
    pub dangling_edges: usize,
    pub notices: Vec<Notice>,
}

impl LiveGraph {
    /// Merges `fragment` into the graph.
    ///
    /// With an `anchor`, new nodes are laid out on a circle around the
    /// anchor's position. The anchor must be in the graph; the graph is left
    /// untouched if it is not.
    pub fn merge(
        &mut self,
        fragment: &GraphFragment,
        anchor: Option<&NodeId>,
    ) -> Result<MergeReport, CoreError> {
        let center = match anchor {
            Some(id) => {
                let entry = self
                    .entry(id)
                    .ok_or_else(|| CoreError::NodeNotFound { id: id.clone() })?;
                Some(entry.position.unwrap_or_default())
            }
            None => None,
        };

        let mut report = MergeReport::default();

        // Fresh nodes in fragment order; repeats inside the fragment count once.
        let mut seen = HashSet::new();
        let fresh: Vec<_> = fragment
            .nodes
            .iter()
            .filter(|node| {
                let new = !self.contains(node.id()) && seen.insert(node.id().clone());
                if !new {
                    report.duplicate_nodes += 1;
                }
                new
            })
            .collect();

        let mut positions: Box<dyn Iterator<Item = Option<Position>>> = match center {
            Some(c) => Box::new(radial(c, fresh.len()).map(Some)),
            None => Box::new(std::iter::repeat(None)),
        };

        for node in fresh {
            let position = positions.next().flatten();
            self.insert_node(node.clone(), position)?;
            report.added_nodes.push(node.id().clone());
        }

        for edge in &fragment.edges {
            match self.insert_edge(edge.clone()) {
                Ok(true) => report.added_edges += 1,
                Ok(false) => report.duplicate_edges += 1,
                Err(CoreError::DanglingEdge { .. }) => report.dangling_edges += 1,
                Err(other) => return Err(other),
            }
        }

        report.notices = notices_for(fragment.nodes.len(), report.added_nodes.len());
        Ok(report)
    }
}
