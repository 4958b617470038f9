//! Client session state.
//!
//! A [`Session`] owns everything one user works with: the selected project,
//! the live graph, its visibility filter, the last search's result tree and
//! the single outstanding request. It performs no I/O. Requests are built by
//! the `*_request` methods, announced with [`Session::begin`] and resolved
//! with [`Session::apply`]; a reply whose generation is not the outstanding
//! one is reported as [`Event::Stale`] and changes nothing.

use tracing::{debug, info, warn};

use knet_core::{
    commit_selection, export_document, notices_for, GraphCounts, LiveGraph, MergeReport, Node,
    NodeId, Notice, ResultTree, VisibilityFilter,
};

use crate::channel::{Generation, Reply};
use crate::codec::{
    decode_fragment, decode_lines, running_projects, Expansion, MatchMode, ProjectId,
    ProjectInfo, Request, WILDCARD,
};
use crate::error::ClientError;

/// What the outstanding request will do with its reply.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Projects,
    Species { project: ProjectId },
    Contigs { species: String },
    Search,
    Expand { anchor: NodeId },
}

impl PendingAction {
    pub fn for_request(request: &Request) -> Self {
        match request {
            Request::ProjectList => PendingAction::Projects,
            Request::SpeciesList { project } => PendingAction::Species {
                project: project.clone(),
            },
            Request::ContigList { species, .. } => PendingAction::Contigs {
                species: species.clone(),
            },
            Request::KeywordSearch { .. } | Request::SequenceSearch { .. } => PendingAction::Search,
            Request::ExpandNode { node, .. } => PendingAction::Expand {
                anchor: node.clone(),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct Pending {
    generation: Generation,
    action: PendingAction,
}

/// Affordances a front end mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiState {
    pub search_enabled: bool,
    pub busy: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            search_enabled: true,
            busy: false,
        }
    }
}

/// Result of applying a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Projects(Vec<ProjectInfo>),
    Species(Vec<String>),
    Contigs { species: String, contigs: Vec<String> },
    /// A search reply was grouped into the result tree.
    SearchResults { leaves: usize, notices: Vec<Notice> },
    Expanded(MergeReport),
    /// The reply belonged to a superseded or cancelled request.
    Stale { generation: Generation },
}

#[derive(Debug, Default)]
pub struct Session {
    project: Option<ProjectId>,
    projects: Vec<ProjectInfo>,
    species: Vec<String>,
    graph: LiveGraph,
    filter: VisibilityFilter,
    results: Option<ResultTree>,
    pending: Option<Pending>,
    ui: UiState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose HOMOLOG edges start filtered to `sensitivity`.
    pub fn with_sensitivity(sensitivity: Option<&str>) -> Self {
        let mut session = Self::default();
        session
            .filter
            .apply_sensitivity(&mut session.graph, sensitivity);
        session
    }

    // -- accessors ----------------------------------------------------------

    pub fn project(&self) -> Option<&ProjectId> {
        self.project.as_ref()
    }

    pub fn projects(&self) -> &[ProjectInfo] {
        &self.projects
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn graph(&self) -> &LiveGraph {
        &self.graph
    }

    pub fn filter(&self) -> &VisibilityFilter {
        &self.filter
    }

    pub fn results(&self) -> Option<&ResultTree> {
        self.results.as_ref()
    }

    pub fn ui(&self) -> UiState {
        self.ui
    }

    pub fn pending_generation(&self) -> Option<Generation> {
        self.pending.as_ref().map(|p| p.generation)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.graph.node(id)
    }

    pub fn counts(&self) -> GraphCounts {
        self.graph.counts()
    }

    /// The visible part of the live graph as a two-section document.
    pub fn export(&self) -> String {
        export_document(&self.graph)
    }

    // -- project ------------------------------------------------------------

    /// Switches project, discarding the graph, filters, results and any
    /// outstanding request. The sensitivity selection is kept.
    pub fn select_project(&mut self, project: ProjectId) {
        info!(%project, "project selected");
        let sensitivity = self.filter.sensitivity().map(str::to_string);
        self.graph.clear();
        self.filter = VisibilityFilter::new();
        self.filter
            .apply_sensitivity(&mut self.graph, sensitivity.as_deref());
        self.results = None;
        self.species.clear();
        self.pending = None;
        self.ui = UiState::default();
        self.project = Some(project);
    }

    fn require_project(&self) -> Result<ProjectId, ClientError> {
        self.project.clone().ok_or(ClientError::NoProject)
    }

    // -- request building ---------------------------------------------------

    pub fn projects_request(&self) -> Request {
        Request::ProjectList
    }

    pub fn species_request(&self) -> Result<Request, ClientError> {
        Ok(Request::SpeciesList {
            project: self.require_project()?,
        })
    }

    pub fn contigs_request(&self, species: &str) -> Result<Request, ClientError> {
        Ok(Request::ContigList {
            project: self.require_project()?,
            species: or_wildcard(species),
        })
    }

    /// Rejects keyword text that is empty after trimming. Interior whitespace
    /// is sent as typed.
    pub fn keyword_search_request(
        &self,
        species: &str,
        contig: &str,
        keywords: &str,
        mode: MatchMode,
    ) -> Result<Request, ClientError> {
        let keywords = keywords.trim();
        if keywords.is_empty() {
            return Err(ClientError::EmptyInput { field: "keyword" });
        }
        Ok(Request::KeywordSearch {
            project: self.require_project()?,
            species: or_wildcard(species),
            contig: or_wildcard(contig),
            keywords: keywords.to_string(),
            mode,
        })
    }

    /// Rejects a sequence that is empty after trimming. Line breaks inside
    /// are kept; the server drops FASTA header lines by them.
    pub fn sequence_search_request(
        &self,
        species: &str,
        contig: &str,
        e_value: f64,
        sequence: &str,
    ) -> Result<Request, ClientError> {
        let sequence = sequence.trim().to_string();
        if sequence.is_empty() {
            return Err(ClientError::EmptyInput { field: "sequence" });
        }
        Ok(Request::SequenceSearch {
            project: self.require_project()?,
            species: or_wildcard(species),
            contig: or_wildcard(contig),
            e_value,
            sequence,
        })
    }

    /// The anchor must be in the live graph.
    pub fn expand_request(&self, node: &NodeId, relation: Expansion) -> Result<Request, ClientError> {
        let project = self.require_project()?;
        if !self.graph.contains(node) {
            return Err(knet_core::CoreError::NodeNotFound { id: node.clone() }.into());
        }
        Ok(Request::ExpandNode {
            project,
            node: node.clone(),
            relation,
        })
    }

    // -- request lifecycle --------------------------------------------------

    /// Records `request` as outstanding under `generation`, replacing any
    /// earlier one.
    pub fn begin(&mut self, generation: Generation, request: &Request) {
        if let Some(previous) = self.pending.replace(Pending {
            generation,
            action: PendingAction::for_request(request),
        }) {
            debug!(superseded = %previous.generation, %generation, "request superseded");
        }
        self.ui = UiState {
            search_enabled: false,
            busy: true,
        };
    }

    /// Forgets the outstanding request and restores the affordances.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(generation = %pending.generation, "pending request dropped");
        }
        self.ui = UiState::default();
    }

    /// Applies a reply. Errors end the outstanding action and leave the graph
    /// as it was.
    pub fn apply(&mut self, reply: Reply) -> Result<Event, ClientError> {
        let current = self.pending.as_ref().map(|p| p.generation);
        if current != Some(reply.generation) {
            warn!(generation = %reply.generation, ?current, "stale reply dropped");
            return Ok(Event::Stale {
                generation: reply.generation,
            });
        }
        let Some(Pending { action, .. }) = self.pending.take() else {
            return Ok(Event::Stale {
                generation: reply.generation,
            });
        };
        self.ui = UiState::default();

        let body = reply.body?;
        debug!(generation = %reply.generation, bytes = body.len(), "reply accepted");

        match action {
            PendingAction::Projects => {
                self.projects = running_projects(&body);
                Ok(Event::Projects(self.projects.clone()))
            }
            PendingAction::Species { project } => {
                let species = decode_lines(&body);
                if self.project.as_ref() == Some(&project) {
                    self.filter.reinitialize(species.iter().cloned());
                    self.filter.refresh_all(&mut self.graph);
                    self.species = species.clone();
                }
                Ok(Event::Species(species))
            }
            PendingAction::Contigs { species } => Ok(Event::Contigs {
                species,
                contigs: decode_lines(&body),
            }),
            PendingAction::Search => {
                let fragment = decode_fragment(&body)?;
                let tree = ResultTree::build(&fragment);
                let notices = notices_for(fragment.nodes.len(), tree.leaf_count());
                for notice in &notices {
                    warn!(%notice, "search");
                }
                let leaves = tree.leaf_count();
                info!(leaves, assemblies = tree.assemblies().count(), "search results");
                self.results = Some(tree);
                Ok(Event::SearchResults { leaves, notices })
            }
            PendingAction::Expand { anchor } => {
                let fragment = decode_fragment(&body)?;
                let report = self.graph.merge(&fragment, Some(&anchor))?;
                self.filter.refresh_all(&mut self.graph);
                for notice in &report.notices {
                    warn!(%notice, %anchor, "expansion");
                }
                info!(
                    %anchor,
                    nodes = report.added_nodes.len(),
                    edges = report.added_edges,
                    dangling = report.dangling_edges,
                    "expansion merged"
                );
                Ok(Event::Expanded(report))
            }
        }
    }

    // -- selection ----------------------------------------------------------

    /// Seeds the live graph with the chosen result leaves.
    pub fn commit_selection(&mut self, ids: &[NodeId]) -> Result<usize, ClientError> {
        let tree = self.results.as_ref().ok_or(ClientError::NoResults)?;
        let count = commit_selection(&mut self.graph, tree.select(ids));
        self.after_commit(count);
        Ok(count)
    }

    /// Seeds the live graph with one assembly's leaves, optionally one contig.
    pub fn commit_branch(&mut self, assembly: &str, contig: Option<&str>) -> Result<usize, ClientError> {
        let tree = self.results.as_ref().ok_or(ClientError::NoResults)?;
        let count = commit_selection(&mut self.graph, tree.select_branch(assembly, contig));
        self.after_commit(count);
        Ok(count)
    }

    pub fn commit_all(&mut self) -> Result<usize, ClientError> {
        let tree = self.results.as_ref().ok_or(ClientError::NoResults)?;
        let count = commit_selection(&mut self.graph, tree.select_all());
        self.after_commit(count);
        Ok(count)
    }

    fn after_commit(&mut self, count: usize) {
        self.filter.reset_all_visible(&mut self.graph);
        let sensitivity = self.filter.sensitivity().map(str::to_string);
        self.filter
            .apply_sensitivity(&mut self.graph, sensitivity.as_deref());
        info!(nodes = count, "selection committed");
    }

    // -- filters and edits --------------------------------------------------

    pub fn set_assembly_visibility(&mut self, assembly: &str, visible: bool) {
        self.filter
            .set_assembly_visibility(&mut self.graph, assembly, visible);
    }

    pub fn reset_all_visible(&mut self) {
        self.filter.reset_all_visible(&mut self.graph);
    }

    pub fn apply_sensitivity(&mut self, bucket: Option<&str>) {
        self.filter.apply_sensitivity(&mut self.graph, bucket);
    }

    /// Removes a node and its edges from the live graph.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<Node, ClientError> {
        let node = self.graph.remove_node(id)?;
        debug!(%id, "node deleted");
        Ok(node)
    }
}

fn or_wildcard(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        WILDCARD.to_string()
    } else {
        value.to_string()
    }
}
