//! Wire codec for the knowledge-network server.
//!
//! Requests are single text lines whose fields are joined with `_`. Free-text
//! fields (species, contig, keywords, sequences) may themselves contain
//! underscores, so every field has its underscores replaced by tabs before it
//! is joined. The server reads tabs as literal characters; nothing maps them
//! back to underscores.
//!
//! List replies are newline-separated records of tab-separated fields. Search
//! and expansion replies are JSON graph fragments.

use std::fmt;

use serde::{Deserialize, Serialize};

use knet_core::{GraphFragment, NodeId, WireFragment};

use crate::error::ClientError;

/// Record separator inside a request line.
pub const FIELD_SEPARATOR: char = '_';
/// Replacement for underscores occurring inside a field.
pub const ESCAPED_SEPARATOR: char = '\t';
/// Project status of a project that can be queried.
pub const RUNNING_STATUS: &str = "DB_RUNNING";
/// Species/contig value meaning "all".
pub const WILDCARD: &str = "*";

/// Server-assigned project identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a keyword search needs all keywords or any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    All,
    Any,
}

impl MatchMode {
    pub fn wire_name(self) -> &'static str {
        match self {
            MatchMode::All => "ALL",
            MatchMode::Any => "ANY",
        }
    }
}

/// Relation to follow when expanding a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expansion {
    /// Upstream and downstream contig neighbours.
    Cooccurrence53,
    Coding,
    Homolog,
}

impl Expansion {
    pub fn wire_name(self) -> &'static str {
        match self {
            Expansion::Cooccurrence53 => "53NB",
            Expansion::Coding => "CODING",
            Expansion::Homolog => "HOMOLOG",
        }
    }
}

impl std::str::FromStr for Expansion {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "53NB" | "COOCCURRENCE_5_3" | "NEIGHBOURS" | "NEIGHBORS" => Ok(Expansion::Cooccurrence53),
            "CODING" => Ok(Expansion::Coding),
            "HOMOLOG" => Ok(Expansion::Homolog),
            other => Err(ClientError::Config(format!(
                "unknown relation '{other}', expected 53NB, CODING or HOMOLOG"
            ))),
        }
    }
}

/// A typed server request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ProjectList,
    SpeciesList {
        project: ProjectId,
    },
    ContigList {
        project: ProjectId,
        species: String,
    },
    KeywordSearch {
        project: ProjectId,
        species: String,
        contig: String,
        keywords: String,
        mode: MatchMode,
    },
    SequenceSearch {
        project: ProjectId,
        species: String,
        contig: String,
        e_value: f64,
        sequence: String,
    },
    ExpandNode {
        project: ProjectId,
        node: NodeId,
        relation: Expansion,
    },
}

/// How a request's reply body is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    /// `name\tid\tstatus` records.
    Projects,
    /// One value per line.
    Lines,
    /// JSON graph fragment.
    Fragment,
}

impl Request {
    /// Encodes the request as one command line.
    pub fn encode(&self) -> String {
        match self {
            Request::ProjectList => "PMINFO".to_string(),
            Request::SpeciesList { project } => {
                join(&["PAQURY", "LIST", &escape(&project.0), "SPECIES"])
            }
            Request::ContigList { project, species } => join(&[
                "PAQURY",
                "LIST",
                &escape(&project.0),
                "CONTIG",
                &escape(species),
            ]),
            Request::KeywordSearch {
                project,
                species,
                contig,
                keywords,
                mode,
            } => join(&[
                "PAQURY",
                "SEAR",
                &escape(&project.0),
                "WEB",
                &escape(species),
                &escape(contig),
                &escape(keywords),
                mode.wire_name(),
            ]),
            Request::SequenceSearch {
                project,
                species,
                contig,
                e_value,
                sequence,
            } => join(&[
                "PAQURY",
                "SEAR",
                &escape(&project.0),
                "WEB",
                &escape(species),
                &escape(contig),
                &e_value.to_string(),
                &escape(sequence),
                "BLAST",
            ]),
            Request::ExpandNode {
                project,
                node,
                relation,
            } => join(&[
                "PAQURY",
                "RELA",
                &escape(&project.0),
                "WEB",
                &escape(node.as_str()),
                relation.wire_name(),
            ]),
        }
    }

    pub fn reply_format(&self) -> ReplyFormat {
        match self {
            Request::ProjectList => ReplyFormat::Projects,
            Request::SpeciesList { .. } | Request::ContigList { .. } => ReplyFormat::Lines,
            Request::KeywordSearch { .. }
            | Request::SequenceSearch { .. }
            | Request::ExpandNode { .. } => ReplyFormat::Fragment,
        }
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Request::ProjectList => "project-list",
            Request::SpeciesList { .. } => "species-list",
            Request::ContigList { .. } => "contig-list",
            Request::KeywordSearch { .. } => "keyword-search",
            Request::SequenceSearch { .. } => "sequence-search",
            Request::ExpandNode { .. } => "expand-node",
        }
    }
}

/// Replaces field-internal underscores with tabs.
pub fn escape(field: &str) -> String {
    field.replace(FIELD_SEPARATOR, &ESCAPED_SEPARATOR.to_string())
}

fn join(fields: &[&str]) -> String {
    fields.join(&FIELD_SEPARATOR.to_string())
}

/// Splits a command line back into its fields. Escaped underscores stay tabs.
pub fn split_command(line: &str) -> Vec<&str> {
    line.split(FIELD_SEPARATOR).collect()
}

// ---------------------------------------------------------------------------
// Reply decoding
// ---------------------------------------------------------------------------

/// One `PMINFO` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub id: ProjectId,
    pub status: String,
}

impl ProjectInfo {
    pub fn is_running(&self) -> bool {
        self.status == RUNNING_STATUS
    }
}

/// Every well-formed project record. Lines with fewer than three fields are
/// skipped.
pub fn decode_projects(body: &str) -> Vec<ProjectInfo> {
    records(body)
        .filter_map(|line| {
            let mut fields = line.split(ESCAPED_SEPARATOR);
            let name = fields.next()?;
            let id = fields.next()?;
            let status = fields.next()?;
            Some(ProjectInfo {
                name: name.to_string(),
                id: ProjectId(id.to_string()),
                status: status.to_string(),
            })
        })
        .collect()
}

/// Projects the client may open.
pub fn running_projects(body: &str) -> Vec<ProjectInfo> {
    decode_projects(body)
        .into_iter()
        .filter(ProjectInfo::is_running)
        .collect()
}

/// One value per non-empty line.
pub fn decode_lines(body: &str) -> Vec<String> {
    records(body).map(str::to_string).collect()
}

fn records(body: &str) -> impl Iterator<Item = &str> {
    body.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
}

/// Decodes a search or expansion reply.
pub fn decode_fragment(body: &str) -> Result<GraphFragment, ClientError> {
    let wire = WireFragment::from_json(body)?;
    GraphFragment::try_from(wire).map_err(|err| ClientError::ProtocolDecode(err.to_string()))
}
