//! Async driver tying a [`Session`] to a [`RequestChannel`].
//!
//! The controller is the only owner of both, so no locking is needed. Each
//! high-level call builds a request from the session, dispatches it, then
//! waits for replies until one with the current generation arrives.

use tracing::debug;

use knet_core::{MergeReport, NodeId};

use crate::channel::{Generation, RequestChannel};
use crate::codec::{Expansion, MatchMode, ProjectId, ProjectInfo, Request};
use crate::config::{ClientConfig, ServerConnector};
use crate::error::ClientError;
use crate::session::{Event, Session};
use crate::transport::Connector;

pub struct Controller<C: Connector> {
    session: Session,
    channel: RequestChannel<C>,
}

impl Controller<ServerConnector> {
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            session: Session::with_sensitivity(config.sensitivity.as_deref()),
            channel: RequestChannel::new(config.connector(), config.timeout()),
        })
    }
}

impl<C: Connector> Controller<C> {
    pub fn new(connector: C, config: &ClientConfig) -> Self {
        Self {
            session: Session::with_sensitivity(config.sensitivity.as_deref()),
            channel: RequestChannel::new(connector, config.timeout()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Dispatches `request` without waiting, superseding any outstanding one.
    pub fn send(&mut self, request: &Request) -> Generation {
        let line = request.encode();
        debug!(kind = request.label(), %line, "sending");
        let generation = self.channel.dispatch(line);
        self.session.begin(generation, request);
        generation
    }

    /// Waits for the next reply and applies it. Stale replies come back as
    /// [`Event::Stale`].
    pub async fn next_event(&mut self) -> Result<Event, ClientError> {
        let reply = self
            .channel
            .next_reply()
            .await
            .ok_or_else(|| ClientError::Connection("request channel closed".into()))?;
        self.session.apply(reply)
    }

    /// Sends `request` and waits for its own reply.
    pub async fn submit(&mut self, request: &Request) -> Result<Event, ClientError> {
        self.send(request);
        loop {
            match self.next_event().await? {
                Event::Stale { .. } => continue,
                event => return Ok(event),
            }
        }
    }

    /// Closes the outstanding request and restores the affordances.
    pub fn cancel(&mut self) {
        self.channel.cancel();
        self.session.cancel();
    }

    pub async fn load_projects(&mut self) -> Result<Vec<ProjectInfo>, ClientError> {
        let request = self.session.projects_request();
        match self.submit(&request).await? {
            Event::Projects(projects) => Ok(projects),
            other => Err(unexpected(other)),
        }
    }

    /// Switches project and loads its species, which become the assembly
    /// filter's entries.
    pub async fn open_project(&mut self, project: ProjectId) -> Result<Vec<String>, ClientError> {
        self.channel.cancel();
        self.session.select_project(project);
        let request = self.session.species_request()?;
        match self.submit(&request).await? {
            Event::Species(species) => Ok(species),
            other => Err(unexpected(other)),
        }
    }

    pub async fn load_contigs(&mut self, species: &str) -> Result<Vec<String>, ClientError> {
        let request = self.session.contigs_request(species)?;
        match self.submit(&request).await? {
            Event::Contigs { contigs, .. } => Ok(contigs),
            other => Err(unexpected(other)),
        }
    }

    pub async fn keyword_search(
        &mut self,
        species: &str,
        contig: &str,
        keywords: &str,
        mode: MatchMode,
    ) -> Result<Event, ClientError> {
        let request = self
            .session
            .keyword_search_request(species, contig, keywords, mode)?;
        self.submit(&request).await
    }

    pub async fn sequence_search(
        &mut self,
        species: &str,
        contig: &str,
        e_value: f64,
        sequence: &str,
    ) -> Result<Event, ClientError> {
        let request = self
            .session
            .sequence_search_request(species, contig, e_value, sequence)?;
        self.submit(&request).await
    }

    pub async fn expand(
        &mut self,
        node: &NodeId,
        relation: Expansion,
    ) -> Result<MergeReport, ClientError> {
        let request = self.session.expand_request(node, relation)?;
        match self.submit(&request).await? {
            Event::Expanded(report) => Ok(report),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(event: Event) -> ClientError {
    ClientError::ProtocolDecode(format!("reply applied as unexpected event {event:?}"))
}
