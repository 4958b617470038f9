//! End-to-end tests for the controller against scripted and socket servers.
//!
//! Tests cover:
//! - Seed, expand, filter and export in one session
//! - Stale replies after a newer request
//! - Connection failure, timeout and cancellation
//! - Input rejected before anything is sent
//! - Length-prefixed TCP and WebSocket carriers

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use knet_client::codec::ReplyFormat;
use knet_client::transport::{encode_frame, read_frame};
use knet_client::{
    ClientConfig, ClientError, Connector, Controller, Event, Expansion, MatchMode, ProjectId,
    Transport, TransportKind,
};
use knet_core::NodeId;

// ---------------------------------------------------------------------------
// Scripted server
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Script {
    Reply { body: String, delay_ms: u64 },
    /// Connection closes without a reply.
    Hangup,
    /// Never replies.
    Silent,
}

/// Answers each request with the first script whose prefix matches.
#[derive(Clone, Default)]
struct Scripted {
    scripts: Arc<Mutex<Vec<(String, Script)>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl Scripted {
    fn on(self, prefix: &str, script: Script) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .push((prefix.to_string(), script));
        self
    }

    fn reply(self, prefix: &str, body: &str) -> Self {
        self.on(
            prefix,
            Script::Reply {
                body: body.to_string(),
                delay_ms: 0,
            },
        )
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

struct ScriptedTransport {
    server: Scripted,
    line: Option<String>,
}

#[async_trait]
impl Connector for Scripted {
    async fn connect(&self) -> Result<Box<dyn Transport>, ClientError> {
        Ok(Box::new(ScriptedTransport {
            server: self.clone(),
            line: None,
        }))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_text(&mut self, text: &str) -> Result<(), ClientError> {
        self.server.sent.lock().unwrap().push(text.to_string());
        self.line = Some(text.to_string());
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String, ClientError> {
        let line = self.line.clone().unwrap_or_default();
        let script = self
            .server
            .scripts
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, script)| script.clone());
        match script {
            Some(Script::Reply { body, delay_ms }) => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(body)
            }
            Some(Script::Hangup) => Err(ClientError::Connection("connection reset".into())),
            Some(Script::Silent) => std::future::pending().await,
            None => Err(ClientError::Connection(format!("no script for {line}"))),
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        Ok(())
    }
}

const SPECIES: &str = "Wheat\nBarley\n";

const SEARCH: &str = r#"{"nodes": [
    {"data": {"id": "g1", "type": "Gene", "name": "FT1", "species": "Wheat",
              "contig": "chr1", "start": 100, "stop": 900, "description": "flowering locus"}}
], "edges": []}"#;

const EXPAND_HOMOLOG: &str = r#"{"nodes": [
    {"data": {"id": "g1", "type": "Gene", "name": "FT1", "species": "Wheat",
              "contig": "chr1", "start": 100, "stop": 900, "description": "flowering locus"}},
    {"data": {"id": "g2", "type": "Gene", "name": "FT2", "species": "Wheat",
              "contig": "chr4", "start": "40", "stop": "400", "description": "flowering locus"}}
], "edges": [
    {"data": {"source": "g1", "target": "g2", "type": "HOMOLOG", "perc_match": "77",
              "sensitivity": "1.4"}}
]}"#;

const EXPAND_CODING: &str = r#"{"nodes": [
    {"data": {"id": "p1", "type": "Protein", "name": "FT1-P", "species": "Wheat"}}
], "edges": [
    {"data": {"source": "g1", "target": "p1", "type": "CODING"}}
]}"#;

fn id(s: &str) -> NodeId {
    NodeId::parse(s).unwrap()
}

fn config() -> ClientConfig {
    ClientConfig {
        timeout_secs: 5,
        ..ClientConfig::default()
    }
}

/// Opens project 1 and commits the single search hit `g1`.
async fn seeded(server: Scripted) -> Controller<Scripted> {
    let server = server
        .reply("PAQURY_LIST_1_SPECIES", SPECIES)
        .reply("PAQURY_SEAR_1_WEB", SEARCH);
    let mut controller = Controller::new(server, &config());
    controller.open_project(ProjectId("1".into())).await.unwrap();
    controller
        .keyword_search("*", "*", "flowering", MatchMode::All)
        .await
        .unwrap();
    assert_eq!(controller.session_mut().commit_all().unwrap(), 1);
    controller
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn seed_expand_hide_and_export() {
    let server = Scripted::default().reply("PAQURY_RELA_1_WEB_g1_HOMOLOG", EXPAND_HOMOLOG);
    let mut controller = seeded(server.clone()).await;

    let report = controller.expand(&id("g1"), Expansion::Homolog).await.unwrap();
    assert_eq!(report.added_nodes, vec![id("g2")]);
    assert_eq!(report.duplicate_nodes, 1);

    let graph = controller.session().graph();
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);

    controller.session_mut().set_assembly_visibility("Wheat", false);
    let session = controller.session();
    assert!(!session.graph().is_node_visible(&id("g1")));
    assert!(!session.graph().is_node_visible(&id("g2")));
    assert_eq!(
        session.export(),
        "### Gene data ###\n\
         id,name,assembly,contig,start,stop,annotation,homologs\n\
         ### Protein data ###\n\
         id,name,assembly,homologs\n"
    );

    controller.session_mut().reset_all_visible();
    let export = controller.session().export();
    assert!(export.contains("g1,FT1,Wheat,chr1,100,900,flowering locus,g2:77%"));
    assert!(export.contains("g2,FT2,Wheat,chr4,40,400,flowering locus,g1:77%"));

    assert_eq!(
        server.sent(),
        vec![
            "PAQURY_LIST_1_SPECIES",
            "PAQURY_SEAR_1_WEB_*_*_flowering_ALL",
            "PAQURY_RELA_1_WEB_g1_HOMOLOG",
        ]
    );
}

#[tokio::test]
async fn species_reply_registers_assemblies() {
    let controller = seeded(Scripted::default()).await;
    let assemblies: Vec<_> = controller.session().filter().assemblies().collect();
    assert_eq!(assemblies, vec![("Wheat", true), ("Barley", true)]);
}

#[tokio::test]
async fn stale_reply_does_not_mutate_graph() {
    let server = Scripted::default()
        .reply("PAQURY_RELA_1_WEB_g1_HOMOLOG", EXPAND_HOMOLOG)
        .reply("PAQURY_RELA_1_WEB_g1_CODING", EXPAND_CODING);
    let mut controller = seeded(server).await;

    let homolog = controller
        .session()
        .expand_request(&id("g1"), Expansion::Homolog)
        .unwrap();
    let first = controller.send(&homolog);
    // Let the first reply land in the queue before superseding it.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let coding = controller
        .session()
        .expand_request(&id("g1"), Expansion::Coding)
        .unwrap();
    let second = controller.send(&coding);
    assert!(second > first);

    assert_eq!(
        controller.next_event().await.unwrap(),
        Event::Stale { generation: first }
    );
    assert_eq!(controller.session().graph().node_count(), 1);

    let Event::Expanded(report) = controller.next_event().await.unwrap() else {
        panic!("expected the second expansion");
    };
    assert_eq!(report.added_nodes, vec![id("p1")]);
    let graph = controller.session().graph();
    assert!(!graph.contains(&id("g2")));
    assert!(graph.contains(&id("p1")));
}

#[tokio::test]
async fn whitespace_keyword_sends_nothing() {
    let server = Scripted::default();
    let mut controller = Controller::new(server.clone(), &config());
    controller.session_mut().select_project(ProjectId("1".into()));

    let err = controller
        .keyword_search("*", "*", "  \n\t ", MatchMode::Any)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::EmptyInput { .. }));
    assert!(server.sent().is_empty());
    assert!(controller.session().ui().search_enabled);
}

#[tokio::test]
async fn hangup_is_a_connection_error() {
    let server = Scripted::default().on("PAQURY_RELA", Script::Hangup);
    let mut controller = seeded(server).await;

    let err = controller
        .expand(&id("g1"), Expansion::Homolog)
        .await
        .unwrap_err();
    assert!(err.is_connection());
    assert!(!controller.session().ui().busy);
    assert_eq!(controller.session().graph().node_count(), 1);
}

#[tokio::test]
async fn silence_times_out() {
    let server = Scripted::default().on("PMINFO", Script::Silent);
    let config = ClientConfig {
        timeout_secs: 1,
        ..ClientConfig::default()
    };
    let mut controller = Controller::new(server, &config);

    let err = controller.load_projects().await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert!(err.is_connection());
    assert!(controller.session().ui().search_enabled);
}

#[tokio::test]
async fn malformed_reply_is_a_decode_error() {
    let server = Scripted::default().reply("PAQURY_RELA", "Internal Server Error");
    let mut controller = seeded(server).await;

    let err = controller
        .expand(&id("g1"), Expansion::Homolog)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ProtocolDecode(_)));
    assert_eq!(controller.session().graph().node_count(), 1);
}

#[tokio::test]
async fn cancel_restores_affordances() {
    let server = Scripted::default()
        .on(
            "PAQURY_RELA_1_WEB_g1_HOMOLOG",
            Script::Reply {
                body: EXPAND_HOMOLOG.to_string(),
                delay_ms: 200,
            },
        )
        .reply("PAQURY_RELA_1_WEB_g1_CODING", EXPAND_CODING);
    let mut controller = seeded(server).await;

    let request = controller
        .session()
        .expand_request(&id("g1"), Expansion::Homolog)
        .unwrap();
    controller.send(&request);
    assert!(controller.session().ui().busy);

    controller.cancel();
    assert!(!controller.session().ui().busy);
    assert!(controller.session().ui().search_enabled);

    // The cancelled exchange never lands.
    let report = controller.expand(&id("g1"), Expansion::Coding).await.unwrap();
    assert_eq!(report.added_nodes, vec![id("p1")]);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!controller.session().graph().contains(&id("g2")));
}

#[tokio::test]
async fn project_switch_discards_graph() {
    let server = Scripted::default().reply("PAQURY_LIST_2_SPECIES", "Rice\n");
    let mut controller = seeded(server).await;

    let species = controller.open_project(ProjectId("2".into())).await.unwrap();
    assert_eq!(species, vec!["Rice"]);
    assert!(controller.session().graph().is_empty());
    assert!(controller.session().results().is_none());
}

// ---------------------------------------------------------------------------
// Socket carriers
// ---------------------------------------------------------------------------

const PROJECTS: &str = "Wheat pangenome\t1\tDB_RUNNING\nBarley\t2\tDB_LOADING\n";

#[tokio::test]
async fn framed_tcp_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let line = read_frame(&mut socket).await.unwrap();
        socket.write_all(&encode_frame(PROJECTS)).await.unwrap();
        line
    });

    let config = ClientConfig {
        server: format!("tcp://{addr}"),
        transport: TransportKind::Tcp,
        ..config()
    };
    let mut controller = Controller::from_config(&config).unwrap();
    let projects = controller.load_projects().await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, ProjectId("1".into()));
    assert_eq!(server.await.unwrap(), "PMINFO");
}

#[tokio::test]
async fn websocket_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
        let line = match ws.next().await {
            Some(Ok(Message::Text(text))) => text.to_string(),
            other => panic!("unexpected frame {other:?}"),
        };
        ws.send(Message::Text("Wheat\nBarley\n".to_string().into()))
            .await
            .unwrap();
        line
    });

    let config = ClientConfig {
        server: format!("ws://{addr}/"),
        ..config()
    };
    let mut controller = Controller::from_config(&config).unwrap();
    controller.session_mut().select_project(ProjectId("9".into()));
    let contigs = controller.load_contigs("Triticum_aestivum").await.unwrap();
    assert_eq!(contigs, vec!["Wheat", "Barley"]);
    assert_eq!(
        server.await.unwrap(),
        "PAQURY_LIST_9_CONTIG_Triticum\taestivum"
    );
}

#[test]
fn reply_formats_follow_request_kind() {
    let project = ProjectId("1".into());
    assert_eq!(
        knet_client::Request::SpeciesList { project }.reply_format(),
        ReplyFormat::Lines
    );
}
