//! Knowledge-network command-line client.
//!
//! Provides the `knet` binary for listing projects, species and contigs, and
//! for running a search, expanding the committed nodes and writing the
//! visible subgraph as an export document.
//!
//! Server settings come from `KNET_*` environment variables and can be
//! overridden per invocation with the global flags.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use knet_client::{
    ClientConfig, ClientError, Controller, Event, Expansion, MatchMode, ProjectId,
    ServerConnector, TransportKind,
};
use knet_core::NodeId;

/// Knowledge-network client.
#[derive(Parser)]
#[command(name = "knet", about = "Query and export a genomics knowledge network")]
struct Cli {
    /// Server address (overrides KNET_SERVER).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Transport: ws or tcp (overrides KNET_TRANSPORT).
    #[arg(long, global = true)]
    transport: Option<String>,

    /// Reply timeout in seconds (overrides KNET_TIMEOUT_SECS).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List queryable projects as JSON.
    Projects,

    /// List the species (assemblies) of a project.
    Species {
        #[arg(short, long)]
        project: String,
    },

    /// List the contigs of one species, or of all with `*`.
    Contigs {
        #[arg(short, long)]
        project: String,

        #[arg(short, long, default_value = "*")]
        species: String,
    },

    /// Search, commit every hit, optionally expand, then export.
    Search {
        #[arg(short, long)]
        project: String,

        #[arg(short, long, default_value = "*")]
        species: String,

        #[arg(short, long, default_value = "*")]
        contig: String,

        /// Whitespace-separated keywords.
        #[arg(short, long, conflicts_with = "sequence")]
        keywords: Option<String>,

        /// Whether all keywords or any must match.
        #[arg(long = "match", value_enum, default_value = "all")]
        match_mode: MatchArg,

        /// Nucleotide or amino-acid sequence for a BLAST search.
        #[arg(long)]
        sequence: Option<String>,

        /// E-value cutoff for sequence searches.
        #[arg(long, default_value_t = 1e-5)]
        e_value: f64,

        /// Expand a node after committing, as NODE:RELATION (53NB, CODING,
        /// HOMOLOG). Repeatable; applied in order.
        #[arg(long = "expand", value_parser = parse_expansion)]
        expansions: Vec<(NodeId, Expansion)>,

        /// Hide an assembly before exporting. Repeatable.
        #[arg(long = "hide-assembly")]
        hidden: Vec<String>,

        /// Only show HOMOLOG edges of this sensitivity bucket
        /// (overrides KNET_SENSITIVITY).
        #[arg(long)]
        sensitivity: Option<String>,

        /// Export file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MatchArg {
    All,
    Any,
}

impl From<MatchArg> for MatchMode {
    fn from(arg: MatchArg) -> Self {
        match arg {
            MatchArg::All => MatchMode::All,
            MatchArg::Any => MatchMode::Any,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            exit_code(&err)
        }
    };
    process::exit(exit_code);
}

/// 1 = action failed, 2 = bad input or configuration, 3 = connection or I/O.
fn exit_code(err: &ClientError) -> i32 {
    match err {
        ClientError::EmptyInput { .. } | ClientError::Config(_) => 2,
        err if err.is_connection() => 3,
        _ => 1,
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig, ClientError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(server) = &cli.server {
        config.server = server.clone();
    }
    if let Some(transport) = &cli.transport {
        config.transport = transport.parse::<TransportKind>()?;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Commands::Search {
        sensitivity: Some(bucket),
        ..
    } = &cli.command
    {
        config.sensitivity = Some(bucket.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = load_config(&cli)?;
    info!(server = %config.server, transport = ?config.transport, "knet starting");
    let mut controller = Controller::from_config(&config)?;

    match cli.command {
        Commands::Projects => {
            let projects = controller.load_projects().await?;
            let json = serde_json::to_string_pretty(&projects)
                .map_err(|e| ClientError::ProtocolDecode(e.to_string()))?;
            println!("{}", json);
        }
        Commands::Species { project } => {
            for species in controller.open_project(ProjectId(project)).await? {
                println!("{}", species);
            }
        }
        Commands::Contigs { project, species } => {
            controller.session_mut().select_project(ProjectId(project));
            for contig in controller.load_contigs(&species).await? {
                println!("{}", contig);
            }
        }
        Commands::Search {
            project,
            species,
            contig,
            keywords,
            match_mode,
            sequence,
            e_value,
            expansions,
            hidden,
            sensitivity: _,
            output,
        } => {
            controller.open_project(ProjectId(project)).await?;

            let event = match sequence {
                Some(sequence) => {
                    controller
                        .sequence_search(&species, &contig, e_value, &sequence)
                        .await?
                }
                None => {
                    let keywords = keywords.unwrap_or_default();
                    controller
                        .keyword_search(&species, &contig, &keywords, match_mode.into())
                        .await?
                }
            };
            report_search(&event);

            let committed = controller.session_mut().commit_all()?;
            eprintln!("Committed {} result(s)", committed);

            expand_all(&mut controller, &expansions).await?;

            for assembly in &hidden {
                controller
                    .session_mut()
                    .set_assembly_visibility(assembly, false);
            }

            let document = controller.session().export();
            match output {
                Some(path) => {
                    std::fs::write(&path, document)?;
                    eprintln!("Wrote {}", path.display());
                }
                None => print!("{}", document),
            }
            eprintln!("{}", controller.session().counts());
        }
    }
    Ok(())
}

fn report_search(event: &Event) {
    if let Event::SearchResults { leaves, notices } = event {
        eprintln!("Found {} result(s)", leaves);
        for notice in notices {
            eprintln!("Warning: {}", notice);
        }
    }
}

async fn expand_all(
    controller: &mut Controller<ServerConnector>,
    expansions: &[(NodeId, Expansion)],
) -> Result<(), ClientError> {
    for (node, relation) in expansions {
        let report = controller.expand(node, *relation).await?;
        eprintln!(
            "Expanded {} via {}: {} node(s), {} edge(s)",
            node,
            relation.wire_name(),
            report.added_nodes.len(),
            report.added_edges
        );
        if report.dangling_edges > 0 {
            warn!(%node, dangling = report.dangling_edges, "edges skipped");
        }
        for notice in &report.notices {
            eprintln!("Warning: {}", notice);
        }
    }
    Ok(())
}

/// Parses `NODE:RELATION`, e.g. `g12:HOMOLOG`.
fn parse_expansion(s: &str) -> Result<(NodeId, Expansion), String> {
    let (node, relation) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NODE:RELATION, got '{}'", s))?;
    let node = NodeId::parse(node).map_err(|e| e.to_string())?;
    let relation = relation.parse::<Expansion>().map_err(|e| e.to_string())?;
    Ok((node, relation))
}
