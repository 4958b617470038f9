//! Client configuration.
//!
//! Read from environment variables, each optional:
//! - `KNET_SERVER`: server address (default: `ws://127.0.0.1:7687/`)
//! - `KNET_TRANSPORT`: `ws` or `tcp` (default: `ws`)
//! - `KNET_TIMEOUT_SECS`: reply timeout in seconds (default: 30)
//! - `KNET_SENSITIVITY`: initial HOMOLOG sensitivity bucket (default: all)

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::transport::{Connector, FramedTcpConnector, Transport, WsConnector};

pub const DEFAULT_SERVER: &str = "ws://127.0.0.1:7687/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Wire carrier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// WebSocket text frames.
    #[default]
    Ws,
    /// Length-prefixed TCP frames.
    Tcp,
}

impl FromStr for TransportKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ws" | "wss" | "websocket" => Ok(TransportKind::Ws),
            "tcp" | "framed" => Ok(TransportKind::Tcp),
            other => Err(ClientError::Config(format!(
                "unknown transport '{other}', expected ws or tcp"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: String,
    pub transport: TransportKind,
    pub timeout_secs: u64,
    pub sensitivity: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            transport: TransportKind::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            sensitivity: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` yields per variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(server) = lookup("KNET_SERVER") {
            config.server = server;
        }
        if let Some(transport) = lookup("KNET_TRANSPORT") {
            config.transport = transport.parse()?;
        }
        if let Some(secs) = lookup("KNET_TIMEOUT_SECS") {
            config.timeout_secs = secs.trim().parse().map_err(|_| {
                ClientError::Config(format!("KNET_TIMEOUT_SECS must be whole seconds, got '{secs}'"))
            })?;
        }
        if let Some(bucket) = lookup("KNET_SENSITIVITY") {
            config.sensitivity = Some(bucket).filter(|b| !b.trim().is_empty());
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.server.trim().is_empty() {
            return Err(ClientError::Config("server address is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout must be at least one second".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connector(&self) -> ServerConnector {
        match self.transport {
            TransportKind::Ws => ServerConnector::Ws(WsConnector::new(self.server.clone())),
            TransportKind::Tcp => {
                ServerConnector::Tcp(FramedTcpConnector::new(self.server.clone()))
            }
        }
    }
}

/// The connector a [`ClientConfig`] selects.
#[derive(Debug, Clone)]
pub enum ServerConnector {
    Ws(WsConnector),
    Tcp(FramedTcpConnector),
}

#[async_trait]
impl Connector for ServerConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, ClientError> {
        match self {
            ServerConnector::Ws(connector) => connector.connect().await,
            ServerConnector::Tcp(connector) => connector.connect().await,
        }
    }
}
