//! Client error types.
//!
//! [`ClientError`] is the unified error for every user action. Each variant
//! is terminal for the action that raised it only; committed session state is
//! never rolled back or partially applied.

use std::time::Duration;

use knet_core::CoreError;

/// Errors surfaced by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A search was submitted with nothing but whitespace.
    #[error("please enter at least one {field}")]
    EmptyInput { field: &'static str },

    /// A reply could not be decoded where JSON or a typed fragment was
    /// expected.
    #[error("could not decode server reply: {0}")]
    ProtocolDecode(String),

    /// The channel closed or failed before a reply arrived.
    #[error("connection error: {0}")]
    Connection(String),

    /// No reply within the configured timeout.
    #[error("no reply from server within {0:?}")]
    Timeout(Duration),

    /// The action needs a selected project.
    #[error("no project selected")]
    NoProject,

    /// The action needs search results to select from.
    #[error("no search results to select from")]
    NoResults,

    /// The live graph rejected the operation.
    #[error(transparent)]
    Graph(#[from] CoreError),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Connection-class failures: closed channel, transport error, timeout.
    pub fn is_connection(&self) -> bool {
        matches!(self, ClientError::Connection(_) | ClientError::Timeout(_))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::ProtocolDecode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Connection(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Connection(err.to_string())
    }
}
