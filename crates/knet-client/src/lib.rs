//! Client side of the knowledge-network protocol.
//!
//! Encodes requests into the server's underscore-delimited command lines,
//! ships them over a [`transport::Transport`], tags every request with a
//! generation so superseded replies are dropped, and applies accepted replies
//! to a [`session::Session`] holding the live graph and its filters.

pub mod channel;
pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod session;
pub mod transport;

pub use channel::{Generation, Reply, RequestChannel};
pub use codec::{Expansion, MatchMode, ProjectId, ProjectInfo, Request};
pub use config::{ClientConfig, ServerConnector, TransportKind};
pub use controller::Controller;
pub use error::ClientError;
pub use session::{Event, PendingAction, Session, UiState};
pub use transport::{Connector, FramedTcpConnector, Transport, WsConnector};
