//! Generation-tagged request channel.
//!
//! Every dispatched request gets the next [`Generation`]. The exchange runs on
//! its own task and posts a [`Reply`] carrying that generation. Dispatching
//! again aborts the previous task, which drops its transport and closes the
//! connection; a reply the old task managed to post before the abort is still
//! delivered, tagged with the old generation, and the session discards it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ClientError;
use crate::transport::Connector;

/// Monotonic request counter. Zero means "nothing dispatched yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The outcome of one request.
#[derive(Debug)]
pub struct Reply {
    pub generation: Generation,
    pub body: Result<String, ClientError>,
}

/// At most one outstanding request at a time.
pub struct RequestChannel<C: Connector> {
    connector: Arc<C>,
    timeout: Duration,
    generation: Generation,
    in_flight: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Reply>,
    rx: mpsc::UnboundedReceiver<Reply>,
}

impl<C: Connector> RequestChannel<C> {
    pub fn new(connector: C, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            connector: Arc::new(connector),
            timeout,
            generation: Generation::default(),
            in_flight: None,
            tx,
            rx,
        }
    }

    /// The generation of the most recent dispatch or cancel.
    pub fn current(&self) -> Generation {
        self.generation
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `line`, superseding any outstanding request.
    pub fn dispatch(&mut self, line: String) -> Generation {
        self.abort_in_flight();
        self.generation = self.generation.next();
        let generation = self.generation;

        let connector = Arc::clone(&self.connector);
        let timeout = self.timeout;
        let tx = self.tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let body = match tokio::time::timeout(timeout, exchange(&*connector, &line)).await
            {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout(timeout)),
            };
            // The receiver lives as long as the channel; a send error only
            // means the channel itself was dropped.
            let _ = tx.send(Reply { generation, body });
        }));
        debug!(%generation, "request dispatched");
        generation
    }

    /// Closes the outstanding request. Replies already queued become stale.
    pub fn cancel(&mut self) -> Generation {
        self.abort_in_flight();
        self.generation = self.generation.next();
        debug!(generation = %self.generation, "request cancelled");
        self.generation
    }

    /// Waits for the next reply, stale or not.
    pub async fn next_reply(&mut self) -> Option<Reply> {
        self.rx.recv().await
    }

    /// A reply that has already arrived, if any.
    pub fn try_next_reply(&mut self) -> Option<Reply> {
        self.rx.try_recv().ok()
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

impl<C: Connector> Drop for RequestChannel<C> {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}

async fn exchange<C: Connector + ?Sized>(connector: &C, line: &str) -> Result<String, ClientError> {
    let mut transport = connector.connect().await?;
    transport.send_text(line).await?;
    let body = transport.recv_text().await?;
    if let Err(err) = transport.close().await {
        debug!(error = %err, "close after reply failed");
    }
    Ok(body)
}
