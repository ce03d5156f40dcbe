//! WebSocket transport to the host agent.
//!
//! A [`Connector`] opens one link and hands back a [`TransportLink`]: an
//! outbound queue of text frames, an inbound queue of [`TransportEvent`]s and
//! the handles of the writer and reader tasks.  Dropping every outbound sender
//! makes the writer send a close frame and finish, so awaiting `writer` is how
//! the session layer knows the old socket is gone.  The session layer owns
//! both handles and aborts whichever task outlives the link.
//!
//! The trait exists so session tests can run against an in-process fake
//! instead of a real socket.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, trace};

/// Default depth of the outbound and inbound frame queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Errors raised while opening or running a transport link.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("connecting to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("connection lost: {0}")]
    Lost(String),
}

/// Something that happened on the inbound side of a link.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Text(String),
    /// A binary frame arrived; only its length is kept.
    Binary(usize),
    /// The peer closed the connection cleanly.
    Closed,
    /// The connection failed.
    Error(String),
}

/// An open link.  See the module docs for the shutdown contract.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<TransportEvent>,
    pub writer: JoinHandle<()>,
    pub reader: JoinHandle<()>,
}

/// Opens transport links to a URL.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError>;
}

/// [`Connector`] speaking WebSocket via `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    queue_capacity: usize,
}

impl WsConnector {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
        }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
        let (stream, _response) = connect_async(url).await.map_err(|e| TransportError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        debug!("websocket open to {url}");

        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<String>(self.queue_capacity);
        let (in_tx, in_rx) = mpsc::channel::<TransportEvent>(self.queue_capacity);

        // Writer: drains the outbound queue, then closes the socket.
        let writer_url = url.to_string();
        let writer = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                    debug!("websocket write to {writer_url} failed: {e}");
                    break;
                }
            }
            if let Err(e) = sink.close().await {
                trace!("websocket close to {writer_url}: {e}");
            }
        });

        // Reader: forwards frames until the socket ends or nobody listens.
        let reader = tokio::spawn(async move {
            loop {
                let event = match source.next().await {
                    Some(Ok(WsMessage::Text(text))) => TransportEvent::Text(text),
                    Some(Ok(WsMessage::Binary(data))) => TransportEvent::Binary(data.len()),
                    Some(Ok(WsMessage::Close(_))) | None => {
                        let _ = in_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                    // Ping/Pong are answered by tungstenite itself.
                    Some(Ok(_)) => continue,
                    Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                        let _ = in_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                    Some(Err(e)) => {
                        let _ = in_tx.send(TransportEvent::Error(e.to_string())).await;
                        break;
                    }
                };
                if in_tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(TransportLink {
            outbound: out_tx,
            inbound: in_rx,
            writer,
            reader,
        })
    }
}
