//! Network infrastructure for the client application.
//!
//! - `transport` opens WebSocket links to the host agent.
//! - `connection_manager` owns the single live session on top of a link:
//!   state machine, smoothing tick, inbound pump.

pub mod connection_manager;
pub mod transport;

pub use connection_manager::{ConnectionManager, SessionConfig, SessionState, SessionStatus};
pub use transport::{Connector, TransportError, TransportEvent, TransportLink, WsConnector};
