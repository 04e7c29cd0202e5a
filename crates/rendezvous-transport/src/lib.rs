//! Transport abstraction layer for Rendezvous.
//!
//! Provides the [`Transport`], [`PendingConnection`] and [`Connection`]
//! traits the server's accept loop is written against, plus a WebSocket
//! implementation.
//!
//! Accepting is split in two. [`Transport::accept`] only takes the TCP
//! connection; the protocol handshake happens in
//! [`PendingConnection::upgrade`], which the caller can run on its own
//! task and under its own timeout.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod forwarded;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use forwarded::observed_ip;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted connection that hasn't finished its handshake.
    type Pending: PendingConnection<
            Connection = Self::Connection,
            Error = Self::Error,
        >;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming connection.
    ///
    /// Returns as soon as the peer is connected; nothing is read from it
    /// yet, so a silent peer can't hold up the next accept.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;

    /// The address the listener is actually bound to.
    ///
    /// Useful when binding to port 0 and letting the OS pick.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// A connected peer whose handshake hasn't run yet.
pub trait PendingConnection: Send + 'static {
    /// The connection produced by a successful handshake.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// The TCP peer address.
    fn peer_addr(&self) -> SocketAddr;

    /// Runs the handshake. Waits on the peer with no time limit.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive bytes.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The client's address as the server sees it.
    ///
    /// Proxy headers on the opening request take precedence over the
    /// TCP peer address; see [`observed_ip`].
    fn remote_ip(&self) -> IpAddr;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_equality() {
        assert_eq!(ConnectionId::new(42), ConnectionId::new(42));
        assert_ne!(ConnectionId::new(42), ConnectionId::new(43));
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }
}
