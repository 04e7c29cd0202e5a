//! `RendezvousServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → registry.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rendezvous_protocol::JsonCodec;
use rendezvous_room::RoomRegistry;
use rendezvous_transport::{
    PendingConnection, PendingWebSocket, Transport, WebSocketTransport,
};

use crate::RendezvousError;
use crate::handler::handle_connection;

/// Default for [`RendezvousServerBuilder::idle_timeout`].
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default for [`RendezvousServerBuilder::handshake_timeout`].
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state handed to every connection task.
pub(crate) struct ServerState {
    pub(crate) registry: Arc<RoomRegistry>,
    pub(crate) codec: JsonCodec,
    pub(crate) idle_timeout: Duration,
    pub(crate) handshake_timeout: Duration,
}

/// Builder for configuring and starting a Rendezvous server.
///
/// # Example
///
/// ```rust,ignore
/// let server = RendezvousServer::builder()
///     .bind("0.0.0.0:8000")
///     .build(registry)
///     .await?;
/// server.run().await
/// ```
pub struct RendezvousServerBuilder {
    bind_addr: String,
    idle_timeout: Duration,
    handshake_timeout: Duration,
}

impl RendezvousServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a connection may go without sending anything.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets how long a new peer has to complete the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener. Connections are served from `registry`.
    pub async fn build(
        self,
        registry: Arc<RoomRegistry>,
    ) -> Result<RendezvousServer, RendezvousError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
            handshake_timeout: self.handshake_timeout,
        });

        Ok(RendezvousServer { transport, state })
    }
}

impl Default for RendezvousServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Rendezvous server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct RendezvousServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl RendezvousServer {
    /// Creates a new builder.
    pub fn builder() -> RendezvousServerBuilder {
        RendezvousServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RendezvousError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RendezvousError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Connections already being served keep their tasks; only new
    /// accepts stop.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), RendezvousError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Rendezvous server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("server shutting down");
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(serve(pending, state));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }
    }
}

/// Completes the upgrade for one peer, then serves it.
///
/// Runs on the connection's own task so a slow or silent peer only
/// holds up itself.
async fn serve(pending: PendingWebSocket, state: Arc<ServerState>) {
    let addr = pending.peer_addr();
    let conn = match tokio::time::timeout(
        state.handshake_timeout,
        pending.upgrade(),
    )
    .await
    {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            tracing::debug!(%addr, error = %e, "handshake failed");
            return;
        }
        Err(_) => {
            tracing::debug!(%addr, "handshake timed out");
            return;
        }
    };

    if let Err(e) = handle_connection(conn, state).await {
        tracing::debug!(error = %e, "connection ended with error");
    }
}
