//! # Rendezvous
//!
//! Matchmaking server for two-player peer-to-peer games.
//!
//! A host opens a room under a short code, a second player joins with
//! that code and gets back everything needed to dial the host directly.
//! The server only brokers the meeting; game traffic never passes
//! through it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rendezvous::prelude::*;
//!
//! # async fn start() -> Result<(), RendezvousError> {
//! let registry = Arc::new(RoomRegistry::new(
//!     RegistryConfig::default(),
//!     Arc::new(NullSink),
//!     Arc::new(SystemClock),
//! ));
//! let server = RendezvousServer::builder()
//!     .bind("0.0.0.0:8000")
//!     .build(registry)
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, RoomsConfig, ServerConfig};
pub use error::RendezvousError;
pub use server::{
    DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_IDLE_TIMEOUT, RendezvousServer,
    RendezvousServerBuilder,
};

/// Everything needed to embed a server.
pub mod prelude {
    pub use crate::{
        ConfigError, RendezvousError, RendezvousServer,
        RendezvousServerBuilder, ServerConfig,
    };
    pub use rendezvous_protocol::{
        Codec, Envelope, HostInfo, JsonCodec, Payload, ProtocolError, Request,
        Response, RoomStatus, RoomSummary,
    };
    pub use rendezvous_room::{
        Clock, JsonFileSink, ManualClock, NullSink, Reaper, ReaperHandle,
        RegistryConfig, RoomError, RoomRegistry, SnapshotSink, SystemClock,
    };
}
