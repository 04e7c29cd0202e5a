//! Unified error type for the Rendezvous server.

use rendezvous_protocol::ProtocolError;
use rendezvous_room::{PersistError, RoomError};
use rendezvous_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RendezvousError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid request).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry operation was refused.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Loading or writing the room snapshot failed.
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The configuration is unreadable or out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A registry call running on the blocking pool panicked.
    #[error("registry task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RendezvousError {
    /// The `code` sent to the client in an `Error` response.
    ///
    /// Follows HTTP conventions: 400 for anything wrong with the request
    /// itself, 404/409/503 for registry refusals, 500 for the rest.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Protocol(_) => 400,
            Self::Room(RoomError::NotFound(_)) => 404,
            Self::Room(
                RoomError::CodeConflict(_)
                | RoomError::NotAcceptingPlayers { .. }
                | RoomError::RoomFull(_)
                | RoomError::InvalidTransition { .. },
            ) => 409,
            Self::Room(RoomError::CapacityExceeded(_)) => 503,
            Self::Transport(_)
            | Self::Persist(_)
            | Self::Config(_)
            | Self::Task(_) => 500,
        }
    }
}
