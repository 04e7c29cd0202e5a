//! Error types for the room layer.

use rendezvous_protocol::RoomStatus;

/// Outcomes of registry operations other than success.
///
/// These are expected results, not faults: every caller is expected to
/// handle each of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The registry already holds the configured maximum number of rooms.
    #[error("server at maximum capacity ({0} rooms)")]
    CapacityExceeded(usize),

    /// Another live room already uses this code.
    #[error("room code {0} already exists")]
    CodeConflict(String),

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(String),

    /// The room is past `waiting` and no longer takes players.
    #[error("room {code} is not accepting players (status {status})")]
    NotAcceptingPlayers { code: String, status: RoomStatus },

    /// Every player slot is taken.
    #[error("room {0} is full")]
    RoomFull(String),

    /// A status update tried to go backwards while strict transitions
    /// are enabled.
    #[error("room {code} cannot move from {from} to {to}")]
    InvalidTransition {
        code: String,
        from: RoomStatus,
        to: RoomStatus,
    },
}

/// Failures writing or reading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Filesystem trouble (permissions, disk full, rename failed).
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot couldn't be encoded, or the file on disk isn't a
    /// valid snapshot.
    #[error("snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}
