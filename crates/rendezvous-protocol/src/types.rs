//! Core protocol types for the Rendezvous wire format.
//!
//! Every frame on a connection is an [`Envelope`]. Clients put a
//! [`Request`] inside; the server answers with a [`Response`] carrying
//! the same `seq` so the client can pair them up.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Port a host listens on when the client doesn't say otherwise.
pub const DEFAULT_HOST_PORT: u16 = 5555;

fn default_host_port() -> u16 {
    DEFAULT_HOST_PORT
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a room.
///
/// ```text
/// waiting ──(room fills up)──→ in_progress ──(host reports)──→ completed
/// ```
///
/// The derived `Ord` follows declaration order, so
/// `Waiting < InProgress < Completed`, which is the order statuses are
/// expected to move in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Room exists and is accepting players.
    Waiting,
    /// Room reached capacity; the peers are playing.
    InProgress,
    /// The game has ended. The room lingers until closed or reaped.
    Completed,
}

impl RoomStatus {
    /// Returns `true` if players may still join.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if moving to `target` doesn't go backwards.
    ///
    /// Staying in the same status counts as forward.
    pub fn is_forward_to(self, target: Self) -> bool {
        target >= self
    }

    /// The wire spelling of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(ProtocolError::UnknownStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Host and room data
// ---------------------------------------------------------------------------

/// How to reach the player who created a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// The host's display name.
    pub name: String,
    /// Address the host bound locally (LAN address), as reported by the
    /// host itself. May be absent.
    pub ip: Option<String>,
    /// Port the host is listening on.
    pub port: u16,
    /// Address the server observed the host connecting from.
    pub public_ip: String,
}

/// A room as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_code: String,
    pub host: HostInfo,
    pub players: Vec<String>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub max_players: usize,
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// Client → Server operations.
///
/// Internally tagged: `{ "type": "JoinRoom", "room_code": "ABCD", ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Open a new room under `room_code` with the sender as host.
    CreateRoom {
        room_code: String,
        player_name: String,
        #[serde(default)]
        host_ip: Option<String>,
        #[serde(default = "default_host_port")]
        host_port: u16,
    },

    /// Join an existing room as the second player.
    JoinRoom {
        room_code: String,
        player_name: String,
    },

    /// Overwrite a room's status. `status` is the wire spelling, parsed
    /// with [`RoomStatus::from_str`].
    UpdateRoom { room_code: String, status: String },

    /// Remove a room.
    CloseRoom { room_code: String },

    /// Fetch one room.
    GetRoom { room_code: String },

    /// Fetch every live room.
    ListRooms,

    /// Liveness check.
    Health,

    /// Echo back the address the server sees for this client.
    TestConnection {
        #[serde(default)]
        player_name: Option<String>,
    },
}

impl Request {
    /// Short name of the operation, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "CreateRoom",
            Self::JoinRoom { .. } => "JoinRoom",
            Self::UpdateRoom { .. } => "UpdateRoom",
            Self::CloseRoom { .. } => "CloseRoom",
            Self::GetRoom { .. } => "GetRoom",
            Self::ListRooms => "ListRooms",
            Self::Health => "Health",
            Self::TestConnection { .. } => "TestConnection",
        }
    }
}

/// Server → Client results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// The room was created.
    RoomCreated { room_code: String },

    /// The sender joined a room. Carries everything needed to dial the
    /// host directly. `player_name` is the name actually recorded, which
    /// differs from the requested one when `name_changed` is set.
    RoomJoined {
        host_ip: Option<String>,
        host_port: u16,
        public_ip: String,
        players: Vec<String>,
        status: RoomStatus,
        player_name: String,
        name_changed: bool,
    },

    /// The operation succeeded and has nothing to report.
    Ack,

    /// A single room.
    Room { room: RoomSummary },

    /// All live rooms.
    RoomList { rooms: Vec<RoomSummary>, total: usize },

    /// Liveness report.
    Health {
        status: String,
        active_rooms: usize,
        server_time: DateTime<Utc>,
    },

    /// Reply to [`Request::TestConnection`].
    ConnectionTest {
        your_ip: String,
        server_time: DateTime<Utc>,
    },

    /// The request failed. `code` follows HTTP conventions
    /// (400 bad request, 404 not found, 409 conflict, 503 at capacity).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// What's inside an envelope.
///
/// Adjacently tagged:
/// `{ "type": "Request", "data": { "type": "ListRooms" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Request(Request),
    Response(Response),
}

/// The top-level frame. Every message on the wire is an `Envelope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Chosen by the client for requests; echoed back on the response.
    pub seq: u64,

    /// Milliseconds since the sender's connection started.
    #[serde(default)]
    pub timestamp: u64,

    pub payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // RoomStatus
    // =====================================================================

    #[test]
    fn test_status_serializes_as_snake_case() {
        let json = serde_json::to_string(&RoomStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_status_from_str_accepts_wire_spellings() {
        assert_eq!("waiting".parse::<RoomStatus>().unwrap(), RoomStatus::Waiting);
        assert_eq!(
            "in_progress".parse::<RoomStatus>().unwrap(),
            RoomStatus::InProgress
        );
        assert_eq!(
            "completed".parse::<RoomStatus>().unwrap(),
            RoomStatus::Completed
        );
    }

    #[test]
    fn test_status_from_str_rejects_unknown() {
        let err = "InProgress".parse::<RoomStatus>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownStatus(s) if s == "InProgress"));
    }

    #[test]
    fn test_status_display_matches_wire() {
        for status in [
            RoomStatus::Waiting,
            RoomStatus::InProgress,
            RoomStatus::Completed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_status_forward_order() {
        assert!(RoomStatus::Waiting.is_forward_to(RoomStatus::InProgress));
        assert!(RoomStatus::Waiting.is_forward_to(RoomStatus::Completed));
        assert!(RoomStatus::InProgress.is_forward_to(RoomStatus::Completed));
        assert!(RoomStatus::Completed.is_forward_to(RoomStatus::Completed));
        assert!(!RoomStatus::InProgress.is_forward_to(RoomStatus::Waiting));
        assert!(!RoomStatus::Completed.is_forward_to(RoomStatus::InProgress));
    }

    #[test]
    fn test_only_waiting_is_joinable() {
        assert!(RoomStatus::Waiting.is_joinable());
        assert!(!RoomStatus::InProgress.is_joinable());
        assert!(!RoomStatus::Completed.is_joinable());
    }

    // =====================================================================
    // Request shapes
    // =====================================================================

    #[test]
    fn test_create_room_defaults_port_and_host_ip() {
        let req: Request = serde_json::from_str(
            r#"{"type":"CreateRoom","room_code":"ABCD","player_name":"Alice"}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            Request::CreateRoom {
                room_code: "ABCD".into(),
                player_name: "Alice".into(),
                host_ip: None,
                host_port: DEFAULT_HOST_PORT,
            }
        );
    }

    #[test]
    fn test_unit_request_is_just_a_tag() {
        let json = serde_json::to_value(Request::ListRooms).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "ListRooms" }));
    }

    #[test]
    fn test_request_kind() {
        let req = Request::JoinRoom {
            room_code: "X".into(),
            player_name: "Bob".into(),
        };
        assert_eq!(req.kind(), "JoinRoom");
    }

    // =====================================================================
    // Response shapes
    // =====================================================================

    #[test]
    fn test_room_joined_json_format() {
        let resp = Response::RoomJoined {
            host_ip: Some("192.168.1.10".into()),
            host_port: 5555,
            public_ip: "203.0.113.7".into(),
            players: vec!["Alice".into(), "Alice_1".into()],
            status: RoomStatus::InProgress,
            player_name: "Alice_1".into(),
            name_changed: true,
        };
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["type"], "RoomJoined");
        assert_eq!(json["host_port"], 5555);
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["player_name"], "Alice_1");
        assert_eq!(json["name_changed"], true);
        assert_eq!(json["players"][1], "Alice_1");
    }

    #[test]
    fn test_error_json_format() {
        let resp = Response::Error {
            code: 404,
            message: "room ABCD not found".into(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 404);
    }

    // =====================================================================
    // Envelope
    // =====================================================================

    #[test]
    fn test_envelope_is_adjacently_tagged() {
        let env = Envelope {
            seq: 9,
            timestamp: 120,
            payload: Payload::Response(Response::Ack),
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["seq"], 9);
        assert_eq!(json["payload"]["type"], "Response");
        assert_eq!(json["payload"]["data"]["type"], "Ack");
    }

    #[test]
    fn test_envelope_timestamp_defaults_to_zero() {
        let env: Envelope = serde_json::from_str(
            r#"{"seq":1,"payload":{"type":"Request","data":{"type":"Health"}}}"#,
        )
        .unwrap();
        assert_eq!(env.timestamp, 0);
        assert_eq!(env.payload, Payload::Request(Request::Health));
    }
}
