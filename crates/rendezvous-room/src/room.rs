//! The room record.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rendezvous_protocol::{HostInfo, RoomStatus, RoomSummary};
use serde::{Deserialize, Serialize};

/// Where a host can be reached, as supplied at room creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEndpoint {
    /// LAN address the host bound, if it reported one.
    pub ip: Option<String>,
    pub port: u16,
    /// Address the server observed the host connecting from.
    pub public_ip: String,
}

impl HostEndpoint {
    pub(crate) fn into_host_info(self, name: String) -> HostInfo {
        HostInfo {
            name,
            ip: self.ip,
            port: self.port,
            public_ip: self.public_ip,
        }
    }
}

/// One matchmaking session.
///
/// The registry owns the live copy; everything handed out by
/// [`RoomRegistry`](crate::RoomRegistry) is a clone. This is also the
/// shape written to snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Unique key, chosen by the host.
    pub code: String,
    /// Set once at creation.
    pub host: HostInfo,
    /// Join order. The host is always first.
    pub players: Vec<String>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    /// Stamped on every successful join and status update.
    pub last_activity: DateTime<Utc>,
    pub max_players: usize,
}

impl Room {
    /// A fresh `waiting` room holding only the host.
    pub(crate) fn new(
        code: String,
        host: HostInfo,
        max_players: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            players: vec![host.name.clone()],
            code,
            host,
            status: RoomStatus::Waiting,
            created_at: now,
            last_activity: now,
            max_players,
        }
    }

    /// Returns `true` once every slot is taken.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// Returns `true` if the room has been idle for strictly longer than
    /// `timeout` as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        let timeout = TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.last_activity) > timeout
    }

    /// The client-facing view of this room.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_code: self.code.clone(),
            host: self.host.clone(),
            players: self.players.clone(),
            status: self.status,
            created_at: self.created_at,
            last_activity: self.last_activity,
            max_players: self.max_players,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str) -> HostInfo {
        HostInfo {
            name: name.into(),
            ip: Some("192.168.0.2".into()),
            port: 5555,
            public_ip: "203.0.113.1".into(),
        }
    }

    #[test]
    fn test_new_room_holds_only_the_host() {
        let now = Utc::now();
        let room = Room::new("ABCD".into(), host("Alice"), 2, now);
        assert_eq!(room.players, vec!["Alice".to_string()]);
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.created_at, now);
        assert_eq!(room.last_activity, now);
        assert!(!room.is_full());
    }

    #[test]
    fn test_expiry_is_strictly_greater_than_timeout() {
        let now = Utc::now();
        let room = Room::new("ABCD".into(), host("Alice"), 2, now);
        let timeout = Duration::from_secs(600);

        assert!(!room.is_expired(now + TimeDelta::seconds(600), timeout));
        assert!(room.is_expired(now + TimeDelta::seconds(601), timeout));
    }

    #[test]
    fn test_summary_copies_fields() {
        let room = Room::new("XYZ".into(), host("Alice"), 2, Utc::now());
        let summary = room.summary();
        assert_eq!(summary.room_code, "XYZ");
        assert_eq!(summary.host, room.host);
        assert_eq!(summary.players, room.players);
        assert_eq!(summary.max_players, 2);
    }
}
