//! The room registry: the single owner of all room state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rendezvous_protocol::{HostInfo, RoomStatus};

use crate::names::resolve_name;
use crate::{
    Clock, HostEndpoint, RegistryConfig, Room, RoomError, SnapshotSink,
};

/// Result of a successful [`RoomRegistry::join_room`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    /// How to reach the host.
    pub host: HostInfo,
    /// Roster after the join.
    pub players: Vec<String>,
    /// Status after the join (`in_progress` if this join filled the room).
    pub status: RoomStatus,
    /// The name actually recorded for the joiner.
    pub player_name: String,
    /// `true` if `player_name` differs from the requested name.
    pub name_changed: bool,
}

/// Result of [`RoomRegistry::list_rooms`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomList {
    /// Every live room, ordered by code.
    pub rooms: Vec<Room>,
    pub total: usize,
}

/// Authoritative map from room code to room.
///
/// Every operation takes the same lock, so operations are linearizable:
/// nobody ever observes a half-applied mutation. Each successful
/// mutation hands the whole map to the [`SnapshotSink`] *before* the
/// lock is released, so the snapshot always reflects the last completed
/// mutation.
///
/// A failed snapshot write is logged and otherwise ignored; the
/// in-memory state stays authoritative until restart.
///
/// Share it as `Arc<RoomRegistry>` between request handlers and the
/// [`Reaper`](crate::Reaper).
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
    config: RegistryConfig,
    sink: Arc<dyn SnapshotSink>,
    clock: Arc<dyn Clock>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new(
        config: RegistryConfig,
        sink: Arc<dyn SnapshotSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::restore(config, sink, clock, HashMap::new())
    }

    /// Creates a registry pre-populated with `rooms`, typically the
    /// output of [`SnapshotSink::load`].
    pub fn restore(
        config: RegistryConfig,
        sink: Arc<dyn SnapshotSink>,
        clock: Arc<dyn Clock>,
        rooms: HashMap<String, Room>,
    ) -> Self {
        if rooms.len() > config.max_rooms {
            tracing::warn!(
                rooms = rooms.len(),
                max_rooms = config.max_rooms,
                "restored snapshot exceeds max_rooms; new rooms refused until some close"
            );
        }
        Self {
            rooms: Mutex::new(rooms),
            config,
            sink,
            clock,
        }
    }

    /// The configuration this registry enforces.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The clock used to stamp rooms.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.lock().len()
    }

    /// Opens a new `waiting` room with `player_name` as host and sole
    /// player. Returns the room code.
    ///
    /// # Errors
    /// - [`RoomError::CapacityExceeded`]: already at `max_rooms`
    /// - [`RoomError::CodeConflict`]: `code` is in use; the existing room
    ///   is left alone
    pub fn create_room(
        &self,
        code: &str,
        player_name: &str,
        host: HostEndpoint,
    ) -> Result<String, RoomError> {
        let mut rooms = self.lock();

        if rooms.len() >= self.config.max_rooms {
            return Err(RoomError::CapacityExceeded(self.config.max_rooms));
        }
        if rooms.contains_key(code) {
            return Err(RoomError::CodeConflict(code.to_string()));
        }

        let room = Room::new(
            code.to_string(),
            host.into_host_info(player_name.to_string()),
            self.config.max_players,
            self.clock.now(),
        );
        rooms.insert(code.to_string(), room);
        self.persist(&rooms);

        tracing::info!(room_code = %code, host = %player_name, "room created");
        Ok(code.to_string())
    }

    /// Adds a player to a `waiting` room.
    ///
    /// The requested name is de-duplicated against the roster (see
    /// [`resolve_name`]). If the join fills the room, its status moves
    /// to `in_progress` in the same step.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`]
    /// - [`RoomError::RoomFull`]: every slot is taken, whatever the status
    /// - [`RoomError::NotAcceptingPlayers`]: status isn't `waiting`
    pub fn join_room(
        &self,
        code: &str,
        player_name: &str,
    ) -> Result<JoinedRoom, RoomError> {
        let mut rooms = self.lock();
        let now = self.clock.now();

        let room = rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;

        // A full room reports RoomFull even though filling it also moved
        // it past `waiting`.
        if room.is_full() {
            return Err(RoomError::RoomFull(code.to_string()));
        }
        if !room.status.is_joinable() {
            return Err(RoomError::NotAcceptingPlayers {
                code: code.to_string(),
                status: room.status,
            });
        }

        let resolved = resolve_name(player_name, &room.players);
        if resolved.changed {
            tracing::info!(
                room_code = %code,
                requested = %player_name,
                assigned = %resolved.name,
                "player name already in use, renamed"
            );
        }

        room.players.push(resolved.name.clone());
        room.last_activity = now;
        if room.is_full() {
            room.status = RoomStatus::InProgress;
        }

        let joined = JoinedRoom {
            host: room.host.clone(),
            players: room.players.clone(),
            status: room.status,
            player_name: resolved.name,
            name_changed: resolved.changed,
        };
        self.persist(&rooms);

        tracing::info!(
            room_code = %code,
            player = %joined.player_name,
            players = joined.players.len(),
            status = %joined.status,
            "player joined"
        );
        Ok(joined)
    }

    /// Overwrites a room's status and stamps its activity.
    ///
    /// Backward moves are allowed unless
    /// [`RegistryConfig::strict_status_transitions`] is set.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`]
    /// - [`RoomError::InvalidTransition`]: strict mode and `status` is
    ///   behind the current one
    pub fn update_room_status(
        &self,
        code: &str,
        status: RoomStatus,
    ) -> Result<(), RoomError> {
        let mut rooms = self.lock();
        let now = self.clock.now();

        let room = rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;

        let previous = room.status;
        if self.config.strict_status_transitions
            && !previous.is_forward_to(status)
        {
            return Err(RoomError::InvalidTransition {
                code: code.to_string(),
                from: previous,
                to: status,
            });
        }
        if !previous.is_forward_to(status) {
            tracing::warn!(
                room_code = %code,
                from = %previous,
                to = %status,
                "room status moved backwards"
            );
        }

        room.status = status;
        room.last_activity = now;
        self.persist(&rooms);

        tracing::info!(room_code = %code, from = %previous, to = %status, "room status updated");
        Ok(())
    }

    /// Removes a room regardless of its status.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`]
    pub fn close_room(&self, code: &str) -> Result<(), RoomError> {
        let mut rooms = self.lock();
        if rooms.remove(code).is_none() {
            return Err(RoomError::NotFound(code.to_string()));
        }
        self.persist(&rooms);

        tracing::info!(room_code = %code, "room closed");
        Ok(())
    }

    /// Returns a copy of one room.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`]
    pub fn get_room(&self, code: &str) -> Result<Room, RoomError> {
        self.lock()
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.to_string()))
    }

    /// Returns copies of every live room, ordered by code.
    pub fn list_rooms(&self) -> RoomList {
        let mut rooms: Vec<Room> = self.lock().values().cloned().collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code));
        let total = rooms.len();
        RoomList { rooms, total }
    }

    /// Removes every room idle for strictly longer than `timeout` as of
    /// `now`. Persists once if anything was removed. Returns how many
    /// rooms were removed.
    pub fn reap_expired(&self, now: DateTime<Utc>, timeout: Duration) -> usize {
        let mut rooms = self.lock();
        let before = rooms.len();

        rooms.retain(|code, room| {
            let expired = room.is_expired(now, timeout);
            if expired {
                tracing::info!(
                    room_code = %code,
                    status = %room.status,
                    last_activity = %room.last_activity,
                    "reaped inactive room"
                );
            }
            !expired
        });

        let removed = before - rooms.len();
        if removed > 0 {
            self.persist(&rooms);
        }
        removed
    }

    /// Takes the room lock.
    ///
    /// A poisoned lock is recovered. Mutations finish before the sink or
    /// logging runs, so the map is consistent either way.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Room>> {
        self.rooms.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Writes a snapshot. Called with the lock held.
    fn persist(&self, rooms: &HashMap<String, Room>) {
        if let Err(e) = self.sink.save(rooms) {
            tracing::error!(
                error = %e,
                rooms = rooms.len(),
                "failed to persist room snapshot; keeping in-memory state"
            );
        }
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("rooms", &self.room_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
