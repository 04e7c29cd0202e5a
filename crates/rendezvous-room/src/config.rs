//! Registry configuration.

use std::time::Duration;

/// Limits and timings for a [`RoomRegistry`](crate::RoomRegistry).
///
/// Fixed at process start; the registry never changes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum number of live rooms.
    pub max_rooms: usize,

    /// Players per room. The room starts once this many have joined.
    pub max_players: usize,

    /// A room untouched for longer than this is evicted by the reaper.
    pub room_timeout: Duration,

    /// How often the reaper sweeps.
    pub reap_interval: Duration,

    /// Reject status updates that move backwards
    /// (e.g. `in_progress → waiting`). Off by default: existing clients
    /// rely on being able to reset a room.
    pub strict_status_transitions: bool,
}

impl RegistryConfig {
    pub const DEFAULT_MAX_ROOMS: usize = 1000;
    pub const DEFAULT_MAX_PLAYERS: usize = 2;
    pub const DEFAULT_ROOM_TIMEOUT: Duration = Duration::from_secs(600);
    pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_rooms: Self::DEFAULT_MAX_ROOMS,
            max_players: Self::DEFAULT_MAX_PLAYERS,
            room_timeout: Self::DEFAULT_ROOM_TIMEOUT,
            reap_interval: Self::DEFAULT_REAP_INTERVAL,
            strict_status_transitions: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_config_default() {
        let config = RegistryConfig::default();
        assert_eq!(config.max_rooms, 1000);
        assert_eq!(config.max_players, 2);
        assert_eq!(config.room_timeout, Duration::from_secs(600));
        assert_eq!(config.reap_interval, Duration::from_secs(60));
        assert!(!config.strict_status_transitions);
    }
}
