//! Server configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. `rendezvous.toml` (or the file passed with `--config`)
//! 2. `RENDEZVOUS_*` environment variables
//! 3. command-line flags (applied by the binary)
//!
//! Anything left unset keeps its default.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rendezvous_room::RegistryConfig;
use serde::Deserialize;

/// File read when no `--config` path is given.
pub const DEFAULT_CONFIG_FILE: &str = "rendezvous.toml";

/// Problems loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but couldn't be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file isn't valid TOML for [`ServerConfig`].
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// `listen_addr` isn't a socket address.
    #[error("listen_addr {0:?} is not a valid socket address")]
    InvalidListenAddr(String),

    /// A limit or interval that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub listen_addr: String,
    /// Where the room snapshot is kept.
    pub rooms_file: PathBuf,
    /// Close a connection after this many seconds without a message.
    pub connection_idle_secs: u64,
    /// Drop a new peer that hasn't finished the WebSocket upgrade in
    /// this many seconds.
    pub handshake_timeout_secs: u64,
    pub rooms: RoomsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            rooms_file: PathBuf::from("active_rooms.json"),
            connection_idle_secs: 30,
            handshake_timeout_secs: 10,
            rooms: RoomsConfig::default(),
        }
    }
}

/// Room limits and lifecycle timings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub max_rooms: usize,
    pub max_players: usize,
    pub room_timeout_secs: u64,
    pub reap_interval_secs: u64,
    /// Refuse status updates that move a room backwards.
    pub strict_status_transitions: bool,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        let registry = RegistryConfig::default();
        Self {
            max_rooms: registry.max_rooms,
            max_players: registry.max_players,
            room_timeout_secs: registry.room_timeout.as_secs(),
            reap_interval_secs: registry.reap_interval.as_secs(),
            strict_status_transitions: registry.strict_status_transitions,
        }
    }
}

impl ServerConfig {
    /// Loads the config file, then applies environment overrides.
    ///
    /// With `path` set, the file must exist. Without it,
    /// [`DEFAULT_CONFIG_FILE`] is tried and defaults are used if it's
    /// missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    tracing::info!(
                        "no {DEFAULT_CONFIG_FILE} found, using defaults"
                    );
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parses a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Applies `RENDEZVOUS_*` overrides read through `var`.
    ///
    /// Empty values are ignored. Numbers that don't parse are logged and
    /// ignored.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| var(key).filter(|v| !v.is_empty());

        if let Some(addr) = lookup("RENDEZVOUS_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(file) = lookup("RENDEZVOUS_ROOMS_FILE") {
            self.rooms_file = PathBuf::from(file);
        }
        if let Some(n) = parse_override(&lookup, "RENDEZVOUS_MAX_ROOMS") {
            self.rooms.max_rooms = n;
        }
        if let Some(n) = parse_override(&lookup, "RENDEZVOUS_ROOM_TIMEOUT_SECS") {
            self.rooms.room_timeout_secs = n;
        }
        if let Some(n) = parse_override(&lookup, "RENDEZVOUS_REAP_INTERVAL_SECS") {
            self.rooms.reap_interval_secs = n;
        }
    }

    /// Rejects settings the server can't run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidListenAddr(self.listen_addr.clone()));
        }
        if self.connection_idle_secs == 0 {
            return Err(ConfigError::Zero("connection_idle_secs"));
        }
        if self.handshake_timeout_secs == 0 {
            return Err(ConfigError::Zero("handshake_timeout_secs"));
        }
        if self.rooms.max_rooms == 0 {
            return Err(ConfigError::Zero("rooms.max_rooms"));
        }
        if self.rooms.max_players == 0 {
            return Err(ConfigError::Zero("rooms.max_players"));
        }
        if self.rooms.room_timeout_secs == 0 {
            return Err(ConfigError::Zero("rooms.room_timeout_secs"));
        }
        if self.rooms.reap_interval_secs == 0 {
            return Err(ConfigError::Zero("rooms.reap_interval_secs"));
        }
        if self.rooms.max_players < 2 {
            tracing::warn!(
                max_players = self.rooms.max_players,
                "rooms hold fewer than two players; joins will always fail"
            );
        }
        Ok(())
    }

    /// How long a connection may sit idle.
    pub fn connection_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_idle_secs)
    }

    /// How long a new peer has to finish the upgrade.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// The registry's view of these settings.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_rooms: self.rooms.max_rooms,
            max_players: self.rooms.max_players,
            room_timeout: Duration::from_secs(self.rooms.room_timeout_secs),
            reap_interval: Duration::from_secs(self.rooms.reap_interval_secs),
            strict_status_transitions: self.rooms.strict_status_transitions,
        }
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}
