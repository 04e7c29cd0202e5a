//! Room lifecycle management for Rendezvous.
//!
//! All room state lives in one [`RoomRegistry`], guarded by a single
//! lock. Every mutation is written through a [`SnapshotSink`] before the
//! lock is released, and a [`Reaper`] task evicts rooms nobody has
//! touched for a while.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: create/join/update/close/get/list/reap
//! - [`Room`]: one matchmaking session (also the persisted record)
//! - [`resolve_name`]: de-duplicates a player name within a room
//! - [`Reaper`] / [`ReaperHandle`]: periodic eviction task
//! - [`SnapshotSink`]: where snapshots go ([`JsonFileSink`], [`NullSink`])
//! - [`Clock`]: where "now" comes from ([`SystemClock`], [`ManualClock`])
//! - [`RegistryConfig`]: limits and timings

mod clock;
mod config;
mod error;
mod names;
mod persist;
mod reaper;
mod registry;
mod room;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RegistryConfig;
pub use error::{PersistError, RoomError};
pub use names::{MAX_SUFFIX_ATTEMPTS, ResolvedName, resolve_name, resolve_name_with};
pub use persist::{JsonFileSink, NullSink, SnapshotSink};
pub use reaper::{Reaper, ReaperHandle};
pub use registry::{JoinedRoom, RoomList, RoomRegistry};
pub use room::{HostEndpoint, Room};

// Re-exported so callers don't need a direct protocol dependency for
// the types that appear in this crate's API.
pub use rendezvous_protocol::{HostInfo, RoomStatus};
