//! Durable snapshots of the registry.
//!
//! The registry hands its whole room map to a [`SnapshotSink`] after
//! every mutation. What the sink does with it (file, database, nothing)
//! is up to the implementation.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::{PersistError, Room};

/// Destination for registry snapshots.
pub trait SnapshotSink: Send + Sync {
    /// Persists the full room map, replacing the previous snapshot.
    ///
    /// A failed save must leave the previous snapshot intact.
    fn save(&self, rooms: &HashMap<String, Room>) -> Result<(), PersistError>;

    /// Reads back the last saved snapshot. An absent snapshot is an empty
    /// map, not an error.
    fn load(&self) -> Result<HashMap<String, Room>, PersistError>;
}

/// A sink that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn save(&self, _rooms: &HashMap<String, Room>) -> Result<(), PersistError> {
        Ok(())
    }

    fn load(&self) -> Result<HashMap<String, Room>, PersistError> {
        Ok(HashMap::new())
    }
}

/// Writes snapshots as a JSON object keyed by room code.
///
/// Each save goes to `<path>.tmp`, is fsynced, and is then renamed over
/// `<path>`, so readers only ever see a complete snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut tmp_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("rooms.json"));
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);
        Self { path, tmp_path }
    }

    /// The snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot, falling back to an empty map if it can't be
    /// read.
    ///
    /// An unreadable snapshot is renamed to `<path>.corrupt-<timestamp>`
    /// first, so the next save doesn't overwrite it.
    pub fn load_or_recover(&self) -> HashMap<String, Room> {
        match self.load() {
            Ok(rooms) => rooms,
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "room snapshot unreadable, starting empty"
                );
                match self.quarantine() {
                    Ok(moved_to) => tracing::warn!(
                        path = %moved_to.display(),
                        "kept unreadable snapshot"
                    ),
                    Err(e) => tracing::error!(
                        path = %self.path.display(),
                        error = %e,
                        "failed to move unreadable snapshot aside"
                    ),
                }
                HashMap::new()
            }
        }
    }

    /// Moves the snapshot file aside and returns where it went.
    fn quarantine(&self) -> io::Result<PathBuf> {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("rooms.json"));
        name.push(format!(
            ".corrupt-{}",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
        ));
        let target = self.path.with_file_name(name);
        fs::rename(&self.path, &target)?;
        Ok(target)
    }
}

impl SnapshotSink for JsonFileSink {
    fn save(&self, rooms: &HashMap<String, Room>) -> Result<(), PersistError> {
        // Sorted so successive snapshots diff cleanly.
        let ordered: BTreeMap<&String, &Room> = rooms.iter().collect();
        let bytes = serde_json::to_vec_pretty(&ordered)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        {
            let mut file = File::create(&self.tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&self.tmp_path, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            rooms = rooms.len(),
            "saved room snapshot"
        );
        Ok(())
    }

    fn load(&self) -> Result<HashMap<String, Room>, PersistError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.path.display(),
                    "no room snapshot found, starting empty"
                );
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let stored: BTreeMap<String, Room> = serde_json::from_slice(&bytes)?;
        let rooms: HashMap<String, Room> = stored
            .into_iter()
            .map(|(code, mut room)| {
                // The map key is authoritative.
                room.code.clone_from(&code);
                (code, room)
            })
            .collect();

        tracing::info!(
            path = %self.path.display(),
            rooms = rooms.len(),
            "loaded room snapshot"
        );
        Ok(rooms)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rendezvous_protocol::{HostInfo, RoomStatus};

    use super::*;

    fn room(code: &str) -> Room {
        let now = Utc::now();
        Room {
            code: code.into(),
            host: HostInfo {
                name: "Alice".into(),
                ip: Some("192.168.1.5".into()),
                port: 5555,
                public_ip: "203.0.113.9".into(),
            },
            players: vec!["Alice".into()],
            status: RoomStatus::Waiting,
            created_at: now,
            last_activity: now,
            max_players: 2,
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("rooms.json"));
        assert!(sink.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_restores_rooms() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("rooms.json"));

        let mut rooms = HashMap::new();
        rooms.insert("ABCD".to_string(), room("ABCD"));
        rooms.insert("WXYZ".to_string(), room("WXYZ"));
        sink.save(&rooms).unwrap();

        assert_eq!(sink.load().unwrap(), rooms);
    }

    #[test]
    fn test_save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("rooms.json"));
        sink.save(&HashMap::new()).unwrap();

        assert!(sink.path().exists());
        assert!(!dir.path().join("rooms.json.tmp").exists());
    }

    #[test]
    fn test_snapshot_is_keyed_by_code_with_snake_case_status() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("rooms.json"));
        let mut rooms = HashMap::new();
        let mut r = room("ABCD");
        r.status = RoomStatus::InProgress;
        rooms.insert("ABCD".to_string(), r);
        sink.save(&rooms).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(sink.path()).unwrap()).unwrap();
        assert_eq!(raw["ABCD"]["status"], "in_progress");
        assert_eq!(raw["ABCD"]["host"]["port"], 5555);
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("state/rooms.json"));
        sink.save(&HashMap::new()).unwrap();
        assert!(sink.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileSink::new(&path).load().unwrap_err();
        assert!(matches!(err, PersistError::Format(_)));
    }

    #[test]
    fn test_load_or_recover_sets_corrupt_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.json");
        fs::write(&path, b"{ not json").unwrap();
        let sink = JsonFileSink::new(&path);

        assert!(sink.load_or_recover().is_empty());
        assert!(!path.exists());

        let kept: Vec<PathBuf> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("rooms.json.corrupt-"))
            })
            .collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(fs::read(&kept[0]).unwrap(), b"{ not json");

        // The next save starts a fresh snapshot next to the kept one.
        let mut rooms = HashMap::new();
        rooms.insert("ABCD".to_string(), room("ABCD"));
        sink.save(&rooms).unwrap();
        assert_eq!(sink.load().unwrap(), rooms);
        assert_eq!(fs::read(&kept[0]).unwrap(), b"{ not json");
    }

    #[test]
    fn test_load_or_recover_passes_good_snapshot_through() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("rooms.json"));
        assert!(sink.load_or_recover().is_empty());

        let mut rooms = HashMap::new();
        rooms.insert("ABCD".to_string(), room("ABCD"));
        sink.save(&rooms).unwrap();
        assert_eq!(sink.load_or_recover(), rooms);
    }

    #[test]
    fn test_failed_save_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("rooms.json"));
        let mut rooms = HashMap::new();
        rooms.insert("ABCD".to_string(), room("ABCD"));
        sink.save(&rooms).unwrap();

        // A directory squatting on the temp path makes File::create fail.
        fs::create_dir(dir.path().join("rooms.json.tmp")).unwrap();
        rooms.clear();
        assert!(sink.save(&rooms).is_err());

        assert_eq!(sink.load().unwrap().len(), 1);
    }

    #[test]
    fn test_null_sink_round_trip_is_empty() {
        let mut rooms = HashMap::new();
        rooms.insert("ABCD".to_string(), room("ABCD"));
        NullSink.save(&rooms).unwrap();
        assert!(NullSink.load().unwrap().is_empty());
    }
}
