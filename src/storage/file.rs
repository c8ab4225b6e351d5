//! File-based snapshot storage for wordcall.
//!
//! Snapshots are stored as JSON files in `~/.wordcall/progress/`.
//! Writes go through a temp file + rename and are serialized per store, so
//! two saves never interleave on disk.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::progress_dir;
use crate::error::{GameError, Result};
use crate::progression::ProgressionState;
use crate::storage::SnapshotStore;
use crate::util::{read_to_string_limited, write_atomic};

/// File-based snapshot storage.
#[derive(Debug)]
pub struct FileSnapshotStore {
    /// Directory where snapshot files are stored.
    dir: PathBuf,
    /// Held for the duration of each write.
    write_lock: Mutex<()>,
}

impl FileSnapshotStore {
    /// Create a store in the default directory.
    ///
    /// Uses `~/.wordcall/progress/` or `$WORDCALL_HOME/progress/`.
    pub fn new() -> Result<Self> {
        let dir = progress_dir().ok_or_else(|| {
            GameError::config("Could not determine progress directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory, creating it if needed.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| GameError::storage(&dir, e))?;
        }

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Get the path for a snapshot file.
    fn snapshot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<ProgressionState>> {
        let path = self.snapshot_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let content = read_to_string_limited(&path)?;
        let state: ProgressionState = serde_json::from_str(&content)?;

        Ok(Some(state))
    }

    fn save(&self, key: &str, state: &ProgressionState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        write_atomic(&self.snapshot_path(key), json.as_bytes())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.snapshot_path(key);

        if path.exists() {
            fs::remove_file(&path).map_err(|e| GameError::storage(&path, e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::test_snapshot_store_roundtrip;
    use crate::storage::PROGRESSION_KEY;
    use tempfile::TempDir;

    fn create_test_store() -> (FileSnapshotStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::with_dir(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_file_snapshot_store_roundtrip() {
        let (store, _dir) = create_test_store();
        test_snapshot_store_roundtrip(&store);
    }

    #[test]
    fn test_with_dir_creates_directory() {
        let dir = TempDir::new().unwrap();
        let progress_path = dir.path().join("progress");

        assert!(!progress_path.exists());
        let _store = FileSnapshotStore::with_dir(&progress_path).unwrap();
        assert!(progress_path.is_dir());
    }

    #[test]
    fn test_snapshot_path() {
        let (store, _dir) = create_test_store();
        assert!(store
            .snapshot_path(PROGRESSION_KEY)
            .ends_with("user-data.json"));
    }

    #[test]
    fn test_fresh_store_sees_previous_save() {
        let dir = TempDir::new().unwrap();
        let mut state = ProgressionState {
            level: 4,
            xp: 15,
            ..Default::default()
        };
        state.unlocked_characters.insert("fox".to_string());

        FileSnapshotStore::with_dir(dir.path())
            .unwrap()
            .save(PROGRESSION_KEY, &state)
            .unwrap();

        let reopened = FileSnapshotStore::with_dir(dir.path()).unwrap();
        assert_eq!(reopened.load(PROGRESSION_KEY).unwrap(), Some(state));
    }

    #[test]
    fn test_load_corrupt_snapshot_is_error() {
        let (store, dir) = create_test_store();
        fs::write(dir.path().join("user-data.json"), "not json").unwrap();

        let err = store.load(PROGRESSION_KEY).unwrap_err();
        assert!(matches!(err, GameError::Serde { .. }));
    }

    #[test]
    fn test_load_accepts_missing_unlock_arrays() {
        let (store, dir) = create_test_store();
        fs::write(
            dir.path().join("user-data.json"),
            r#"{"level": 2, "xp": 40}"#,
        )
        .unwrap();

        let state = store.load(PROGRESSION_KEY).unwrap().unwrap();
        assert_eq!(state.level, 2);
        assert_eq!(state.xp, 40);
        assert!(state.unlocked_accessories.is_empty());
    }

    #[test]
    fn test_concurrent_saves_leave_valid_json() {
        use std::sync::Arc;
        use std::thread;

        let (store, _dir) = create_test_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let state = ProgressionState {
                        level: i + 1,
                        ..Default::default()
                    };
                    store.save(PROGRESSION_KEY, &state).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let state = store.load(PROGRESSION_KEY).unwrap().unwrap();
        assert!((1..=8).contains(&state.level));
    }
}
