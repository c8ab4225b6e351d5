//! In-memory snapshot storage.
//!
//! Used by tests and by `--ephemeral` play, where nothing should touch disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{GameError, Result};
use crate::progression::ProgressionState;
use crate::storage::SnapshotStore;

/// In-memory snapshot store.
///
/// Can be switched into a failing mode to exercise the persistence-failure
/// paths of its callers.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<String, ProgressionState>>,
    failing: AtomicBool,
    saves: AtomicUsize,
}

impl MemorySnapshotStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `state` under `key`.
    pub fn with_snapshot(key: &str, state: ProgressionState) -> Self {
        let store = Self::new();
        store
            .snapshots
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), state);
        store
    }

    /// Make every subsequent load and save fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check_failing(&self, op: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GameError::storage(
                format!("memory://{}", op),
                std::io::Error::other("simulated storage failure"),
            ));
        }
        Ok(())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<ProgressionState>> {
        self.check_failing("load")?;
        let snapshots = self.snapshots.read().unwrap_or_else(|e| e.into_inner());
        Ok(snapshots.get(key).cloned())
    }

    fn save(&self, key: &str, state: &ProgressionState) -> Result<()> {
        self.check_failing("save")?;
        let mut snapshots = self.snapshots.write().unwrap_or_else(|e| e.into_inner());
        snapshots.insert(key.to_string(), state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check_failing("delete")?;
        let mut snapshots = self.snapshots.write().unwrap_or_else(|e| e.into_inner());
        snapshots.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::test_snapshot_store_roundtrip;
    use crate::storage::PROGRESSION_KEY;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySnapshotStore::new();
        test_snapshot_store_roundtrip(&store);
    }

    #[test]
    fn test_with_snapshot() {
        let state = ProgressionState {
            level: 3,
            ..Default::default()
        };
        let store = MemorySnapshotStore::with_snapshot(PROGRESSION_KEY, state.clone());
        assert_eq!(store.load(PROGRESSION_KEY).unwrap(), Some(state));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_failing_mode() {
        let store = MemorySnapshotStore::new();
        store.set_failing(true);

        assert!(store.load(PROGRESSION_KEY).is_err());
        assert!(store
            .save(PROGRESSION_KEY, &ProgressionState::default())
            .unwrap_err()
            .is_persistence());
        assert_eq!(store.save_count(), 0);

        store.set_failing(false);
        store
            .save(PROGRESSION_KEY, &ProgressionState::default())
            .unwrap();
        assert_eq!(store.save_count(), 1);
    }
}
