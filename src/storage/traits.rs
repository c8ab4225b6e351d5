//! Snapshot storage traits for wordcall.
//!
//! This module defines the `SnapshotStore` trait, the opaque key-value
//! collaborator that progression snapshots are loaded from and saved to.

use std::sync::Arc;

use crate::error::Result;
use crate::progression::ProgressionState;

/// Fixed key of the single progression record per installation.
pub const PROGRESSION_KEY: &str = "user-data";

/// Trait for snapshot storage backends.
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing was saved yet.
    fn load(&self, key: &str) -> Result<Option<ProgressionState>>;

    /// Save a snapshot under `key`, replacing any previous value.
    fn save(&self, key: &str, state: &ProgressionState) -> Result<()>;

    /// Delete the snapshot under `key`.
    ///
    /// Returns `Ok(())` even if nothing was stored.
    fn delete(&self, key: &str) -> Result<()>;

    /// Check if a snapshot exists.
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.load(key)?.is_some())
    }
}

/// Lets an `Arc<T>` be handed to the progression store while a test keeps
/// its own handle for inspection.
impl<T: SnapshotStore + ?Sized> SnapshotStore for Arc<T> {
    fn load(&self, key: &str) -> Result<Option<ProgressionState>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, state: &ProgressionState) -> Result<()> {
        (**self).save(key, state)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}
