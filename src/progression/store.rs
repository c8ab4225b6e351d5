//! Process-wide progression service.
//!
//! One `ProgressionStore` is created at startup, loaded once, and shared as
//! `Arc<ProgressionStore>` between the round controller and any other
//! surface. Every mutation is followed by a save; a failed save is logged
//! and the in-memory state stays authoritative.

use std::sync::{Mutex, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{GameError, Result};
use crate::progression::cosmetics::find_accessory;
use crate::progression::state::{ProgressionState, UnlockKind, XpGrant};
use crate::storage::{SnapshotStore, PROGRESSION_KEY};

/// Whether the initial snapshot load has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// `level`/`xp` are not meaningful yet.
    Loading,
    Ready,
}

#[derive(Debug)]
struct Inner {
    status: LoadStatus,
    state: ProgressionState,
    /// Bumped on every mutation; orders saves.
    revision: u64,
}

/// Shared level/XP/unlock store.
pub struct ProgressionStore {
    snapshots: Box<dyn SnapshotStore>,
    inner: RwLock<Inner>,
    /// Revision of the last snapshot written. Holding this lock is what
    /// serializes saves.
    persisted: Mutex<u64>,
}

impl std::fmt::Debug for ProgressionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionStore")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl ProgressionStore {
    /// Create a store in the `Loading` state. Call [`load`](Self::load)
    /// before reading from it.
    pub fn new(snapshots: impl SnapshotStore + 'static) -> Self {
        Self {
            snapshots: Box::new(snapshots),
            inner: RwLock::new(Inner {
                status: LoadStatus::Loading,
                state: ProgressionState::default(),
                revision: 0,
            }),
            persisted: Mutex::new(0),
        }
    }

    /// Create and load in one step.
    pub fn open(snapshots: impl SnapshotStore + 'static) -> Self {
        let store = Self::new(snapshots);
        store.load();
        store
    }

    /// Read the persisted snapshot, falling back to defaults if it is absent
    /// or unreadable. Only the first call has any effect.
    pub fn load(&self) -> LoadStatus {
        if self.status() == LoadStatus::Ready {
            debug!("progression already loaded");
            return LoadStatus::Ready;
        }

        let state = match self.snapshots.load(PROGRESSION_KEY) {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!("no progression snapshot, starting fresh");
                ProgressionState::default()
            }
            Err(err) => {
                warn!(error = %err, "failed to load progression snapshot, starting fresh");
                ProgressionState::default()
            }
        };

        let mut inner = self.write();
        if inner.status == LoadStatus::Loading {
            inner.state = state;
            inner.status = LoadStatus::Ready;
        }
        inner.status
    }

    /// Current load status.
    pub fn status(&self) -> LoadStatus {
        self.read().status
    }

    /// Check if the initial load is still pending.
    pub fn is_loading(&self) -> bool {
        self.status() == LoadStatus::Loading
    }

    /// Copy of the current state, or `None` while loading.
    pub fn snapshot(&self) -> Option<ProgressionState> {
        let inner = self.read();
        match inner.status {
            LoadStatus::Ready => Some(inner.state.clone()),
            LoadStatus::Loading => None,
        }
    }

    /// Current level, or `None` while loading.
    pub fn level(&self) -> Option<u32> {
        self.snapshot().map(|s| s.level)
    }

    /// Add XP and persist the result.
    pub fn grant_xp(&self, amount: u32) -> Result<XpGrant> {
        let (grant, revision, snapshot) = {
            let mut inner = self.write();
            Self::ensure_ready(&inner)?;
            let grant = inner.state.apply_xp(amount)?;
            inner.revision += 1;
            (grant, inner.revision, inner.state.clone())
        };

        if grant.leveled_up {
            info!(level = grant.level, xp = grant.xp, "level up");
        } else {
            debug!(amount, level = grant.level, xp = grant.xp, "xp granted");
        }

        self.persist(revision, &snapshot);
        Ok(grant)
    }

    /// Record an unlock. Returns `false` (and saves nothing) if the id was
    /// already unlocked.
    pub fn unlock_item(&self, kind: UnlockKind, id: &str) -> Result<bool> {
        let (revision, snapshot) = {
            let mut inner = self.write();
            Self::ensure_ready(&inner)?;
            if !inner.state.unlock(kind, id) {
                return Ok(false);
            }
            inner.revision += 1;
            (inner.revision, inner.state.clone())
        };

        info!(?kind, id, "unlocked");
        self.persist(revision, &snapshot);
        Ok(true)
    }

    /// Level gate for cosmetics. Always `false` while loading.
    pub fn is_unlocked(&self, required_level: u32) -> bool {
        self.level().is_some_and(|level| level >= required_level)
    }

    /// Level gate for a catalog accessory. Unknown ids are locked.
    pub fn accessory_unlocked(&self, id: &str) -> bool {
        find_accessory(id).is_some_and(|a| self.is_unlocked(a.required_level))
    }

    fn ensure_ready(inner: &Inner) -> Result<()> {
        match inner.status {
            LoadStatus::Ready => Ok(()),
            LoadStatus::Loading => Err(GameError::invalid_state(
                "progression is still loading",
            )),
        }
    }

    fn persist(&self, revision: u64, snapshot: &ProgressionState) {
        let mut persisted = self
            .persisted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if revision <= *persisted {
            debug!(revision, persisted = *persisted, "skipping stale progression save");
            return;
        }

        match self.snapshots.save(PROGRESSION_KEY, snapshot) {
            Ok(()) => *persisted = revision,
            Err(err) => warn!(error = %err, revision, "failed to save progression snapshot"),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
