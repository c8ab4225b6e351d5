//! Snapshot storage for wordcall.
//!
//! Progression is persisted as one JSON record keyed by
//! [`PROGRESSION_KEY`], with file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use traits::{SnapshotStore, PROGRESSION_KEY};
