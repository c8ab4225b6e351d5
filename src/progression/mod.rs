//! Cross-round progression: level, XP and unlocks.

pub mod cosmetics;
pub mod state;
pub mod store;

pub use cosmetics::{accessory_gates, find_accessory, Accessory, ACCESSORIES};
pub use state::{level_threshold, ProgressionState, UnlockKind, XpGrant, XP_PER_LEVEL};
pub use store::{LoadStatus, ProgressionStore};
