//! Cross-round progression record and level arithmetic.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// XP needed per level step; the threshold for level `n` is `n * XP_PER_LEVEL`.
pub const XP_PER_LEVEL: u32 = 100;

/// XP threshold to leave `level`.
pub fn level_threshold(level: u32) -> u32 {
    level.max(1).saturating_mul(XP_PER_LEVEL)
}

/// Persistent level, XP and unlock state.
///
/// Serialized with camelCase keys; this is the snapshot format stored under
/// [`crate::storage::PROGRESSION_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionState {
    /// Current level, starting at 1.
    pub level: u32,
    /// XP accumulated towards the next level.
    pub xp: u32,
    /// Unlocked character ids.
    #[serde(default)]
    pub unlocked_characters: BTreeSet<String>,
    /// Unlocked accessory ids.
    #[serde(default)]
    pub unlocked_accessories: BTreeSet<String>,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            unlocked_characters: BTreeSet::new(),
            unlocked_accessories: BTreeSet::new(),
        }
    }
}

/// Result of a single XP grant.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct XpGrant {
    pub level: u32,
    pub xp: u32,
    pub leveled_up: bool,
}

/// Kind of cosmetic an unlock applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockKind {
    Character,
    Accessory,
}

impl std::str::FromStr for UnlockKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "character" => Ok(Self::Character),
            "accessory" => Ok(Self::Accessory),
            other => Err(format!(
                "unknown unlock kind '{}', expected 'character' or 'accessory'",
                other
            )),
        }
    }
}

impl ProgressionState {
    /// Add `amount` XP, carrying over as many levels as it covers.
    ///
    /// Each step uses the threshold of the level being left, so a grant of
    /// 250 from level 1 / 80 XP lands on level 3 / 30 XP.
    ///
    /// A grant that would overflow the XP counter is refused and leaves the
    /// state unchanged.
    pub fn apply_xp(&mut self, amount: u32) -> Result<XpGrant> {
        let start_level = self.level.max(1);
        let mut level = start_level;
        let mut xp = self.xp.checked_add(amount).ok_or_else(|| {
            GameError::invalid_state(format!(
                "granting {} XP on top of {} overflows the XP counter",
                amount, self.xp
            ))
        })?;
        let mut threshold = level_threshold(level);

        while xp >= threshold {
            xp -= threshold;
            level += 1;
            threshold = level_threshold(level);
        }

        self.level = level;
        self.xp = xp;

        Ok(XpGrant {
            level,
            xp,
            leveled_up: level > start_level,
        })
    }

    /// Record an unlock. Returns `false` if the id was already unlocked.
    pub fn unlock(&mut self, kind: UnlockKind, id: impl Into<String>) -> bool {
        let set = match kind {
            UnlockKind::Character => &mut self.unlocked_characters,
            UnlockKind::Accessory => &mut self.unlocked_accessories,
        };
        set.insert(id.into())
    }

    /// Check whether an id is in the given unlock set.
    pub fn has_unlocked(&self, kind: UnlockKind, id: &str) -> bool {
        match kind {
            UnlockKind::Character => self.unlocked_characters.contains(id),
            UnlockKind::Accessory => self.unlocked_accessories.contains(id),
        }
    }

    /// XP required to leave the current level.
    pub fn xp_to_next_level(&self) -> u32 {
        level_threshold(self.level)
    }

    /// Fill of the XP bar in percent, clamped to `0..=100`.
    pub fn progress_percent(&self) -> f64 {
        let threshold = self.xp_to_next_level() as f64;
        ((self.xp as f64 / threshold) * 100.0).clamp(0.0, 100.0)
    }
}
