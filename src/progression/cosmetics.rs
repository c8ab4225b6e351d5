//! Level-gated cosmetic catalog.
//!
//! Gating is a pure read against the current level. Which accessory is
//! equipped is display state and never stored here.

use serde::Serialize;

/// A wearable accessory and the level that unlocks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Accessory {
    pub id: &'static str,
    pub name: &'static str,
    pub required_level: u32,
    pub image: &'static str,
}

/// All accessories, in display order.
pub const ACCESSORIES: &[Accessory] = &[
    Accessory {
        id: "hat",
        name: "Hat",
        required_level: 5,
        image: "images/accessory_hat.png",
    },
    Accessory {
        id: "glasses",
        name: "Glasses",
        required_level: 2,
        image: "images/accessory_glasses.png",
    },
];

/// Look up an accessory by id.
pub fn find_accessory(id: &str) -> Option<&'static Accessory> {
    ACCESSORIES.iter().find(|a| a.id == id)
}

/// Pair every accessory with whether `level` unlocks it.
pub fn accessory_gates(level: u32) -> Vec<(&'static Accessory, bool)> {
    ACCESSORIES
        .iter()
        .map(|a| (a, level >= a.required_level))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_accessory() {
        assert_eq!(find_accessory("hat").unwrap().required_level, 5);
        assert_eq!(find_accessory("glasses").unwrap().required_level, 2);
        assert!(find_accessory("cape").is_none());
    }

    #[test]
    fn test_accessory_gates() {
        let gates = accessory_gates(1);
        assert!(gates.iter().all(|(_, unlocked)| !unlocked));

        let gates = accessory_gates(2);
        let glasses = gates.iter().find(|(a, _)| a.id == "glasses").unwrap();
        let hat = gates.iter().find(|(a, _)| a.id == "hat").unwrap();
        assert!(glasses.1);
        assert!(!hat.1);

        assert!(accessory_gates(5).iter().all(|(_, unlocked)| *unlocked));
    }
}
