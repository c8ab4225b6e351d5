//! Wardrobe command for wordcall.
//!
//! Lists the accessory catalog with each item's level gate.

use std::sync::Arc;

use serde::Serialize;

use crate::progression::{accessory_gates, ProgressionStore, UnlockKind};

/// Options for the wardrobe command.
#[derive(Debug, Clone, Default)]
pub struct WardrobeOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// One catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct AccessoryInfo {
    pub id: String,
    pub name: String,
    pub required_level: u32,
    pub image: String,
    /// Whether the player's level reaches the gate.
    pub available: bool,
    /// Whether the player has recorded an unlock for it.
    pub owned: bool,
}

/// Output format for the wardrobe command.
#[derive(Debug, Clone, Serialize)]
pub struct WardrobeOutput {
    pub success: bool,
    pub level: u32,
    pub accessories: Vec<AccessoryInfo>,
    /// Error message if reading failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The wardrobe command implementation.
pub struct WardrobeCommand {
    progression: Arc<ProgressionStore>,
}

impl WardrobeCommand {
    /// Create a new wardrobe command.
    pub fn new(progression: Arc<ProgressionStore>) -> Self {
        Self { progression }
    }

    /// Run the wardrobe command.
    pub fn run(&self) -> WardrobeOutput {
        let Some(state) = self.progression.snapshot() else {
            return WardrobeOutput {
                success: false,
                level: 0,
                accessories: Vec::new(),
                error: Some("progression is still loading".to_string()),
            };
        };

        let accessories = accessory_gates(state.level)
            .into_iter()
            .map(|(accessory, available)| AccessoryInfo {
                id: accessory.id.to_string(),
                name: accessory.name.to_string(),
                required_level: accessory.required_level,
                image: accessory.image.to_string(),
                available,
                owned: state.has_unlocked(UnlockKind::Accessory, accessory.id),
            })
            .collect();

        WardrobeOutput {
            success: true,
            level: state.level,
            accessories,
            error: None,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &WardrobeOutput, options: &WardrobeOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if !output.success {
            return format!(
                "Wardrobe unavailable: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = vec![format!("Accessories (level {}):", output.level)];
        for accessory in &output.accessories {
            let state = if accessory.owned {
                "owned".to_string()
            } else if accessory.available {
                "available".to_string()
            } else {
                format!("locked, Lvl {}", accessory.required_level)
            };
            lines.push(format!("  {:<10} {:<10} ({})", accessory.id, accessory.name, state));
        }
        lines.join("\n")
    }
}
