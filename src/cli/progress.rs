//! Progress command for wordcall.
//!
//! Shows level, XP toward the next level, and unlocks. With `--grant` it
//! first adds bonus XP, the way the menu's practice button does.

use std::sync::Arc;

use serde::Serialize;

use crate::progression::ProgressionStore;

/// XP added by a bare `--grant`.
pub const BONUS_XP: u32 = 50;

/// Options for the progress command.
#[derive(Debug, Clone, Default)]
pub struct ProgressOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// XP to add before reporting.
    pub grant: Option<u32>,
}

/// Output format for the progress command.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressOutput {
    /// Whether progression could be read.
    pub success: bool,
    pub level: u32,
    pub xp: u32,
    /// XP needed to complete the current level.
    pub xp_to_next_level: u32,
    pub progress_percent: f64,
    pub unlocked_characters: Vec<String>,
    pub unlocked_accessories: Vec<String>,
    /// XP added by this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted: Option<u32>,
    /// Whether the grant crossed at least one level.
    pub leveled_up: bool,
    /// Error message if reading failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressOutput {
    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            level: 0,
            xp: 0,
            xp_to_next_level: 0,
            progress_percent: 0.0,
            unlocked_characters: Vec::new(),
            unlocked_accessories: Vec::new(),
            granted: None,
            leveled_up: false,
            error: Some(error.into()),
        }
    }
}

/// The progress command implementation.
pub struct ProgressCommand {
    progression: Arc<ProgressionStore>,
}

impl ProgressCommand {
    /// Create a new progress command.
    pub fn new(progression: Arc<ProgressionStore>) -> Self {
        Self { progression }
    }

    /// Run the progress command.
    pub fn run(&self, options: &ProgressOptions) -> ProgressOutput {
        let leveled_up = match options.grant {
            Some(amount) => match self.progression.grant_xp(amount) {
                Ok(grant) => grant.leveled_up,
                Err(e) => return ProgressOutput::failure(e.to_string()),
            },
            None => false,
        };

        let Some(state) = self.progression.snapshot() else {
            return ProgressOutput::failure("progression is still loading");
        };

        ProgressOutput {
            success: true,
            level: state.level,
            xp: state.xp,
            xp_to_next_level: state.xp_to_next_level(),
            progress_percent: state.progress_percent(),
            unlocked_characters: state.unlocked_characters.iter().cloned().collect(),
            unlocked_accessories: state.unlocked_accessories.iter().cloned().collect(),
            granted: options.grant,
            leveled_up,
            error: None,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ProgressOutput, options: &ProgressOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ProgressOutput) -> String {
        if !output.success {
            return format!(
                "Progress unavailable: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        if let Some(granted) = output.granted {
            lines.push(format!("+{} XP", granted));
        }
        if output.leveled_up {
            lines.push("Level up!".to_string());
        }
        lines.extend([
            format!("Level {}", output.level),
            format!(
                "{} {}/{} XP",
                progress_bar(output.progress_percent, 20),
                output.xp,
                output.xp_to_next_level
            ),
        ]);

        lines.push(format!(
            "Characters: {}",
            list_or_none(&output.unlocked_characters)
        ));
        lines.push(format!(
            "Accessories: {}",
            list_or_none(&output.unlocked_accessories)
        ));

        lines.join("\n")
    }
}

/// Render a `[####----]` bar for a 0..=100 percentage.
pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
