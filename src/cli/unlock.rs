//! Unlock command for wordcall.
//!
//! Records a character or accessory unlock. Catalog accessories can only be
//! unlocked once the player's level reaches their gate.

use std::sync::Arc;

use serde::Serialize;

use crate::progression::{find_accessory, ProgressionStore, UnlockKind};

/// Options for the unlock command.
#[derive(Debug, Clone, Default)]
pub struct UnlockOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the unlock command.
#[derive(Debug, Clone, Serialize)]
pub struct UnlockOutput {
    /// Whether the id is unlocked after the command.
    pub success: bool,
    pub kind: UnlockKind,
    pub id: String,
    /// False when the id was already unlocked.
    pub newly_unlocked: bool,
    /// Error message if the unlock was refused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnlockOutput {
    /// Create a successful output.
    pub fn success(kind: UnlockKind, id: impl Into<String>, newly_unlocked: bool) -> Self {
        Self {
            success: true,
            kind,
            id: id.into(),
            newly_unlocked,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(kind: UnlockKind, id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            kind,
            id: id.into(),
            newly_unlocked: false,
            error: Some(error.into()),
        }
    }
}

/// The unlock command implementation.
pub struct UnlockCommand {
    progression: Arc<ProgressionStore>,
}

impl UnlockCommand {
    /// Create a new unlock command.
    pub fn new(progression: Arc<ProgressionStore>) -> Self {
        Self { progression }
    }

    /// Run the unlock command.
    pub fn run(&self, kind: UnlockKind, id: &str) -> UnlockOutput {
        let id = id.trim();
        if id.is_empty() {
            return UnlockOutput::failure(kind, id, "id must not be empty");
        }

        if kind == UnlockKind::Accessory {
            let Some(accessory) = find_accessory(id) else {
                return UnlockOutput::failure(kind, id, format!("Unknown accessory '{}'", id));
            };
            if !self.progression.is_unlocked(accessory.required_level) {
                return UnlockOutput::failure(
                    kind,
                    id,
                    format!("{} requires level {}", accessory.name, accessory.required_level),
                );
            }
        }

        match self.progression.unlock_item(kind, id) {
            Ok(newly_unlocked) => UnlockOutput::success(kind, id, newly_unlocked),
            Err(e) => UnlockOutput::failure(kind, id, e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &UnlockOutput, options: &UnlockOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        let kind = match output.kind {
            UnlockKind::Character => "character",
            UnlockKind::Accessory => "accessory",
        };
        if !output.success {
            format!(
                "Unlock failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            )
        } else if output.newly_unlocked {
            format!("Unlocked {} '{}'", kind, output.id)
        } else {
            format!("{} '{}' was already unlocked", capitalize(kind), output.id)
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
