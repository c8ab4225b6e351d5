//! History command for wordcall.
//!
//! Shows recently completed rounds, newest first.

use serde::Serialize;

use crate::history::{RoundHistory, RoundRecord};

/// Default number of rounds shown.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Options for the history command.
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of rounds.
    pub limit: Option<usize>,
}

/// Output format for the history command.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryOutput {
    pub success: bool,
    pub count: usize,
    pub rounds: Vec<RoundRecord>,
    /// Error message if the log could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The history command implementation.
pub struct HistoryCommand {
    history: RoundHistory,
}

impl HistoryCommand {
    /// Create a new history command.
    pub fn new(history: RoundHistory) -> Self {
        Self { history }
    }

    /// Run the history command.
    pub fn run(&self, options: &HistoryOptions) -> HistoryOutput {
        let limit = options.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        match self.history.recent(limit) {
            Ok(rounds) => HistoryOutput {
                success: true,
                count: rounds.len(),
                rounds,
                error: None,
            },
            Err(e) => HistoryOutput {
                success: false,
                count: 0,
                rounds: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &HistoryOutput, options: &HistoryOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if !output.success {
            return format!(
                "History failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.rounds.is_empty() {
            return "No rounds played yet.\n".to_string();
        }

        output
            .rounds
            .iter()
            .map(|round| {
                format!(
                    "{}  {:<10} score {:>5}  {}/{} correct",
                    round.ts.format("%Y-%m-%d %H:%M"),
                    round.category,
                    round.final_score,
                    round.correct_count(),
                    round.words.len()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
