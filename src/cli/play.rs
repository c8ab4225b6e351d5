//! Play command for wordcall.
//!
//! Runs one round in the terminal. Each input line stands in for what the
//! recognizer heard during one listening turn; `:skip`, `:giveup` and
//! `:quit` are commands. When input runs out, the remaining words are given
//! up so the round still ends with a summary.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use crate::config::RoundSettings;
use crate::core::{RoundConfig, RoundController, RoundPhase, RoundView, Vocabulary, WordStat};
use crate::error::FailOpen;
use crate::history::RoundHistory;
use crate::progression::ProgressionStore;
use crate::recognition::ScriptedGateway;

/// Options for the play command.
#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output (prompts included).
    pub quiet: bool,
    /// Category to draw words from.
    pub category: String,
    /// Number of words; the configured default when absent.
    pub words: Option<usize>,
}

/// What one input line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayAction {
    /// A transcript for one listening turn.
    Say(String),
    Skip,
    GiveUp,
    Quit,
    /// Blank line.
    Empty,
}

/// Parse one input line.
pub fn parse_action(line: &str) -> PlayAction {
    let trimmed = line.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" => PlayAction::Empty,
        ":skip" => PlayAction::Skip,
        ":giveup" | ":give-up" | ":give_up" => PlayAction::GiveUp,
        ":quit" | ":q" => PlayAction::Quit,
        _ => PlayAction::Say(trimmed.to_string()),
    }
}

/// Output format for the play command.
#[derive(Debug, Clone, Serialize)]
pub struct PlayOutput {
    /// Whether a round was played.
    pub success: bool,
    pub category: String,
    /// Whether every word was resolved (false after `:quit`).
    pub completed: bool,
    pub final_score: u32,
    /// Per-word outcomes in play order.
    pub words: Vec<WordStat>,
    pub correct: usize,
    /// Progression after the round, if loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<u32>,
    pub leveled_up: bool,
    /// Error message if the round could not be played.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlayOutput {
    /// Create a failed output.
    pub fn failure(category: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            category: category.into(),
            completed: false,
            final_score: 0,
            words: Vec::new(),
            correct: 0,
            level: None,
            xp: None,
            leveled_up: false,
            error: Some(error.into()),
        }
    }
}

/// The play command implementation.
pub struct PlayCommand {
    progression: Arc<ProgressionStore>,
    vocabulary: Vocabulary,
    settings: RoundSettings,
    history: Option<RoundHistory>,
}

impl PlayCommand {
    /// Create a new play command.
    pub fn new(
        progression: Arc<ProgressionStore>,
        vocabulary: Vocabulary,
        settings: RoundSettings,
    ) -> Self {
        Self {
            progression,
            vocabulary,
            settings,
            history: None,
        }
    }

    /// Record completed rounds to `history`.
    pub fn with_history(mut self, history: RoundHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Play one round, reading turns from `input` and writing prompts to
    /// `prompt`.
    pub async fn run<I>(&self, options: &PlayOptions, input: I, prompt: &mut dyn Write) -> PlayOutput
    where
        I: IntoIterator<Item = String>,
    {
        let count = options.words.unwrap_or(self.settings.default_word_count);
        let round_config = match RoundConfig::new(&options.category, count) {
            Ok(config) => config,
            Err(e) => return PlayOutput::failure(&options.category, e.to_string()),
        };

        let level_before = self.progression.level();
        let (gateway, script) = ScriptedGateway::new();
        let mut round = RoundController::setup(
            &self.vocabulary,
            &round_config,
            &mut rand::thread_rng(),
            gateway,
            Arc::clone(&self.progression),
            &self.settings,
        );

        if round.phase() == RoundPhase::NoData {
            return PlayOutput::failure(
                &options.category,
                format!("No words in category '{}'", options.category),
            );
        }

        let mut lines = input.into_iter();
        let mut quit = false;

        while round.phase().is_playing() {
            if !round.state().is_listening && !round.is_advance_pending() {
                round.start_speaking().await;
            }
            if !options.quiet {
                write_prompt(prompt, &round.view());
            }

            let Some(line) = lines.next() else {
                break;
            };

            match parse_action(&line) {
                PlayAction::Say(text) => {
                    let resolved = round.ledger().len();
                    script.hear(text.as_str());
                    round.settle().await;
                    if !options.quiet {
                        let verdict = if round.ledger().len() > resolved {
                            "Correct!"
                        } else {
                            "Try Again!"
                        };
                        let _ = writeln!(prompt, "  {} (you said: {})", verdict, text);
                    }
                }
                PlayAction::Skip => round.skip().await,
                PlayAction::GiveUp => round.give_up().await,
                PlayAction::Quit => {
                    quit = true;
                    break;
                }
                PlayAction::Empty => {}
            }
        }

        if !quit {
            while round.phase().is_playing() {
                round.give_up().await;
            }
        }

        let completed = round.phase() == RoundPhase::Completed;
        let (final_score, words) = match round.take_summary() {
            Some(summary) => {
                if let Some(history) = &self.history {
                    history
                        .record(&options.category, &summary)
                        .fail_open_default("recording round history");
                }
                (summary.final_score, summary.round_words)
            }
            None => (round.state().score, round.ledger().entries().to_vec()),
        };
        round.abandon();

        let after = self.progression.snapshot();
        PlayOutput {
            success: true,
            category: options.category.clone(),
            completed,
            final_score,
            correct: words.iter().filter(|w| w.credited).count(),
            words,
            level: after.as_ref().map(|s| s.level),
            xp: after.as_ref().map(|s| s.xp),
            leveled_up: matches!(
                (level_before, after.as_ref()),
                (Some(before), Some(now)) if now.level > before
            ),
            error: None,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &PlayOutput, options: &PlayOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &PlayOutput) -> String {
        if !output.success {
            return format!(
                "Play failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        if output.completed {
            lines.push(format!("Round complete: {}", output.category));
        } else {
            lines.push(format!("Round abandoned: {}", output.category));
        }
        lines.push(format!(
            "Score: {} ({}/{} correct)",
            output.final_score,
            output.correct,
            output.words.len()
        ));
        lines.push(String::new());

        for (i, stat) in output.words.iter().enumerate() {
            let outcome = if stat.credited { "✓" } else { "skipped" };
            lines.push(format!(
                "{:>3}. {:<16} {:>5.1}s  {}",
                i + 1,
                stat.word,
                stat.time_taken_seconds,
                outcome
            ));
        }

        if let (Some(level), Some(xp)) = (output.level, output.xp) {
            lines.push(String::new());
            let mut progress = format!(
                "Level {} ({}/{} XP)",
                level,
                xp,
                crate::progression::level_threshold(level)
            );
            if output.leveled_up {
                progress.push_str(" - level up!");
            }
            lines.push(progress);
        }

        lines.join("\n")
    }
}

fn write_prompt(prompt: &mut dyn Write, view: &RoundView) {
    let word = view.word.as_deref().unwrap_or("?");
    let _ = writeln!(
        prompt,
        "[{}] Score: {}  Say: {}  ({})",
        view.progress_label(),
        view.score,
        word,
        view.status
    );
    let _ = prompt.flush();
}
