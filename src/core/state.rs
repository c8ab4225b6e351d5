//! Runtime state of a round.
//!
//! These types hold what the round screen shows: the drawn words, the
//! active index, the score, and the per-word listening cycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::core::words::WordItem;

/// Status line shown under the active word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusMessage {
    /// Waiting for the player to start speaking.
    #[default]
    Idle,
    /// The recognizer is listening.
    Listening,
    /// The last transcript matched; the round advances shortly.
    Correct,
    /// The last transcript did not match.
    Retry,
    /// The recognizer could not start or failed.
    Error,
}

impl StatusMessage {
    /// User-facing text.
    pub fn text(&self) -> &'static str {
        match self {
            Self::Idle => "Tap the Mic to Speak",
            Self::Listening => "Listening...",
            Self::Correct => "Correct!",
            Self::Retry => "Try Again!",
            Self::Error => "Error! Tap to try again.",
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Lifecycle of a round controller.
///
/// ```text
/// NoData (empty draw, accepts nothing)
/// Playing -> Completed (ledger covers every word)
/// Playing -> Abandoned (torn down early)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    NoData,
    Playing,
    Completed,
    Abandoned,
}

impl RoundPhase {
    /// Whether the round still accepts commands and events.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Whether the round is over for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }
}

/// Mutable state of the active round.
#[derive(Debug, Clone)]
pub struct RoundState {
    /// Drawn words in play order.
    pub words: Vec<WordItem>,
    /// Index of the active word.
    pub current_index: usize,
    pub score: u32,
    /// When the player last started speaking on the active word.
    pub started_at: Option<Instant>,
    /// Last transcript heard for the active word.
    pub recognized_text: String,
    pub status: StatusMessage,
    pub is_listening: bool,
}

impl RoundState {
    /// Fresh state over `words`.
    pub fn new(words: Vec<WordItem>) -> Self {
        Self {
            words,
            current_index: 0,
            score: 0,
            started_at: None,
            recognized_text: String::new(),
            status: StatusMessage::Idle,
            is_listening: false,
        }
    }

    /// The active word, if any.
    pub fn current_word(&self) -> Option<&WordItem> {
        self.words.get(self.current_index)
    }

    /// Whether another word follows the active one.
    pub fn has_next(&self) -> bool {
        self.current_index + 1 < self.words.len()
    }

    /// Move to the next word and reset its text, status and start time.
    ///
    /// Returns `false` on the last word, leaving the index unchanged.
    pub fn advance(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.current_index += 1;
        self.reset_word_cycle();
        true
    }

    fn reset_word_cycle(&mut self) {
        self.recognized_text.clear();
        self.status = StatusMessage::Idle;
        self.started_at = None;
    }
}

/// What the round screen renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundView {
    pub phase: RoundPhase,
    pub word: Option<String>,
    pub image: Option<String>,
    /// One-based position of the active word.
    pub position: usize,
    pub total: usize,
    pub score: u32,
    pub status: String,
    pub recognized_text: String,
    pub is_listening: bool,
}

impl RoundView {
    /// Build the view for `state` in `phase`.
    pub fn new(state: &RoundState, phase: RoundPhase) -> Self {
        let current = state.current_word();
        Self {
            phase,
            word: current.map(|w| w.word.clone()),
            image: current.map(|w| w.image_ref.clone()),
            position: if state.words.is_empty() {
                0
            } else {
                state.current_index + 1
            },
            total: state.words.len(),
            score: state.score,
            status: state.status.text().to_string(),
            recognized_text: state.recognized_text.clone(),
            is_listening: state.is_listening,
        }
    }

    /// Progress label such as `2 / 5`.
    pub fn progress_label(&self) -> String {
        format!("{} / {}", self.position, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(names: &[&str]) -> Vec<WordItem> {
        names.iter().map(|w| WordItem::new(*w, "")).collect()
    }

    #[test]
    fn test_status_text() {
        assert_eq!(StatusMessage::Idle.to_string(), "Tap the Mic to Speak");
        assert_eq!(StatusMessage::Retry.text(), "Try Again!");
        assert_eq!(StatusMessage::default(), StatusMessage::Idle);
    }

    #[test]
    fn test_phase_predicates() {
        assert!(RoundPhase::Playing.is_playing());
        assert!(!RoundPhase::NoData.is_playing());
        assert!(!RoundPhase::NoData.is_terminal());
        assert!(RoundPhase::Completed.is_terminal());
        assert!(RoundPhase::Abandoned.is_terminal());
    }

    #[test]
    fn test_advance_resets_word_cycle() {
        let mut state = RoundState::new(words(&["Cat", "Dog"]));
        state.recognized_text = "cat".into();
        state.status = StatusMessage::Correct;
        state.started_at = Some(Instant::now());
        state.is_listening = true;

        assert!(state.advance());
        assert_eq!(state.current_index, 1);
        assert_eq!(state.current_word().unwrap().word, "Dog");
        assert!(state.recognized_text.is_empty());
        assert_eq!(state.status, StatusMessage::Idle);
        assert!(state.started_at.is_none());
        // Listening ends only when the recognizer says so.
        assert!(state.is_listening);
    }

    #[test]
    fn test_advance_stops_on_last_word() {
        let mut state = RoundState::new(words(&["Cat"]));
        assert!(!state.advance());
        assert_eq!(state.current_index, 0);
    }

    #[test]
    fn test_view() {
        let mut state = RoundState::new(words(&["Cat", "Dog"]));
        state.score = 100;
        let view = RoundView::new(&state, RoundPhase::Playing);
        assert_eq!(view.word.as_deref(), Some("Cat"));
        assert_eq!(view.progress_label(), "1 / 2");
        assert_eq!(view.status, "Tap the Mic to Speak");

        let empty = RoundView::new(&RoundState::new(Vec::new()), RoundPhase::NoData);
        assert_eq!(empty.progress_label(), "0 / 0");
        assert!(empty.word.is_none());
    }
}
