//! Core game types and logic.
//!
//! Word pools and round setup, the round state machine, and the per-word
//! ledger that becomes the end-of-round summary.

pub mod ledger;
pub mod round;
pub mod state;
pub mod words;

pub use ledger::{scoring, SessionSummary, StatsLedger, WordStat};
pub use round::{matches_word, AnswerOutcome, RoundController};
pub use state::{RoundPhase, RoundState, RoundView, StatusMessage};
pub use words::{draw_words, Category, RoundConfig, Vocabulary, WordItem, WORD_COUNT_OPTIONS};
