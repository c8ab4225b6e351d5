//! Wordcall - speak-the-word vocabulary rounds
//!
//! A round shows one word at a time; the player says it aloud and a speech
//! recognizer reports what it heard. Correct answers score points and grant
//! XP toward a persisted level, which gates cosmetic unlocks.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod history;
pub mod progression;
pub mod recognition;
pub mod storage;
pub mod telemetry;
pub mod util;

pub use config::{Config, RoundSettings};
pub use core::{
    AnswerOutcome, RoundConfig, RoundController, RoundPhase, RoundView, SessionSummary,
    StatsLedger, Vocabulary, WordItem, WordStat,
};
pub use error::{GameError, Result};
pub use history::{RoundHistory, RoundRecord};
pub use progression::{ProgressionState, ProgressionStore, UnlockKind, XpGrant};
pub use recognition::{
    RecognitionEvent, RecognitionGateway, RecognitionSink, ScriptedGateway, StartFailure,
};
pub use storage::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};

// CLI commands
pub use cli::{
    CategoriesCommand, HistoryCommand, PlayCommand, ProgressCommand, UnlockCommand,
    WardrobeCommand,
};
