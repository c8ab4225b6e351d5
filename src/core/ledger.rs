//! Per-word outcomes and the end-of-round summary.

use serde::{Deserialize, Serialize};

use crate::core::words::WordItem;

/// Fixed scoring rules.
pub mod scoring {
    /// Score for a correctly pronounced word.
    pub const CORRECT_AWARD: u32 = 100;
    /// XP granted for a correctly pronounced word.
    pub const CORRECT_XP: u32 = 10;
    /// Time recorded when no start time exists, and for skipped words.
    pub const FALLBACK_SECONDS: f64 = 10.0;
}

/// Outcome of one word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordStat {
    pub word: String,
    #[serde(rename = "image")]
    pub image_ref: String,
    pub time_taken_seconds: f64,
    /// Whether the word was pronounced correctly (skips are not).
    #[serde(default)]
    pub credited: bool,
}

impl WordStat {
    /// A correctly pronounced word.
    pub fn correct(item: &WordItem, time_taken_seconds: f64) -> Self {
        Self {
            word: item.word.clone(),
            image_ref: item.image_ref.clone(),
            time_taken_seconds: time_taken_seconds.max(0.0),
            credited: true,
        }
    }

    /// A skipped or abandoned word.
    pub fn skipped(item: &WordItem) -> Self {
        Self {
            word: item.word.clone(),
            image_ref: item.image_ref.clone(),
            time_taken_seconds: scoring::FALLBACK_SECONDS,
            credited: false,
        }
    }
}

/// Append-only list of word outcomes in play order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsLedger {
    entries: Vec<WordStat>,
}

impl StatsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stat: WordStat) {
        self.entries.push(stat);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[WordStat] {
        &self.entries
    }

    /// Consume into the entries.
    pub fn into_entries(self) -> Vec<WordStat> {
        self.entries
    }
}

/// Immutable record of a finished round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub final_score: u32,
    pub round_words: Vec<WordStat>,
}

impl SessionSummary {
    pub fn new(final_score: u32, ledger: StatsLedger) -> Self {
        Self {
            final_score,
            round_words: ledger.into_entries(),
        }
    }

    /// Number of correctly pronounced words.
    pub fn correct_count(&self) -> usize {
        self.round_words.iter().filter(|w| w.credited).count()
    }

    /// Sum of per-word times.
    pub fn total_seconds(&self) -> f64 {
        self.round_words.iter().map(|w| w.time_taken_seconds).sum()
    }

    /// Mean time over credited words, if any.
    pub fn average_correct_seconds(&self) -> Option<f64> {
        let times: Vec<f64> = self
            .round_words
            .iter()
            .filter(|w| w.credited)
            .map(|w| w.time_taken_seconds)
            .collect();
        if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<f64>() / times.len() as f64)
        }
    }
}
