//! Round history log.
//!
//! Every completed round is appended as one JSON line to
//! `~/.wordcall/history.log`. The log is write-only during play; the
//! `history` command reads it back newest-first.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{SessionSummary, WordStat};
use crate::error::{GameError, Result};
use crate::util::{read_tail, MAX_FILE_SIZE};

/// Schema version for history records.
pub const HISTORY_SCHEMA_VERSION: u8 = 1;

/// One completed round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundRecord {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// When the round finished.
    pub ts: DateTime<Utc>,
    pub category: String,
    pub final_score: u32,
    /// Per-word outcomes in play order.
    pub words: Vec<WordStat>,
}

impl RoundRecord {
    /// Record a summary with the current timestamp.
    pub fn new(category: impl Into<String>, summary: &SessionSummary) -> Self {
        Self::with_timestamp(category, summary, Utc::now())
    }

    /// Record a summary with a specific timestamp (for testing).
    pub fn with_timestamp(
        category: impl Into<String>,
        summary: &SessionSummary,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            v: HISTORY_SCHEMA_VERSION,
            ts,
            category: category.into(),
            final_score: summary.final_score,
            words: summary.round_words.clone(),
        }
    }

    /// Number of correctly pronounced words.
    pub fn correct_count(&self) -> usize {
        self.words.iter().filter(|w| w.credited).count()
    }
}

/// Append-only JSONL log of completed rounds.
#[derive(Debug, Clone)]
pub struct RoundHistory {
    path: PathBuf,
}

impl RoundHistory {
    /// Create a history log at the given path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record to the log.
    pub fn append(&self, record: &RoundRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| GameError::storage(parent, e))?;
        }

        let json = serde_json::to_string(record)
            .map_err(|e| GameError::serde(format!("Failed to serialize round record: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| GameError::storage(&self.path, e))?;

        writeln!(file, "{}", json).map_err(|e| GameError::storage(&self.path, e))?;
        Ok(())
    }

    /// Append a finished round.
    pub fn record(&self, category: &str, summary: &SessionSummary) -> Result<()> {
        self.append(&RoundRecord::new(category, summary))
    }

    /// Read every record, oldest first.
    ///
    /// Lines that are not valid UTF-8 or not a record are skipped. Only the
    /// last [`MAX_FILE_SIZE`] bytes of a larger log are read.
    pub fn read_all(&self) -> Result<Vec<RoundRecord>> {
        self.read_all_with_limit(MAX_FILE_SIZE)
    }

    fn read_all_with_limit(&self, max_size: u64) -> Result<Vec<RoundRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let (content, truncated) = read_tail(&self.path, max_size)?;
        let mut lines = content.split(|b| *b == b'\n');
        if truncated {
            // First line starts mid-record.
            lines.next();
            debug!(path = %self.path.display(), max_size, "history log truncated to its tail");
        }

        let mut records = Vec::new();
        for (line_num, line) in lines.enumerate() {
            let line = match std::str::from_utf8(line) {
                Ok(line) => line,
                Err(e) => {
                    debug!(line = line_num + 1, error = %e, "skipping undecodable history line");
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RoundRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => debug!(line = line_num + 1, error = %e, "skipping malformed history line"),
            }
        }

        Ok(records)
    }

    /// The `limit` most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<RoundRecord>> {
        let mut records = self.read_all()?;
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }

    /// Number of readable records.
    pub fn count(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StatsLedger, WordItem};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn summary(score: u32, words: &[(&str, bool)]) -> SessionSummary {
        let mut ledger = StatsLedger::new();
        for (word, credited) in words {
            let item = WordItem::new(*word, "");
            ledger.push(if *credited {
                WordStat::correct(&item, 1.0)
            } else {
                WordStat::skipped(&item)
            });
        }
        SessionSummary::new(score, ledger)
    }

    #[test]
    fn test_append_and_read() {
        let temp = TempDir::new().unwrap();
        let history = RoundHistory::new(temp.path().join("history.log"));

        history
            .record("food", &summary(100, &[("Apple", true), ("Banana", false)]))
            .unwrap();
        history.record("animals", &summary(0, &[("Cat", false)])).unwrap();

        let records = history.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].category, "food");
        assert_eq!(records[0].final_score, 100);
        assert_eq!(records[0].correct_count(), 1);
        assert_eq!(records[0].words[1].word, "Banana");
        assert_eq!(records[1].v, HISTORY_SCHEMA_VERSION);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let temp = TempDir::new().unwrap();
        let history = RoundHistory::new(temp.path().join("history.log"));

        for (i, category) in ["food", "animals", "sports"].iter().enumerate() {
            let ts = Utc.with_ymd_and_hms(2026, 1, 1 + i as u32, 12, 0, 0).unwrap();
            history
                .append(&RoundRecord::with_timestamp(*category, &summary(0, &[]), ts))
                .unwrap();
        }

        let recent = history.recent(2).unwrap();
        let categories: Vec<&str> = recent.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["sports", "animals"]);
    }

    #[test]
    fn test_missing_log_is_empty() {
        let temp = TempDir::new().unwrap();
        let history = RoundHistory::new(temp.path().join("history.log"));
        assert!(history.read_all().unwrap().is_empty());
        assert_eq!(history.count().unwrap(), 0);
    }

    #[test]
    fn test_skips_malformed_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.log");
        let history = RoundHistory::new(&path);
        history.record("food", &summary(100, &[("Apple", true)])).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();
        writeln!(file).unwrap();
        history.record("sports", &summary(0, &[])).unwrap();

        assert_eq!(history.count().unwrap(), 2);
    }

    #[test]
    fn test_skips_undecodable_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.log");
        let history = RoundHistory::new(&path);
        history.record("food", &summary(100, &[("Apple", true)])).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"\xff\xfe garbage\n").unwrap();
        history.record("sports", &summary(0, &[])).unwrap();

        let recent = history.recent(10).unwrap();
        let categories: Vec<&str> = recent.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["sports", "food"]);
    }

    #[test]
    fn test_oversized_log_reads_tail() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.log");
        let history = RoundHistory::new(&path);
        for category in ["food", "animals", "sports"] {
            history.record(category, &summary(0, &[])).unwrap();
        }

        let last_line = fs::read_to_string(&path)
            .unwrap()
            .lines()
            .last()
            .unwrap()
            .len() as u64;
        // Room for the last record plus a fragment of the one before.
        let records = history.read_all_with_limit(last_line + 10).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "sports");
    }

    #[test]
    fn test_creates_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("history.log");
        RoundHistory::new(&path)
            .record("food", &summary(0, &[]))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_record_line_shape() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.log");
        RoundHistory::new(&path)
            .record("food", &summary(100, &[("Apple", true)]))
            .unwrap();

        let line = fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(json["v"], 1);
        assert_eq!(json["category"], "food");
        assert_eq!(json["final_score"], 100);
        assert_eq!(json["words"][0]["word"], "Apple");
    }
}
