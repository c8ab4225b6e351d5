//! Round controller.
//!
//! Owns one live round: the drawn words, the active index, timing, score
//! and the stats ledger. The recognizer's listener is registered once, at
//! construction, as a [`RecognitionSink`]. Its events land in a queue that
//! the controller drains itself, so every handler runs against the round's
//! state at the moment the event is processed, never against state captured
//! when the listener was installed. A transcript that arrives late for a
//! word the round has already left is judged against the word now active.
//!
//! ```text
//! Playing:  Idle --start_speaking--> Listening --end/error/stop--> Idle
//!           result matches  -> ledger += word, score += 100, grant XP,
//!                              advance after the display delay
//!           skip / give_up  -> ledger += word (10.0 s, uncredited), advance
//!           ledger == words -> Completed (summary, gateway torn down)
//! ```

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::RoundSettings;
use crate::core::ledger::{scoring, SessionSummary, StatsLedger, WordStat};
use crate::core::state::{RoundPhase, RoundState, RoundView, StatusMessage};
use crate::core::words::{RoundConfig, Vocabulary, WordItem};
use crate::progression::{ProgressionStore, XpGrant};
use crate::recognition::{
    classify_error, RecognitionErrorKind, RecognitionEvent, RecognitionGateway, RecognitionSink,
    StartFailure,
};

/// Result of judging one transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// Matched the active word.
    Correct,
    /// Did not match; the player may try again.
    Retry,
    /// Not judged: the round is not playing, or the active word is already
    /// resolved and waiting to advance.
    Ignored,
}

/// Case- and surrounding-whitespace-insensitive match.
pub fn matches_word(spoken: &str, target: &str) -> bool {
    spoken.trim().to_lowercase() == target.trim().to_lowercase()
}

/// State machine for a single round.
pub struct RoundController<G: RecognitionGateway> {
    state: RoundState,
    phase: RoundPhase,
    ledger: StatsLedger,
    gateway: G,
    progression: Arc<ProgressionStore>,
    events: mpsc::UnboundedReceiver<RecognitionEvent>,
    locale: String,
    advance_delay: Duration,
    /// Set after a correct answer until the round moves on.
    pending_advance: Option<Instant>,
    permission_granted: bool,
    torn_down: bool,
    last_grant: Option<XpGrant>,
    last_start_failure: Option<StartFailure>,
    summary: Option<SessionSummary>,
}

impl<G: RecognitionGateway> std::fmt::Debug for RoundController<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundController")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("ledger", &self.ledger)
            .field("pending_advance", &self.pending_advance)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl<G: RecognitionGateway> RoundController<G> {
    /// Start a round over `words`, in the given order.
    ///
    /// An empty word list leaves the round in [`RoundPhase::NoData`], where
    /// it accepts no input.
    pub fn new(
        words: Vec<WordItem>,
        mut gateway: G,
        progression: Arc<ProgressionStore>,
        settings: &RoundSettings,
    ) -> Self {
        let (sink, events) = RecognitionSink::channel();
        gateway.register_listeners(sink);

        let phase = if words.is_empty() {
            debug!("no words drawn, round has no data");
            RoundPhase::NoData
        } else {
            RoundPhase::Playing
        };

        Self {
            state: RoundState::new(words),
            phase,
            ledger: StatsLedger::new(),
            gateway,
            progression,
            events,
            locale: settings.locale.clone(),
            advance_delay: settings.advance_delay(),
            pending_advance: None,
            permission_granted: false,
            torn_down: false,
            last_grant: None,
            last_start_failure: None,
            summary: None,
        }
    }

    /// Draw words for `config` from `vocabulary` and start a round.
    pub fn setup<R: Rng + ?Sized>(
        vocabulary: &Vocabulary,
        config: &RoundConfig,
        rng: &mut R,
        gateway: G,
        progression: Arc<ProgressionStore>,
        settings: &RoundSettings,
    ) -> Self {
        let words = vocabulary.draw(config, rng);
        info!(
            category = %config.category,
            requested = config.word_count,
            drawn = words.len(),
            "round set up"
        );
        Self::new(words, gateway, progression, settings)
    }

    // === Commands ===

    /// Begin listening for the active word.
    ///
    /// Returns whether the recognizer started. A refusal is absorbed here:
    /// status becomes `Error`, no start time is recorded, and the reason is
    /// kept in [`last_start_failure`](Self::last_start_failure).
    pub async fn start_speaking(&mut self) -> bool {
        // Anything queued belongs to an earlier listen.
        self.drain_events();

        if !self.phase.is_playing() {
            debug!(phase = ?self.phase, "start ignored, round not playing");
            return false;
        }
        if self.pending_advance.is_some() {
            debug!("start ignored, word already resolved");
            return false;
        }
        if self.state.is_listening {
            return true;
        }

        if !self.permission_granted {
            if self.gateway.request_permission().await {
                self.permission_granted = true;
            } else {
                self.fail_start(StartFailure::PermissionDenied);
                return false;
            }
        }

        self.state.recognized_text.clear();
        self.state.status = StatusMessage::Listening;
        let requested_at = Instant::now();

        match self.gateway.start(&self.locale).await {
            Ok(()) => {
                self.state.is_listening = true;
                self.state.started_at = Some(requested_at);
                self.last_start_failure = None;
                debug!(index = self.state.current_index, "listening");
                true
            }
            Err(failure) => {
                self.fail_start(failure);
                false
            }
        }
    }

    /// Stop listening. Does not advance the word.
    pub async fn stop_speaking(&mut self) {
        if !self.phase.is_playing() {
            return;
        }
        self.gateway.stop().await;
        self.state.is_listening = false;
        if self.state.status == StatusMessage::Listening {
            self.state.status = StatusMessage::Idle;
        }
        self.drain_events();
    }

    /// The mic button: stop if listening, otherwise start.
    pub async fn toggle_mic(&mut self) -> bool {
        if self.state.is_listening {
            self.stop_speaking().await;
            false
        } else {
            self.start_speaking().await
        }
    }

    /// Move past the active word without credit.
    pub async fn skip(&mut self) {
        self.pass("skip").await;
    }

    /// Give up on the active word. Same effect as [`skip`](Self::skip).
    pub async fn give_up(&mut self) {
        self.pass("give_up").await;
    }

    /// Judge a transcript against the active word.
    pub fn check_answer(&mut self, spoken: &str) -> AnswerOutcome {
        if !self.phase.is_playing() || self.pending_advance.is_some() {
            debug!(spoken, "transcript ignored");
            return AnswerOutcome::Ignored;
        }
        let Some(item) = self.state.current_word().cloned() else {
            return AnswerOutcome::Ignored;
        };

        if matches_word(spoken, &item.word) {
            self.resolve_correct(&item);
            AnswerOutcome::Correct
        } else {
            debug!(spoken, word = %item.word, "no match");
            self.state.status = StatusMessage::Retry;
            AnswerOutcome::Retry
        }
    }

    // === Event loop ===

    /// Process every queued recognizer event, then any due advance.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
        self.advance_if_due();
    }

    /// Process queued events and wait out a pending advance.
    ///
    /// Returns once the round is idle: no advance is scheduled.
    pub async fn settle(&mut self) {
        self.drain_events();
        while let Some(deadline) = self.pending_advance {
            tokio::time::sleep_until(deadline).await;
            self.drain_events();
        }
    }

    /// Wait for the next recognizer event or the advance deadline and
    /// process it.
    ///
    /// Returns `false` once nothing further can happen: the round is over,
    /// or the recognizer is gone and no advance is pending.
    pub async fn pump(&mut self) -> bool {
        if !self.phase.is_playing() {
            return false;
        }
        let deadline = self.pending_advance;

        tokio::select! {
            biased;
            event = self.events.recv() => match event {
                Some(event) => {
                    self.handle_event(event);
                    self.advance_if_due();
                }
                // Recognizer gone: only the pending advance is left.
                None => match deadline {
                    Some(deadline) => {
                        tokio::time::sleep_until(deadline).await;
                        self.advance_if_due();
                    }
                    None => return false,
                },
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                if deadline.is_some() => self.advance_if_due(),
        }

        self.phase.is_playing()
    }

    fn handle_event(&mut self, event: RecognitionEvent) {
        if !self.phase.is_playing() {
            debug!(?event, "event after round ended, ignoring");
            return;
        }

        match event {
            RecognitionEvent::Result(text) => {
                self.state.recognized_text = text.clone();
                self.check_answer(&text);
            }
            RecognitionEvent::End => self.end_listening(),
            RecognitionEvent::Error(code) => match classify_error(&code) {
                RecognitionErrorKind::Recoverable => {
                    debug!(code = %code, "no speech matched");
                    self.end_listening();
                }
                RecognitionErrorKind::Fatal => {
                    warn!(code = %code, "speech recognition failed");
                    self.state.is_listening = false;
                    self.state.status = StatusMessage::Error;
                }
            },
        }
    }

    fn end_listening(&mut self) {
        self.state.is_listening = false;
        self.state.status = StatusMessage::Idle;
    }

    fn fail_start(&mut self, failure: StartFailure) {
        warn!(error = %failure, "recognizer did not start");
        self.state.is_listening = false;
        self.state.status = StatusMessage::Error;
        self.last_start_failure = Some(failure);
    }

    fn resolve_correct(&mut self, item: &WordItem) {
        let time_taken = self
            .state
            .started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(scoring::FALLBACK_SECONDS);

        self.ledger.push(WordStat::correct(item, time_taken));
        self.state.score += scoring::CORRECT_AWARD;
        self.state.status = StatusMessage::Correct;

        match self.progression.grant_xp(scoring::CORRECT_XP) {
            Ok(grant) => self.last_grant = Some(grant),
            Err(err) => warn!(error = %err, "xp not granted"),
        }

        info!(
            word = %item.word,
            index = self.state.current_index,
            score = self.state.score,
            time_taken,
            "correct"
        );
        self.pending_advance = Some(Instant::now() + self.advance_delay);
    }

    async fn pass(&mut self, command: &'static str) {
        if !self.phase.is_playing() {
            debug!(command, phase = ?self.phase, "ignored, round not playing");
            return;
        }
        if self.state.is_listening {
            self.gateway.stop().await;
            self.state.is_listening = false;
        }
        // A transcript flushed by the stop may still resolve the word.
        self.drain_events();
        if !self.phase.is_playing() {
            return;
        }

        if self.pending_advance.is_none() {
            let Some(item) = self.state.current_word().cloned() else {
                return;
            };
            debug!(command, word = %item.word, index = self.state.current_index, "passed");
            self.ledger.push(WordStat::skipped(&item));
        }
        self.advance_word();
    }

    fn advance_if_due(&mut self) {
        if self
            .pending_advance
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            self.advance_word();
        }
    }

    fn advance_word(&mut self) {
        self.pending_advance = None;
        if self.ledger.len() == self.state.words.len() {
            self.complete();
            return;
        }
        self.state.advance();
        if self.state.is_listening {
            // Still listening into the next word, so its clock starts now.
            self.state.started_at = Some(Instant::now());
            self.state.status = StatusMessage::Listening;
        }
        debug_assert_eq!(self.ledger.len(), self.state.current_index);
    }

    fn complete(&mut self) {
        self.phase = RoundPhase::Completed;
        self.state.is_listening = false;
        let summary = SessionSummary::new(self.state.score, self.ledger.clone());
        info!(
            score = summary.final_score,
            words = summary.round_words.len(),
            correct = summary.correct_count(),
            "round complete"
        );
        self.summary = Some(summary);
        self.teardown();
    }

    // === Lifecycle ===

    /// Release the recognizer. Safe to call from any exit path; only the
    /// first call reaches the gateway. Events sent afterwards are dropped.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.events.close();
        self.pending_advance = None;
        self.state.is_listening = false;
        self.gateway.teardown();
        if !self.phase.is_terminal() {
            debug!(phase = ?self.phase, "round abandoned");
            self.phase = RoundPhase::Abandoned;
        }
    }

    /// Leave the round early (navigation away).
    pub fn abandon(mut self) {
        self.teardown();
    }

    // === Accessors ===

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn ledger(&self) -> &StatsLedger {
        &self.ledger
    }

    pub fn words(&self) -> &[WordItem] {
        &self.state.words
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> RoundView {
        RoundView::new(&self.state, self.phase)
    }

    /// Whether a correct answer is waiting for the display delay.
    pub fn is_advance_pending(&self) -> bool {
        self.pending_advance.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Progression result of the latest XP grant in this round.
    pub fn last_grant(&self) -> Option<XpGrant> {
        self.last_grant
    }

    pub fn last_start_failure(&self) -> Option<&StartFailure> {
        self.last_start_failure.as_ref()
    }

    /// The summary, once the round has completed.
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Hand the summary over. Returns it only once.
    pub fn take_summary(&mut self) -> Option<SessionSummary> {
        self.summary.take()
    }
}

impl<G: RecognitionGateway> Drop for RoundController<G> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::{ScriptHandle, ScriptedGateway, ScriptedTurn};
    use crate::storage::MemorySnapshotStore;

    fn items(words: &[&str]) -> Vec<WordItem> {
        words
            .iter()
            .map(|w| WordItem::new(*w, format!("images/{}.png", w.to_lowercase())))
            .collect()
    }

    fn progression() -> Arc<ProgressionStore> {
        Arc::new(ProgressionStore::open(MemorySnapshotStore::new()))
    }

    fn round_with(
        words: &[&str],
        gateway: ScriptedGateway,
    ) -> (RoundController<ScriptedGateway>, Arc<ProgressionStore>) {
        let progression = progression();
        let round = RoundController::new(
            items(words),
            gateway,
            Arc::clone(&progression),
            &RoundSettings::default(),
        );
        (round, progression)
    }

    fn round(
        words: &[&str],
    ) -> (
        RoundController<ScriptedGateway>,
        ScriptHandle,
        Arc<ProgressionStore>,
    ) {
        let (gateway, script) = ScriptedGateway::new();
        let (round, progression) = round_with(words, gateway);
        (round, script, progression)
    }

    #[test]
    fn test_matches_word() {
        assert!(matches_word("apple", "Apple"));
        assert!(matches_word("Apple ", "Apple"));
        assert!(matches_word("APPLE", "Apple"));
        assert!(!matches_word("apples", "Apple"));
        assert!(!matches_word("", "Apple"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_correct_answer_scores_and_advances() {
        let (mut round, script, progression) = round(&["Cat", "Dog"]);
        assert!(round.start_speaking().await);
        tokio::time::advance(Duration::from_millis(2500)).await;

        let sink = script.sink().unwrap();
        sink.result("cat");
        round.drain_events();

        assert_eq!(round.state().status, StatusMessage::Correct);
        assert_eq!(round.state().score, 100);
        assert_eq!(round.ledger().len(), 1);
        let stat = &round.ledger().entries()[0];
        assert_eq!(stat.word, "Cat");
        assert!(stat.credited);
        assert!((stat.time_taken_seconds - 2.5).abs() < 1e-6);
        assert!(round.is_advance_pending());
        assert_eq!(round.state().current_index, 0);

        round.settle().await;
        assert_eq!(round.state().current_index, 1);
        assert_eq!(round.state().status, StatusMessage::Listening);
        assert_eq!(round.state().started_at, Some(Instant::now()));
        assert_eq!(progression.snapshot().unwrap().xp, 10);
        assert_eq!(round.last_grant().unwrap().xp, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_answer_retries() {
        let (mut round, script, _) = round(&["Cat"]);
        script.push(ScriptedTurn::Hold);
        round.start_speaking().await;
        script.sink().unwrap().result("hat");
        round.drain_events();

        assert_eq!(round.state().status, StatusMessage::Retry);
        assert_eq!(round.state().recognized_text, "hat");
        assert!(round.state().is_listening);
        assert!(round.ledger().is_empty());
        assert_eq!(round.state().score, 0);
        assert!(!round.is_advance_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_variants_each_correct_once() {
        for spoken in ["apple", "Apple ", "APPLE"] {
            let (mut round, script, progression) = round(&["Apple"]);
            script.push(ScriptedTurn::heard(spoken));
            round.start_speaking().await;
            round.settle().await;

            assert_eq!(round.phase(), RoundPhase::Completed, "{spoken:?}");
            let summary = round.take_summary().unwrap();
            assert_eq!(summary.final_score, 100);
            assert_eq!(summary.round_words.len(), 1);
            assert_eq!(progression.snapshot().unwrap().xp, 10);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_result_while_advance_pending_is_ignored() {
        let (mut round, script, progression) = round(&["Cat", "Dog"]);
        round.start_speaking().await;
        let sink = script.sink().unwrap();
        sink.result("cat");
        sink.result("cat");
        round.drain_events();

        assert_eq!(round.ledger().len(), 1);
        assert_eq!(round.state().score, 100);
        assert_eq!(progression.snapshot().unwrap().xp, 10);
        assert_eq!(round.check_answer("cat"), AnswerOutcome::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_result_judged_against_current_word() {
        let (mut round, script, _) = round(&["Cat", "Dog"]);
        script.push(ScriptedTurn::heard("cat"));
        round.start_speaking().await;
        round.settle().await;
        assert_eq!(round.state().current_index, 1);

        // A straggler for the word already left behind.
        script.sink().unwrap().result("cat");
        round.drain_events();

        assert_eq!(round.ledger().len(), 1);
        assert_eq!(round.state().status, StatusMessage::Retry);
        assert_eq!(round.state().score, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_resets_status_after_result() {
        let (mut round, script, _) = round(&["Cat"]);
        script.push(ScriptedTurn::heard("bat"));
        round.start_speaking().await;
        round.drain_events();

        assert_eq!(round.state().status, StatusMessage::Idle);
        assert_eq!(round.state().recognized_text, "bat");
        assert!(!round.state().is_listening);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_start_records_no_time() {
        let (mut round, script, _) = round(&["Cat"]);
        script.push(ScriptedTurn::Busy);

        assert!(!round.start_speaking().await);
        assert_eq!(round.state().status, StatusMessage::Error);
        assert!(round.state().started_at.is_none());
        assert!(!round.state().is_listening);
        assert_eq!(round.last_start_failure(), Some(&StartFailure::Busy));

        // The fallback time applies if a result still arrives.
        script.sink().unwrap().result("cat");
        round.drain_events();
        assert_eq!(round.ledger().entries()[0].time_taken_seconds, 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_requested_once() {
        let (mut round, script, _) = round(&["Cat", "Dog"]);
        script.extend([ScriptedTurn::Silence, ScriptedTurn::Silence]);

        round.start_speaking().await;
        round.drain_events();
        round.start_speaking().await;

        let calls = script.calls();
        assert_eq!(calls.permission_requests, 1);
        assert_eq!(calls.starts, vec!["en-US".to_string(), "en-US".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_blocks_start() {
        let (mut round, script, _) = round(&["Cat"]);
        script.deny_permission();

        assert!(!round.start_speaking().await);
        assert_eq!(
            round.last_start_failure(),
            Some(&StartFailure::PermissionDenied)
        );
        assert_eq!(round.state().status, StatusMessage::Error);
        assert!(script.calls().starts.is_empty());

        // Asked again on the next attempt.
        round.start_speaking().await;
        assert_eq!(script.calls().permission_requests, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recoverable_error_is_silent() {
        let (mut round, script, _) = round(&["Cat"]);
        script.push(ScriptedTurn::fails("7/No match"));
        round.start_speaking().await;
        round.drain_events();

        assert_eq!(round.state().status, StatusMessage::Idle);
        assert!(!round.state().is_listening);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_prompts_retry() {
        let (mut round, script, _) = round(&["Cat"]);
        script.push(ScriptedTurn::fails("network"));
        round.start_speaking().await;
        round.drain_events();

        assert_eq!(round.state().status, StatusMessage::Error);
        assert!(!round.state().is_listening);
        assert_eq!(round.phase(), RoundPhase::Playing);

        // Still playable.
        script.push(ScriptedTurn::heard("cat"));
        assert!(round.start_speaking().await);
        round.settle().await;
        assert_eq!(round.phase(), RoundPhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_does_not_advance() {
        let (mut round, script, _) = round(&["Cat", "Dog"]);
        script.extend([ScriptedTurn::Hold, ScriptedTurn::Hold]);
        round.start_speaking().await;

        round.stop_speaking().await;
        assert!(!round.state().is_listening);
        assert_eq!(round.state().current_index, 0);
        assert_eq!(script.calls().stops, 1);

        // The End flushed by the stop must not cancel the next listen.
        assert!(round.start_speaking().await);
        round.drain_events();
        assert!(round.state().is_listening);
        assert_eq!(round.state().status, StatusMessage::Listening);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_mic() {
        let (mut round, script, _) = round(&["Cat"]);
        script.push(ScriptedTurn::Hold);

        assert!(round.toggle_mic().await);
        assert!(round.state().is_listening);
        assert!(!round.toggle_mic().await);
        assert!(!round.state().is_listening);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_and_give_up_complete_round_in_order() {
        let (mut round, script, progression) = round(&["Cat", "Dog"]);

        round.skip().await;
        assert_eq!(round.state().current_index, 1);
        round.give_up().await;

        assert_eq!(round.phase(), RoundPhase::Completed);
        let summary = round.take_summary().unwrap();
        assert_eq!(summary.final_score, 0);
        let words: Vec<&str> = summary.round_words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["Cat", "Dog"]);
        assert!(summary
            .round_words
            .iter()
            .all(|w| w.time_taken_seconds == 10.0 && !w.credited));
        assert_eq!(progression.snapshot().unwrap().xp, 0);
        assert_eq!(script.calls().teardowns, 1);
        assert!(round.take_summary().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_while_listening_stops_recognizer() {
        let (mut round, script, _) = round(&["Cat", "Dog"]);
        script.push(ScriptedTurn::Hold);
        round.start_speaking().await;

        round.skip().await;

        assert_eq!(script.calls().stops, 1);
        assert!(!round.state().is_listening);
        assert_eq!(round.ledger().len(), 1);
        assert_eq!(round.state().current_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_after_correct_does_not_double_count() {
        let (mut round, script, _) = round(&["Cat", "Dog"]);
        round.start_speaking().await;
        script.sink().unwrap().result("cat");
        round.drain_events();

        round.skip().await;

        assert_eq!(round.ledger().len(), 1);
        assert!(round.ledger().entries()[0].credited);
        assert_eq!(round.state().current_index, 1);
        assert!(!round.is_advance_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_after_teardown_is_noop() {
        let (mut round, script, _) = round(&["Cat", "Dog"]);
        let sink = script.sink().unwrap();

        round.teardown();
        round.teardown();

        assert!(!sink.result("cat"));
        round.drain_events();
        assert!(round.ledger().is_empty());
        assert_eq!(round.phase(), RoundPhase::Abandoned);
        assert!(!round.start_speaking().await);

        drop(round);
        assert_eq!(script.calls().teardowns, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_event_after_completion_ignored() {
        let (mut round, script, _) = round(&["Cat"]);
        let sink = script.sink().unwrap();
        round.skip().await;
        assert_eq!(round.phase(), RoundPhase::Completed);

        sink.result("cat");
        sink.error("network");
        round.drain_events();
        assert_eq!(round.summary().unwrap().final_score, 0);
        assert_eq!(round.ledger().len(), 1);
    }

    #[tokio::test]
    async fn test_drop_tears_down_once() {
        let (round, script, _) = round(&["Cat"]);
        drop(round);
        assert_eq!(script.calls().teardowns, 1);

        let (round, script, _) = self::round(&["Cat"]);
        round.abandon();
        assert_eq!(script.calls().teardowns, 1);
    }

    #[tokio::test]
    async fn test_empty_round_accepts_nothing() {
        let (mut round, script, _) = round(&[]);
        assert_eq!(round.phase(), RoundPhase::NoData);

        assert!(!round.start_speaking().await);
        round.skip().await;
        assert_eq!(round.check_answer("cat"), AnswerOutcome::Ignored);

        assert!(round.ledger().is_empty());
        assert!(script.calls().starts.is_empty());
        assert_eq!(round.view().total, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_registered_once_per_round() {
        let (mut round, script, _) = round(&["Cat", "Dog", "Fox"]);
        script.extend([
            ScriptedTurn::heard("cat"),
            ScriptedTurn::heard("dog"),
            ScriptedTurn::heard("fox"),
        ]);
        for _ in 0..3 {
            round.start_speaking().await;
            round.settle().await;
        }

        assert_eq!(round.phase(), RoundPhase::Completed);
        let calls = script.calls();
        assert_eq!(calls.registrations, 1);
        assert_eq!(calls.teardowns, 1);
        assert_eq!(round.summary().unwrap().final_score, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pump_with_delivery_latency() {
        let (gateway, script) = ScriptedGateway::new();
        let (mut round, _) =
            round_with(&["Cat", "Dog"], gateway.with_latency(Duration::from_millis(300)));
        script.push(ScriptedTurn::heard("cat"));
        round.start_speaking().await;

        while round.state().current_index == 0 {
            assert!(round.pump().await);
        }

        let stat = &round.ledger().entries()[0];
        assert!((stat.time_taken_seconds - 0.3).abs() < 0.01);
        assert_eq!(round.state().status, StatusMessage::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_word_timed_while_still_listening() {
        let (mut round, script, _) = round(&["Cat", "Dog"]);
        script.push(ScriptedTurn::Hold);
        round.start_speaking().await;
        let sink = script.sink().unwrap();

        sink.result("cat");
        round.settle().await;
        assert_eq!(round.state().current_index, 1);
        assert!(round.state().is_listening);
        assert_eq!(round.state().status, StatusMessage::Listening);
        assert!(round.state().started_at.is_some());

        tokio::time::advance(Duration::from_millis(1500)).await;
        sink.result("dog");
        round.drain_events();

        let stat = &round.ledger().entries()[1];
        assert!(stat.credited);
        assert!((stat.time_taken_seconds - 1.5).abs() < 1e-6);
    }

    /// Drops the listener on registration, as a recognizer that goes away
    /// mid-round would.
    struct DroppingGateway;

    #[async_trait::async_trait]
    impl RecognitionGateway for DroppingGateway {
        fn register_listeners(&mut self, sink: RecognitionSink) {
            drop(sink);
        }

        async fn start(&mut self, _locale: &str) -> Result<(), StartFailure> {
            Ok(())
        }

        async fn stop(&mut self) {}

        fn teardown(&mut self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_pump_waits_out_advance_after_recognizer_gone() {
        let mut round = RoundController::new(
            items(&["Cat", "Dog"]),
            DroppingGateway,
            progression(),
            &RoundSettings::default(),
        );
        let begin = Instant::now();
        assert_eq!(round.check_answer("cat"), AnswerOutcome::Correct);

        for _ in 0..3 {
            if round.state().current_index == 1 {
                break;
            }
            round.pump().await;
        }

        assert_eq!(round.state().current_index, 1);
        assert!(begin.elapsed() >= Duration::from_millis(1000));
        // Nothing left to wait for.
        assert!(!round.pump().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_xp_not_granted_while_loading() {
        let (gateway, script) = ScriptedGateway::new();
        let progression = Arc::new(ProgressionStore::new(MemorySnapshotStore::new()));
        let mut round = RoundController::new(
            items(&["Cat"]),
            gateway,
            Arc::clone(&progression),
            &RoundSettings::default(),
        );
        script.push(ScriptedTurn::heard("cat"));
        round.start_speaking().await;
        round.settle().await;

        assert_eq!(round.summary().unwrap().final_score, 100);
        assert!(round.last_grant().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_draws_from_vocabulary() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let (gateway, _script) = ScriptedGateway::new();
        let config = RoundConfig::new("food", 5).unwrap();
        let round = RoundController::setup(
            &Vocabulary::builtin(),
            &config,
            &mut StdRng::seed_from_u64(3),
            gateway,
            progression(),
            &RoundSettings::default(),
        );

        assert_eq!(round.words().len(), 2);
        assert_eq!(round.view().progress_label(), "1 / 2");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property: each resolved or passed word adds exactly one ledger
            // entry, and the round completes exactly when every word has one
            #[test]
            fn prop_ledger_grows_one_per_word(answers in prop::collection::vec(any::<bool>(), 1..8)) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .start_paused(true)
                    .build()
                    .unwrap();

                runtime.block_on(async {
                    let names: Vec<String> = (0..answers.len()).map(|i| format!("w{i}")).collect();
                    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                    let (mut round, script, _) = round(&refs);

                    for (i, correct) in answers.iter().enumerate() {
                        prop_assert_eq!(round.ledger().len(), i);
                        prop_assert_eq!(round.phase(), RoundPhase::Playing);
                        if *correct {
                            script.push(ScriptedTurn::heard(names[i].clone()));
                            round.start_speaking().await;
                            round.settle().await;
                        } else {
                            round.skip().await;
                        }
                        prop_assert_eq!(round.ledger().len(), i + 1);
                    }

                    prop_assert_eq!(round.phase(), RoundPhase::Completed);
                    let summary = round.take_summary().unwrap();
                    let credited = answers.iter().filter(|c| **c).count() as u32;
                    prop_assert_eq!(summary.final_score, credited * 100);
                    prop_assert_eq!(summary.round_words.len(), answers.len());
                    Ok(())
                })?;
            }
        }
    }
}
