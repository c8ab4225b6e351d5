//! Boundary around the platform speech recognizer.
//!
//! The recognizer accepts exactly one listener registration for the life of
//! a round. Instead of callbacks that close over round state, the listener
//! is a [`RecognitionSink`]: the sending half of a queue that the round
//! controller drains, reading its own live state for every event.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Event delivered by the recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Best transcription of what was heard.
    Result(String),
    /// The recognizer stopped listening.
    End,
    /// The recognizer failed with a platform error code.
    Error(String),
}

/// Listener handle given to the gateway once per round.
///
/// Sends never fail loudly: after the round tears down, events are dropped.
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    tx: mpsc::UnboundedSender<RecognitionEvent>,
}

impl RecognitionSink {
    /// Create a sink and the receiver the round controller drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RecognitionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver a transcription. Returns `false` if nobody is listening.
    pub fn result(&self, text: impl Into<String>) -> bool {
        self.send(RecognitionEvent::Result(text.into()))
    }

    /// Deliver end-of-speech.
    pub fn end(&self) -> bool {
        self.send(RecognitionEvent::End)
    }

    /// Deliver a platform error code.
    pub fn error(&self, code: impl Into<String>) -> bool {
        self.send(RecognitionEvent::Error(code.into()))
    }

    /// Deliver any event.
    pub fn send(&self, event: RecognitionEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                debug!(?event, "dropping recognition event after teardown");
                false
            }
        }
    }

    /// Whether the receiving round has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Why the recognizer refused to start.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StartFailure {
    #[error("speech recognizer is already active")]
    Busy,
    #[error("microphone permission was not granted")]
    PermissionDenied,
    #[error("speech recognizer unavailable: {0}")]
    Unavailable(String),
}

/// How the round treats a recognizer error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Nothing matched or nothing was heard; handled like end-of-speech.
    Recoverable,
    /// Anything else; surfaced as a retry prompt.
    Fatal,
}

/// Error codes meaning "no match" or "no speech input".
///
/// Android reports `7` (no match) and `6` (speech timeout), often as
/// `"7/No match"`; iOS reports `1110` for no speech detected.
pub const RECOVERABLE_ERROR_CODES: &[&str] =
    &["7", "6", "1110", "no_match", "no_input", "speech_timeout"];

/// Classify a recognizer error code.
pub fn classify_error(code: &str) -> RecognitionErrorKind {
    let code = code.trim();
    let head = code.split('/').next().unwrap_or(code).trim();
    let normalized = head.to_ascii_lowercase().replace(['-', ' '], "_");

    if RECOVERABLE_ERROR_CODES.contains(&normalized.as_str()) {
        RecognitionErrorKind::Recoverable
    } else {
        RecognitionErrorKind::Fatal
    }
}

/// Contract of the platform speech recognizer.
#[async_trait]
pub trait RecognitionGateway: Send {
    /// Install the listener, replacing any previous one. The round
    /// controller calls this exactly once.
    fn register_listeners(&mut self, sink: RecognitionSink);

    /// Ask for microphone permission. Platforms without a permission model
    /// grant it.
    async fn request_permission(&mut self) -> bool {
        true
    }

    /// Begin listening in `locale`.
    async fn start(&mut self, locale: &str) -> Result<(), StartFailure>;

    /// Stop listening. Idempotent.
    async fn stop(&mut self);

    /// Release the recognizer and drop the listener.
    fn teardown(&mut self);
}
