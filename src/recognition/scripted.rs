//! Scripted recognizer.
//!
//! Each `start` consumes the next [`ScriptedTurn`]. The CLI feeds it typed
//! lines; tests use it to stage busy starts, error codes and late events.
//! A [`ScriptHandle`] stays with the caller after the gateway moves into a
//! round controller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::recognition::gateway::{
    RecognitionEvent, RecognitionGateway, RecognitionSink, StartFailure,
};

/// What the recognizer does on one `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedTurn {
    /// Hears `text`, then ends.
    Heard(String),
    /// Fails with the given error code.
    Fails(String),
    /// Ends without a transcript.
    Silence,
    /// Refuses to start because another session is active.
    Busy,
    /// Keeps listening and emits nothing.
    Hold,
}

impl ScriptedTurn {
    pub fn heard(text: impl Into<String>) -> Self {
        Self::Heard(text.into())
    }

    pub fn fails(code: impl Into<String>) -> Self {
        Self::Fails(code.into())
    }
}

/// Calls the gateway has received, for assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayCalls {
    pub registrations: usize,
    pub permission_requests: usize,
    pub starts: Vec<String>,
    pub stops: usize,
    pub teardowns: usize,
}

#[derive(Debug)]
struct ScriptState {
    turns: VecDeque<ScriptedTurn>,
    calls: GatewayCalls,
    sink: Option<RecognitionSink>,
    permission_granted: bool,
    active: bool,
    torn_down: bool,
}

impl Default for ScriptState {
    fn default() -> Self {
        Self {
            turns: VecDeque::new(),
            calls: GatewayCalls::default(),
            sink: None,
            permission_granted: true,
            active: false,
            torn_down: false,
        }
    }
}

/// Caller-side handle to a [`ScriptedGateway`].
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptHandle {
    /// Queue a turn for a later `start`.
    pub fn push(&self, turn: ScriptedTurn) {
        self.lock().turns.push_back(turn);
    }

    /// Queue several turns.
    pub fn extend(&self, turns: impl IntoIterator<Item = ScriptedTurn>) {
        self.lock().turns.extend(turns);
    }

    /// Number of turns not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().turns.len()
    }

    /// Snapshot of the calls made so far.
    pub fn calls(&self) -> GatewayCalls {
        self.lock().calls.clone()
    }

    /// The listener currently registered, if any. Lets tests deliver events
    /// on the recognizer's behalf at arbitrary times.
    pub fn sink(&self) -> Option<RecognitionSink> {
        self.lock().sink.clone()
    }

    /// Whether the recognizer is currently listening.
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Refuse the next permission requests.
    pub fn deny_permission(&self) {
        self.lock().permission_granted = false;
    }

    /// Finish the active listen with a transcript, as a `Heard` turn would.
    pub fn hear(&self, text: impl Into<String>) {
        self.deliver(vec![RecognitionEvent::Result(text.into()), RecognitionEvent::End]);
    }

    /// Finish the active listen with an error code.
    pub fn fail(&self, code: impl Into<String>) {
        self.deliver(vec![RecognitionEvent::Error(code.into())]);
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Send events through the registered listener, unless torn down.
    fn deliver(&self, events: Vec<RecognitionEvent>) {
        let mut state = self.lock();
        if state.torn_down {
            debug!("scripted recognizer torn down, dropping events");
            return;
        }
        let Some(sink) = state.sink.clone() else {
            debug!("no listener registered, dropping events");
            return;
        };
        for event in events {
            let finishes = matches!(event, RecognitionEvent::End | RecognitionEvent::Error(_));
            sink.send(event);
            if finishes {
                state.active = false;
            }
        }
    }
}

/// Recognizer that plays back queued [`ScriptedTurn`]s.
#[derive(Debug)]
pub struct ScriptedGateway {
    script: ScriptHandle,
    latency: Option<Duration>,
}

impl ScriptedGateway {
    /// Create a gateway and its handle.
    pub fn new() -> (Self, ScriptHandle) {
        let script = ScriptHandle::default();
        (
            Self {
                script: script.clone(),
                latency: None,
            },
            script,
        )
    }

    /// Deliver each turn's events after `latency` on a spawned task instead
    /// of before `start` returns.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn emit(&self, events: Vec<RecognitionEvent>) {
        match self.latency {
            None => self.script.deliver(events),
            Some(latency) => {
                let script = self.script.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(latency).await;
                    script.deliver(events);
                });
            }
        }
    }
}

#[async_trait]
impl RecognitionGateway for ScriptedGateway {
    fn register_listeners(&mut self, sink: RecognitionSink) {
        let mut state = self.script.lock();
        state.calls.registrations += 1;
        state.sink = Some(sink);
    }

    async fn request_permission(&mut self) -> bool {
        let mut state = self.script.lock();
        state.calls.permission_requests += 1;
        state.permission_granted
    }

    async fn start(&mut self, locale: &str) -> Result<(), StartFailure> {
        let turn = {
            let mut state = self.script.lock();
            state.calls.starts.push(locale.to_string());

            if state.torn_down {
                return Err(StartFailure::Unavailable("recognizer torn down".into()));
            }
            if state.active {
                return Err(StartFailure::Busy);
            }

            let turn = state.turns.pop_front().unwrap_or(ScriptedTurn::Hold);
            if turn == ScriptedTurn::Busy {
                return Err(StartFailure::Busy);
            }
            state.active = true;
            turn
        };

        match turn {
            ScriptedTurn::Heard(text) => {
                self.emit(vec![RecognitionEvent::Result(text), RecognitionEvent::End])
            }
            ScriptedTurn::Fails(code) => self.emit(vec![RecognitionEvent::Error(code)]),
            ScriptedTurn::Silence => self.emit(vec![RecognitionEvent::End]),
            ScriptedTurn::Hold | ScriptedTurn::Busy => {}
        }

        Ok(())
    }

    async fn stop(&mut self) {
        let was_active = {
            let mut state = self.script.lock();
            state.calls.stops += 1;
            state.active
        };

        if was_active {
            self.script.deliver(vec![RecognitionEvent::End]);
        }
    }

    fn teardown(&mut self) {
        let mut state = self.script.lock();
        state.calls.teardowns += 1;
        state.torn_down = true;
        state.active = false;
        state.sink = None;
    }
}
