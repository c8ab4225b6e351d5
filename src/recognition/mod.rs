//! Speech recognition boundary.
//!
//! The round controller only ever talks to a [`RecognitionGateway`]; the
//! scripted implementation backs the CLI and the tests.

pub mod gateway;
pub mod scripted;

pub use gateway::{
    classify_error, RecognitionErrorKind, RecognitionEvent, RecognitionGateway, RecognitionSink,
    StartFailure, RECOVERABLE_ERROR_CODES,
};
pub use scripted::{GatewayCalls, ScriptHandle, ScriptedGateway, ScriptedTurn};
