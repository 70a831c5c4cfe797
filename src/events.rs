//! Closed event model for everything the engine pushes back to the caller.
//!
//! Engine callbacks are mapped onto tagged variants delivered through a single
//! ordered channel per session rather than per-event handler registration.

use serde::{Deserialize, Serialize};

/// Events raised by the engine during a recognition session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecognitionEvent {
    /// Interim hypothesis; forwarded even when the text is empty.
    Recognizing(String),
    /// Final result; empty text is suppressed before it reaches the caller.
    Recognized(String),
    /// Engine aborted the session; carries the engine's error detail.
    Canceled(String),
    SessionStarted,
    SessionStopped,
    SpeechStartDetected,
    SpeechEndDetected,
}

impl RecognitionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RecognitionEvent::Recognizing(_) => "recognizing",
            RecognitionEvent::Recognized(_) => "recognized",
            RecognitionEvent::Canceled(_) => "recognizer-canceled",
            RecognitionEvent::SessionStarted => "recognizer-session-started",
            RecognitionEvent::SessionStopped => "recognizer-session-stopped",
            RecognitionEvent::SpeechStartDetected => "recognizer-start-detected",
            RecognitionEvent::SpeechEndDetected => "recognizer-end-detected",
        }
    }
}

/// Events raised by the engine during a synthesis session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SynthesisEvent {
    Connected,
    Disconnected,
    /// A streamed audio chunk was produced.
    Synthesizing,
    Started,
    Completed,
    BookmarkReached,
    /// Carries the engine's error detail string.
    Canceled(String),
    VisemeReceived,
    WordBoundary,
}

impl SynthesisEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SynthesisEvent::Connected => "synthesizer-connected",
            SynthesisEvent::Disconnected => "synthesizer-disconnected",
            SynthesisEvent::Synthesizing => "synthesizing",
            SynthesisEvent::Started => "synthesizer-started",
            SynthesisEvent::Completed => "synthesizer-completed",
            SynthesisEvent::BookmarkReached => "synthesizer-bookmark-reached",
            SynthesisEvent::Canceled(_) => "synthesizer-canceled",
            SynthesisEvent::VisemeReceived => "synthesizer-viseme-received",
            SynthesisEvent::WordBoundary => "synthesizer-word-boundary",
        }
    }
}

/// Everything the bridge pushes to the caller, in delivery order per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BridgeEvent {
    /// Loudness of the latest captured frame, in decibels.
    VolumeChange(f64),
    Recognition(RecognitionEvent),
    Synthesis(SynthesisEvent),
    /// Out-of-band failure notification mirroring a result error.
    Exception(String),
}

impl BridgeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::VolumeChange(_) => "volume-change",
            BridgeEvent::Recognition(e) => e.name(),
            BridgeEvent::Synthesis(e) => e.name(),
            BridgeEvent::Exception(_) => "exception",
        }
    }
}
