//! Capability boundary to the external speech engine.
//!
//! The engine itself (cloud transport, recognition, synthesis) lives behind
//! these object-safe traits; the bridge only orchestrates streaming, timing,
//! and lifecycle around it. Engine implementations raise their callbacks
//! through the event sinks, from whatever thread they like.

use crate::audio::frame::{AudioFormat, AudioFrame, ENGINE_FORMAT};
use crate::credentials::Credentials;
use crate::dispatch::{RecognitionEventSink, SynthesisEventSink};
use crate::Result;
use std::sync::Arc;

/// Per-session recognition settings applied before the stream opens.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionConfig {
    pub format: AudioFormat,
    pub language: Option<String>,
    pub word_level_timestamps: bool,
}

impl RecognitionConfig {
    /// Canonical config: engine format, word-level timestamps always on.
    pub fn new(language: Option<String>) -> Self {
        Self {
            format: ENGINE_FORMAT,
            language,
            word_level_timestamps: true,
        }
    }
}

/// Entry point: credentials in, opaque handle out.
pub trait SpeechEngine: Send + Sync {
    /// Exchange validated credentials for an engine handle. Fails with
    /// `EngineRejected` when the engine refuses the token/region pair.
    fn configure(&self, credentials: &Credentials) -> Result<Arc<dyn EngineHandle>>;
}

/// Opaque configured-engine handle, shared by both session controllers.
pub trait EngineHandle: Send + Sync {
    /// Update the authorization token in place; must not invalidate the
    /// handle or any open stream.
    fn rotate_token(&self, token: &str) -> Result<()>;

    /// Open a continuous recognition stream for the given config. Events are
    /// raised through `events` for the stream's whole lifetime.
    fn open_recognition_stream(
        &self,
        config: RecognitionConfig,
        events: RecognitionEventSink,
    ) -> Result<Box<dyn RecognitionStream>>;

    /// Create a synthesizer plus its connection. Events are raised through
    /// `events` until the channel is closed.
    fn open_synthesis_channel(&self, events: SynthesisEventSink)
        -> Result<Box<dyn SynthesisChannel>>;
}

/// One continuous recognition stream.
///
/// The audio sink is separable so the capture producer loop can own it on its
/// own thread while the controller keeps the stream for stop/teardown.
pub trait RecognitionStream: Send {
    /// Take the push-audio half of the stream. Called once per stream.
    fn take_audio_sink(&mut self) -> Box<dyn AudioSink>;

    /// Begin continuous recognition.
    fn start(&mut self) -> Result<()>;

    /// End continuous recognition; blocks until the engine acknowledges.
    fn stop(&mut self) -> Result<()>;
}

/// Write-only audio feed into an open recognition stream.
pub trait AudioSink: Send {
    fn write(&mut self, frame: &AudioFrame) -> Result<()>;

    /// Signal end of audio. Idempotent.
    fn close(&mut self);
}

/// One synthesis session: a synthesizer and its service connection, which may
/// carry several successive speak requests.
pub trait SynthesisChannel: Send {
    /// (Re)open the service connection ahead of speaking.
    fn open_connection(&mut self) -> Result<()>;

    /// Update the authorization token on the live synthesizer.
    fn rotate_token(&mut self, token: &str) -> Result<()>;

    /// Submit a markup document for speaking.
    fn speak_ssml(&mut self, ssml: &str) -> Result<()>;

    /// Interrupt the current utterance; blocks until the engine acknowledges.
    /// The connection stays usable for subsequent speak requests.
    fn stop_speaking(&mut self) -> Result<()>;

    /// Tear down the synthesizer and connection. Idempotent.
    fn close(&mut self);
}
