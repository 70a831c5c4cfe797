//! Recognition session lifecycle: one capture pipeline, one engine stream,
//! never two at once.

use crate::audio::source::{DeviceGuard, SourceFactory, VolumeCallback};
use crate::credentials::CredentialStore;
use crate::dispatch::{EventDispatcher, RecognitionEventSink};
use crate::engine::{EngineHandle, RecognitionConfig, RecognitionStream};
use crate::events::BridgeEvent;
use crate::Result;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionState {
    Idle,
    Configuring,
    Active,
    Stopping,
}

struct ActiveSession {
    id: Uuid,
    stream: Box<dyn RecognitionStream>,
    device: Box<dyn DeviceGuard>,
    producer: Option<JoinHandle<()>>,
}

/// State machine coordinating the capture pipeline, the engine's recognition
/// stream, and event delivery.
///
/// Lives on the bridge worker thread; the device guard it holds is not Send.
pub struct RecognitionSessionController {
    store: Arc<CredentialStore>,
    dispatcher: EventDispatcher,
    source_factory: SourceFactory,
    session: Option<ActiveSession>,
    state: RecognitionState,
}

impl RecognitionSessionController {
    pub fn new(
        store: Arc<CredentialStore>,
        dispatcher: EventDispatcher,
        source_factory: SourceFactory,
    ) -> Self {
        Self {
            store,
            dispatcher,
            source_factory,
            session: None,
            state: RecognitionState::Idle,
        }
    }

    pub fn state(&self) -> RecognitionState {
        self.state
    }

    /// Id of the active session, if any. Each start yields a fresh one.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Start continuous recognition.
    ///
    /// Reuses the last-built configuration, rotating only the token. Any
    /// active session is fully stopped (stream acknowledged, device
    /// released) before the new one opens a device, so no two capture
    /// pipelines ever overlap. A failure anywhere in the sequence leaves the
    /// controller Idle with nothing half-open.
    pub fn start(&mut self, token: &str, language: &str) -> Result<()> {
        let handle = self.store.build("", token, "")?;

        if self.session.is_some() {
            debug!("Superseding active recognition session");
            self.state = RecognitionState::Stopping;
            let stopped = self.release_session();
            self.state = RecognitionState::Idle;
            stopped?;
        }

        self.state = RecognitionState::Configuring;
        match self.open_session(handle, language) {
            Ok(id) => {
                self.state = RecognitionState::Active;
                info!(session = %id, "Recognition session active");
                Ok(())
            }
            Err(e) => {
                self.state = RecognitionState::Idle;
                Err(e)
            }
        }
    }

    fn open_session(&mut self, handle: Arc<dyn EngineHandle>, language: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let language = if language.is_empty() {
            None
        } else {
            Some(language.to_string())
        };
        let config = RecognitionConfig::new(language);

        let volume_dispatcher = self.dispatcher.clone();
        let on_volume: VolumeCallback =
            Box::new(move |db| volume_dispatcher.dispatch(BridgeEvent::VolumeChange(db)));

        let opened = (self.source_factory)(on_volume)?;
        let mut device = opened.guard;
        let mut pump = opened.pump;

        let sink = RecognitionEventSink::new(self.dispatcher.clone());
        let mut stream = match handle.open_recognition_stream(config, sink) {
            Ok(stream) => stream,
            Err(e) => {
                device.close();
                return Err(e);
            }
        };

        let mut audio_sink = stream.take_audio_sink();
        if let Err(e) = stream.start() {
            device.close();
            return Err(e);
        }

        let producer = thread::Builder::new()
            .name("capture-producer".into())
            .spawn(move || loop {
                let frame = pump.pull();
                if frame.is_end_of_stream() {
                    debug!("Capture stream ended, closing audio sink");
                    audio_sink.close();
                    break;
                }
                if let Err(e) = audio_sink.write(&frame) {
                    warn!("Audio sink rejected frame: {}", e);
                    audio_sink.close();
                    break;
                }
            })
            .map_err(|e| crate::SpeechBridgeError::Channel(e.to_string()));

        let producer = match producer {
            Ok(handle) => handle,
            Err(e) => {
                let _ = stream.stop();
                device.close();
                return Err(e);
            }
        };

        self.session = Some(ActiveSession {
            id,
            stream,
            device,
            producer: Some(producer),
        });
        Ok(id)
    }

    /// Stop continuous recognition.
    ///
    /// Blocks until the engine acknowledges, then releases the device and
    /// joins the producer loop. Engine-side errors never block resource
    /// release; they are returned for reporting only. A stop that the engine
    /// never acknowledges parks the controller in `Stopping`; there is no
    /// timeout-based cancellation.
    pub fn stop(&mut self) -> Result<()> {
        if self.session.is_none() {
            return Ok(());
        }
        self.state = RecognitionState::Stopping;
        let result = self.release_session();
        self.state = RecognitionState::Idle;
        if result.is_ok() {
            info!("Recognition session stopped");
        }
        result
    }

    fn release_session(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        // Synchronous join on the engine ack before anything is released
        let stop_result = session.stream.stop();
        if let Err(e) = &stop_result {
            warn!("Engine stop failed, releasing resources anyway: {}", e);
        }

        // Closing the device disconnects the pump; the producer sees the
        // end-of-stream frame, closes the audio sink, and exits.
        session.device.close();
        if let Some(producer) = session.producer.take() {
            let _ = producer.join();
        }

        stop_result
    }
}

impl Drop for RecognitionSessionController {
    fn drop(&mut self) {
        let _ = self.release_session();
    }
}
