//! Scripted speech-engine double and capture-source factory shared by the
//! integration tests.

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Sender};
use speech_bridge::audio::source::{
    DeviceGuard, FramePump, OpenedSource, SourceFactory, VolumeCallback, FRAME_SAMPLES,
};
use speech_bridge::credentials::Credentials;
use speech_bridge::dispatch::{RecognitionEventSink, SynthesisEventSink};
use speech_bridge::engine::{
    AudioSink, EngineHandle, RecognitionConfig, RecognitionStream, SpeechEngine, SynthesisChannel,
};
use speech_bridge::{Result, SpeechBridgeError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Observable state of the latest recognition stream the mock handed out.
pub struct RecognitionProbe {
    pub config: RecognitionConfig,
    pub events: RecognitionEventSink,
    pub frames: Arc<Mutex<Vec<Vec<u8>>>>,
    pub stopped: Arc<AtomicBool>,
}

/// Observable state of the latest synthesis channel the mock handed out.
pub struct SynthesisProbe {
    pub events: SynthesisEventSink,
    pub spoken: Arc<Mutex<Vec<String>>>,
    pub connection_opens: Arc<AtomicUsize>,
    pub speak_stops: Arc<AtomicUsize>,
    pub rotated_tokens: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

#[derive(Default)]
pub struct EngineState {
    pub configures: AtomicUsize,
    pub reject_credentials: AtomicBool,
    pub fail_recognition_open: AtomicBool,
    pub fail_recognition_stop: AtomicBool,
    pub fail_speak: AtomicBool,
    pub recognition_opens: AtomicUsize,
    pub synthesis_opens: AtomicUsize,
    pub recognition: Mutex<Option<RecognitionProbe>>,
    pub synthesis: Mutex<Option<SynthesisProbe>>,
}

pub struct MockEngine {
    pub state: Arc<EngineState>,
}

impl MockEngine {
    pub fn new() -> (Arc<Self>, Arc<EngineState>) {
        let state = Arc::new(EngineState::default());
        (
            Arc::new(Self {
                state: Arc::clone(&state),
            }),
            state,
        )
    }
}

impl SpeechEngine for MockEngine {
    fn configure(&self, credentials: &Credentials) -> Result<Arc<dyn EngineHandle>> {
        if self.state.reject_credentials.load(Ordering::SeqCst) {
            return Err(SpeechBridgeError::EngineRejected(format!(
                "refused for region {}",
                credentials.region
            )));
        }
        self.state.configures.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockHandle {
            state: Arc::clone(&self.state),
        }))
    }
}

pub struct MockHandle {
    state: Arc<EngineState>,
}

impl EngineHandle for MockHandle {
    fn rotate_token(&self, _token: &str) -> Result<()> {
        Ok(())
    }

    fn open_recognition_stream(
        &self,
        config: RecognitionConfig,
        events: RecognitionEventSink,
    ) -> Result<Box<dyn RecognitionStream>> {
        if self.state.fail_recognition_open.load(Ordering::SeqCst) {
            return Err(SpeechBridgeError::Recognition("stream refused".into()));
        }
        self.state.recognition_opens.fetch_add(1, Ordering::SeqCst);

        let frames = Arc::new(Mutex::new(Vec::new()));
        let stopped = Arc::new(AtomicBool::new(false));
        *self.state.recognition.lock().unwrap() = Some(RecognitionProbe {
            config,
            events,
            frames: Arc::clone(&frames),
            stopped: Arc::clone(&stopped),
        });

        Ok(Box::new(MockRecognitionStream {
            state: Arc::clone(&self.state),
            frames: Some(frames),
            stopped,
        }))
    }

    fn open_synthesis_channel(
        &self,
        events: SynthesisEventSink,
    ) -> Result<Box<dyn SynthesisChannel>> {
        self.state.synthesis_opens.fetch_add(1, Ordering::SeqCst);

        let spoken = Arc::new(Mutex::new(Vec::new()));
        let connection_opens = Arc::new(AtomicUsize::new(1));
        let speak_stops = Arc::new(AtomicUsize::new(0));
        let rotated_tokens = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));

        *self.state.synthesis.lock().unwrap() = Some(SynthesisProbe {
            events,
            spoken: Arc::clone(&spoken),
            connection_opens: Arc::clone(&connection_opens),
            speak_stops: Arc::clone(&speak_stops),
            rotated_tokens: Arc::clone(&rotated_tokens),
            closed: Arc::clone(&closed),
        });

        Ok(Box::new(MockSynthesisChannel {
            state: Arc::clone(&self.state),
            spoken,
            connection_opens,
            speak_stops,
            rotated_tokens,
            closed,
        }))
    }
}

struct MockRecognitionStream {
    state: Arc<EngineState>,
    frames: Option<Arc<Mutex<Vec<Vec<u8>>>>>,
    stopped: Arc<AtomicBool>,
}

impl RecognitionStream for MockRecognitionStream {
    fn take_audio_sink(&mut self) -> Box<dyn AudioSink> {
        Box::new(MockAudioSink {
            frames: self.frames.take().expect("audio sink taken twice"),
            closed: false,
        })
    }

    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        if self.state.fail_recognition_stop.load(Ordering::SeqCst) {
            return Err(SpeechBridgeError::Recognition("stop refused".into()));
        }
        Ok(())
    }
}

struct MockAudioSink {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: bool,
}

impl AudioSink for MockAudioSink {
    fn write(&mut self, frame: &speech_bridge::audio::AudioFrame) -> Result<()> {
        self.frames.lock().unwrap().push(frame.pcm().to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

struct MockSynthesisChannel {
    state: Arc<EngineState>,
    spoken: Arc<Mutex<Vec<String>>>,
    connection_opens: Arc<AtomicUsize>,
    speak_stops: Arc<AtomicUsize>,
    rotated_tokens: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl SynthesisChannel for MockSynthesisChannel {
    fn open_connection(&mut self) -> Result<()> {
        self.connection_opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rotate_token(&mut self, token: &str) -> Result<()> {
        self.rotated_tokens.lock().unwrap().push(token.to_string());
        Ok(())
    }

    fn speak_ssml(&mut self, ssml: &str) -> Result<()> {
        if self.state.fail_speak.load(Ordering::SeqCst) {
            return Err(SpeechBridgeError::Synthesis("speak refused".into()));
        }
        self.spoken.lock().unwrap().push(ssml.to_string());
        Ok(())
    }

    fn stop_speaking(&mut self) -> Result<()> {
        self.speak_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Tracks concurrent device ownership across scripted capture sessions.
#[derive(Default)]
pub struct SourceState {
    pub opens: AtomicUsize,
    pub open_devices: AtomicUsize,
    pub max_open_devices: AtomicUsize,
    pub fail_open: AtomicBool,
}

struct ScriptedGuard {
    chunk_tx: Option<Sender<Vec<f32>>>,
    state: Arc<SourceState>,
}

impl DeviceGuard for ScriptedGuard {
    fn close(&mut self) {
        if self.chunk_tx.take().is_some() {
            self.state.open_devices.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ScriptedGuard {
    fn drop(&mut self) {
        self.close();
    }
}

/// Factory yielding `frames_per_session` frames of mid-level audio, then
/// blocking until the device guard is closed.
pub fn scripted_factory(state: Arc<SourceState>, frames_per_session: usize) -> SourceFactory {
    Box::new(move |on_volume: VolumeCallback| {
        if state.fail_open.load(Ordering::SeqCst) {
            return Err(speech_bridge::DeviceError::Busy);
        }
        state.opens.fetch_add(1, Ordering::SeqCst);
        let now_open = state.open_devices.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_open_devices.fetch_max(now_open, Ordering::SeqCst);

        let (chunk_tx, chunk_rx) = unbounded();
        for _ in 0..frames_per_session {
            let _ = chunk_tx.send(vec![0.25f32; FRAME_SAMPLES]);
        }

        let pump = FramePump::new(chunk_rx, 16_000, on_volume)
            .map_err(|e| speech_bridge::DeviceError::Stream(e.to_string()))?;

        Ok(OpenedSource {
            guard: Box::new(ScriptedGuard {
                chunk_tx: Some(chunk_tx),
                state: Arc::clone(&state),
            }),
            pump: Box::new(pump),
        })
    })
}

/// Route bridge logs to the test harness when RUST_LOG is set.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `cond` until it holds or the timeout lapses.
pub fn wait_until(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
