//! Microphone capture, framing, and the pull interface the recognition
//! producer loop runs against.
//!
//! The device half (`MicrophoneSource`) owns the cpal stream and is not Send;
//! it stays on the controller's worker thread. The pump half (`FramePump`)
//! only holds the sample channel and resampler state, so it can move onto the
//! dedicated producer thread.

use crate::audio::frame::{AudioFrame, ENGINE_FORMAT};
use crate::audio::meter::loudness_db;
use crate::audio::resampler::AudioResampler;
use crossbeam_channel::Receiver;
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "audio-io")]
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
#[cfg(feature = "audio-io")]
use crossbeam_channel::bounded;
#[cfg(feature = "audio-io")]
use tracing::{error, info};

/// Samples per canonical frame handed to the engine (100 ms at 16 kHz).
pub const FRAME_SAMPLES: usize = ENGINE_FORMAT.sample_rate as usize / 10;

#[derive(Error, Debug, Clone)]
pub enum DeviceError {
    #[error("no input device available")]
    NoDevice,

    #[error("microphone is busy")]
    Busy,

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("input stream error: {0}")]
    Stream(String),
}

/// Per-frame loudness callback, invoked on every successful pull.
pub type VolumeCallback = Box<dyn FnMut(f64) + Send>;

/// Blocking producer-side view of an open capture device.
pub trait FrameSource: Send {
    /// Block until a full frame of canonical PCM is available.
    ///
    /// Returns an end-of-stream frame once the device stops producing
    /// samples; callers must treat that as terminal.
    fn pull(&mut self) -> AudioFrame;
}

/// Worker-side handle that keeps the device open; dropping or closing it
/// ends the paired pump's stream.
pub trait DeviceGuard {
    /// Release the device. Idempotent.
    fn close(&mut self);
}

/// A freshly opened capture pipeline: the guard stays with the controller,
/// the pump moves to the producer thread.
pub struct OpenedSource {
    pub guard: Box<dyn DeviceGuard>,
    pub pump: Box<dyn FrameSource>,
}

/// Factory invoked once per recognition session to acquire the microphone.
pub type SourceFactory =
    Box<dyn FnMut(VolumeCallback) -> std::result::Result<OpenedSource, DeviceError> + Send>;

/// Assembles canonical frames from raw device chunks.
///
/// Drains the capture channel, resamples to 16 kHz when the device rate
/// differs, converts to 16-bit PCM, and meters every produced frame.
pub struct FramePump {
    chunk_rx: Receiver<Vec<f32>>,
    resampler: Option<AudioResampler>,
    pending: Vec<f32>,
    on_volume: VolumeCallback,
    ended: bool,
}

impl FramePump {
    pub fn new(
        chunk_rx: Receiver<Vec<f32>>,
        device_rate: u32,
        on_volume: VolumeCallback,
    ) -> crate::Result<Self> {
        let resampler = if device_rate != ENGINE_FORMAT.sample_rate {
            Some(AudioResampler::new(device_rate, ENGINE_FORMAT.sample_rate)?)
        } else {
            None
        };
        Ok(Self {
            chunk_rx,
            resampler,
            pending: Vec::with_capacity(FRAME_SAMPLES * 2),
            on_volume,
            ended: false,
        })
    }

    fn absorb(&mut self, chunk: &[f32]) {
        match self.resampler.as_mut() {
            Some(resampler) => match resampler.resample(chunk) {
                Ok(resampled) => self.pending.extend_from_slice(&resampled),
                Err(e) => debug!("dropping chunk, resample failed: {}", e),
            },
            None => self.pending.extend_from_slice(chunk),
        }
    }

    fn emit(&mut self, samples: Vec<i16>) -> AudioFrame {
        let db = loudness_db(&samples);
        (self.on_volume)(db);
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        AudioFrame::new(pcm, db)
    }
}

impl FrameSource for FramePump {
    fn pull(&mut self) -> AudioFrame {
        if self.ended {
            return AudioFrame::end_of_stream();
        }

        while self.pending.len() < FRAME_SAMPLES {
            match self.chunk_rx.recv() {
                Ok(chunk) => self.absorb(&chunk),
                Err(_) => {
                    // Device closed. Flush whatever is buffered, then end.
                    self.ended = true;
                    if self.pending.is_empty() {
                        return AudioFrame::end_of_stream();
                    }
                    let tail: Vec<i16> =
                        self.pending.drain(..).map(f32_to_i16).collect();
                    return self.emit(tail);
                }
            }
        }

        let samples: Vec<i16> = self
            .pending
            .drain(..FRAME_SAMPLES)
            .map(f32_to_i16)
            .collect();
        self.emit(samples)
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Microphone device guard built on cpal.
#[cfg(feature = "audio-io")]
pub struct MicrophoneSource {
    stream: Option<cpal::Stream>,
}

#[cfg(feature = "audio-io")]
impl MicrophoneSource {
    /// Acquire the default input device and start capture.
    ///
    /// Returns the guard plus the Send pump that yields canonical frames.
    pub fn open(
        on_volume: VolumeCallback,
    ) -> std::result::Result<(Self, FramePump), DeviceError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(DeviceError::NoDevice)?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config: cpal::StreamConfig = device
            .default_input_config()
            .map_err(|e| map_config_error(&e))?
            .into();

        let channels = config.channels as usize;
        let device_rate = config.sample_rate.0;
        let (chunk_tx, chunk_rx) = bounded::<Vec<f32>>(64);

        let err_fn = |err| {
            error!("Audio input stream error: {}", err);
        };

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Average interleaved channels down to mono
                    let samples: Vec<f32> = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };
                    if let Err(e) = chunk_tx.try_send(samples) {
                        debug!("Failed to send audio data: {}", e);
                    }
                },
                err_fn,
                None,
            )
            .map_err(map_build_error)?;

        stream.play().map_err(|e| match e {
            cpal::PlayStreamError::DeviceNotAvailable => DeviceError::Busy,
            other => DeviceError::Stream(other.to_string()),
        })?;

        info!("Started audio capture at {} Hz", device_rate);

        let pump = FramePump::new(chunk_rx, device_rate, on_volume)
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        Ok((Self { stream: Some(stream) }, pump))
    }
}

#[cfg(feature = "audio-io")]
impl DeviceGuard for MicrophoneSource {
    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Stopped audio capture");
        }
    }
}

#[cfg(feature = "audio-io")]
impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(feature = "audio-io")]
fn map_config_error(e: &cpal::DefaultStreamConfigError) -> DeviceError {
    match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => DeviceError::Busy,
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
            DeviceError::Stream("stream type not supported".into())
        }
        cpal::DefaultStreamConfigError::BackendSpecific { err } => {
            map_backend_message(&err.description)
        }
    }
}

#[cfg(feature = "audio-io")]
fn map_build_error(e: cpal::BuildStreamError) -> DeviceError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => DeviceError::Busy,
        cpal::BuildStreamError::BackendSpecific { err } => map_backend_message(&err.description),
        other => DeviceError::Stream(other.to_string()),
    }
}

#[cfg(feature = "audio-io")]
fn map_backend_message(description: &str) -> DeviceError {
    let lowered = description.to_ascii_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") {
        DeviceError::PermissionDenied
    } else {
        DeviceError::Stream(description.to_string())
    }
}

/// Default factory: open the real microphone per session.
#[cfg(feature = "audio-io")]
pub fn microphone_factory() -> SourceFactory {
    Box::new(|on_volume| {
        let (guard, pump) = MicrophoneSource::open(on_volume)?;
        Ok(OpenedSource {
            guard: Box::new(guard),
            pump: Box::new(pump),
        })
    })
}
