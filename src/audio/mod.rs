pub mod frame;
pub mod meter;
pub mod resampler;
pub mod source;

pub use frame::{AudioFormat, AudioFrame, ENGINE_FORMAT};
pub use meter::loudness_db;
pub use resampler::AudioResampler;
#[cfg(feature = "audio-io")]
pub use source::MicrophoneSource;
pub use source::{DeviceError, FramePump, FrameSource, OpenedSource, SourceFactory};
