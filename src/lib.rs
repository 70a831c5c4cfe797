pub mod audio;
pub mod bridge;
pub mod credentials;
pub mod dispatch;
pub mod engine;
pub mod events;
pub mod session;
pub mod ssml;

pub use audio::source::DeviceError;
pub use bridge::{BridgeHandle, SpeechBridge};
pub use events::{BridgeEvent, RecognitionEvent, SynthesisEvent};

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SpeechBridgeError {
    #[error("region cannot be empty")]
    InvalidRegion,

    #[error("subscriptionKey and authorizationToken cannot be empty at the same time")]
    MissingCredential,

    #[error("speech engine rejected credentials: {0}")]
    EngineRejected(String),

    #[error("`text` and `identifier` cannot be empty")]
    InvalidRequest,

    #[error("audio device error: {0}")]
    Device(#[from] audio::source::DeviceError),

    #[error("recognition error: {0}")]
    Recognition(String),

    #[error("synthesis error: {0}")]
    Synthesis(String),

    #[error("channel error: {0}")]
    Channel(String),
}

impl SpeechBridgeError {
    /// Numeric code reported to the caller alongside the message.
    pub fn code(&self) -> i32 {
        match self {
            SpeechBridgeError::InvalidRegion => -1,
            SpeechBridgeError::MissingCredential => -2,
            SpeechBridgeError::EngineRejected(_) => -3,
            SpeechBridgeError::Recognition(_) => -4,
            // Device failures only surface from startRecognizing
            SpeechBridgeError::Device(_) => -4,
            SpeechBridgeError::InvalidRequest => -10,
            SpeechBridgeError::Synthesis(_) => -11,
            SpeechBridgeError::Channel(_) => -100,
        }
    }

    /// Check if this error is recoverable by retrying the same call
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Validation errors need different inputs, not a retry
            SpeechBridgeError::InvalidRegion => false,
            SpeechBridgeError::MissingCredential => false,
            SpeechBridgeError::InvalidRequest => false,
            SpeechBridgeError::EngineRejected(_) => false,
            // Transient engine/device conditions
            SpeechBridgeError::Device(_) => true,
            SpeechBridgeError::Recognition(_) => true,
            SpeechBridgeError::Synthesis(_) => true,
            SpeechBridgeError::Channel(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpeechBridgeError>;
