pub mod recognition;
pub mod synthesis;

pub use recognition::{RecognitionSessionController, RecognitionState};
pub use synthesis::{SynthesisSessionController, SynthesisState};
