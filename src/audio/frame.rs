use serde::{Deserialize, Serialize};

/// The only audio format the speech engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

/// Canonical stream format: 16 kHz, 16-bit PCM, mono.
pub const ENGINE_FORMAT: AudioFormat = AudioFormat {
    sample_rate: 16_000,
    bits_per_sample: 16,
    channels: 1,
};

impl AudioFormat {
    /// Bytes per second of PCM at this format.
    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.channels as usize * (self.bits_per_sample as usize / 8)
    }
}

/// One frame of canonical PCM plus its loudness measurement.
///
/// An empty frame signals end of stream; callers must treat it as terminal.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pcm: Vec<u8>,
    loudness_db: f64,
}

impl AudioFrame {
    pub fn new(pcm: Vec<u8>, loudness_db: f64) -> Self {
        Self { pcm, loudness_db }
    }

    /// Terminal marker: the device stopped producing samples.
    pub fn end_of_stream() -> Self {
        Self {
            pcm: Vec::new(),
            loudness_db: f64::NEG_INFINITY,
        }
    }

    pub fn pcm(&self) -> &[u8] {
        &self.pcm
    }

    /// Loudness in decibels; negative infinity for silence, never NaN.
    pub fn loudness_db(&self) -> f64 {
        self.loudness_db
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.pcm.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        self.pcm.len() as f32 / ENGINE_FORMAT.bytes_per_second() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_format_is_fixed() {
        assert_eq!(ENGINE_FORMAT.sample_rate, 16_000);
        assert_eq!(ENGINE_FORMAT.bits_per_sample, 16);
        assert_eq!(ENGINE_FORMAT.channels, 1);
        assert_eq!(ENGINE_FORMAT.bytes_per_second(), 32_000);
    }

    #[test]
    fn end_of_stream_frame_is_terminal() {
        let frame = AudioFrame::end_of_stream();
        assert!(frame.is_end_of_stream());
        assert_eq!(frame.loudness_db(), f64::NEG_INFINITY);
    }

    #[test]
    fn duration_tracks_payload() {
        // 100 ms of 16 kHz mono i16
        let frame = AudioFrame::new(vec![0u8; 3200], f64::NEG_INFINITY);
        assert!((frame.duration_secs() - 0.1).abs() < 1e-6);
    }
}
