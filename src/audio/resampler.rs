use crate::{Result, SpeechBridgeError};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Mono audio resampler for converting the device rate to the engine rate.
pub struct AudioResampler {
    resampler: SincFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
}

impl AudioResampler {
    /// Create a new mono resampler between the given rates.
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(SpeechBridgeError::Recognition(
                "sample rates must be greater than 0".into(),
            ));
        }

        let resample_ratio = output_rate as f64 / input_rate as f64;

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        // chunk_size is the number of frames consumed per process() call
        let chunk_size = 1024;

        let resampler = SincFixedIn::<f32>::new(resample_ratio, 2.0, params, chunk_size, 1)
            .map_err(|e| {
                SpeechBridgeError::Recognition(format!("failed to create resampler: {}", e))
            })?;

        debug!("Created resampler: {} Hz -> {} Hz", input_rate, output_rate);

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
        })
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Resample a block of mono samples.
    ///
    /// SincFixedIn consumes fixed-size chunks, so the tail of the input is
    /// zero-padded and the corresponding output trimmed proportionally.
    pub fn resample(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = self.resampler.input_frames_max();
        let ratio = self.output_rate as f64 / self.input_rate as f64;
        let estimated = (input.len() as f64 * ratio * 1.1) as usize;
        let mut output = Vec::with_capacity(estimated);

        let mut offset = 0;
        while offset < input.len() {
            let remaining = input.len() - offset;
            let take = remaining.min(chunk_size);

            let mut planar = vec![vec![0.0f32; chunk_size]];
            planar[0][..take].copy_from_slice(&input[offset..offset + take]);

            let produced = self.resampler.process(&planar, None).map_err(|e| {
                SpeechBridgeError::Recognition(format!("resampling failed: {}", e))
            })?;

            let produced_frames = produced[0].len();
            let keep = if take < chunk_size {
                // Last, padded chunk: only keep the share backed by real input
                ((take as f64 / chunk_size as f64) * produced_frames as f64).round() as usize
            } else {
                produced_frames
            };
            output.extend_from_slice(&produced[0][..keep.min(produced_frames)]);

            offset += take;
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_rates() {
        assert!(AudioResampler::new(0, 16_000).is_err());
        assert!(AudioResampler::new(48_000, 0).is_err());
    }

    #[test]
    fn downsamples_48k_to_16k() {
        let mut resampler = AudioResampler::new(48_000, 16_000).unwrap();
        assert_eq!(resampler.input_rate(), 48_000);
        assert_eq!(resampler.output_rate(), 16_000);
        let input: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.01).sin()).collect();
        let output = resampler.resample(&input).unwrap();
        // 0.1 s of input should yield roughly 0.1 s of output
        let expected = input.len() / 3;
        assert!((output.len() as i64 - expected as i64).unsigned_abs() < 200);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let mut resampler = AudioResampler::new(44_100, 16_000).unwrap();
        assert!(resampler.resample(&[]).unwrap().is_empty());
    }

    #[test]
    fn output_amplitude_is_bounded() {
        let mut resampler = AudioResampler::new(44_100, 16_000).unwrap();
        let input: Vec<f32> = (0..4410)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 44_100.0).sin() * 0.5)
            .collect();
        let output = resampler.resample(&input).unwrap();
        assert!(!output.is_empty());
        assert!(output.iter().all(|s| s.abs() <= 1.0));
    }
}
