//! Loudness metering over canonical PCM frames.

/// Mean-square loudness of a frame in decibels.
///
/// Computed as `10 * log10(mean(sample^2))` over the raw i16 samples, matching
/// what UI-facing level meters expect. All-zero frames measure negative
/// infinity; a NaN (empty frame) is coerced to negative infinity as well.
pub fn loudness_db(samples: &[i16]) -> f64 {
    let mut energy: f64 = 0.0;
    for &s in samples {
        let v = s as f64;
        energy += v * v;
    }
    let mean = energy / samples.len() as f64;
    let db = 10.0 * mean.log10();
    if db.is_nan() {
        f64::NEG_INFINITY
    } else {
        db
    }
}

/// Reinterpret little-endian PCM bytes as i16 samples and meter them.
pub fn loudness_db_from_pcm(pcm: &[u8]) -> f64 {
    let samples: Vec<i16> = pcm
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    loudness_db(&samples)
}
