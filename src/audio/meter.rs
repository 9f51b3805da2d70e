//! Input loudness metering.

/// Root-mean-square energy of one captured frame.
///
/// Runs on every frame independent of the encode path; never fails. Callers
/// apply their own scaling for display. An empty frame reads 0.
pub fn input_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}
