//! Output Stage
//!
//! Final linear gain and the RMS level metric. The metric is informational
//! only: nothing in the signal path reads it back.

use crate::coefficients::db_to_gain;

/// Scale every sample by a gain given in dB
///
/// # Real-time Safety
/// No allocations, O(n) time.
#[inline]
pub fn apply_output_gain(samples: &mut [f32], gain_db: f32) {
    let gain = db_to_gain(gain_db);
    // Unity gain is the default; skip the pass entirely
    if gain == 1.0 {
        return;
    }
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}

/// Sum of squared samples, accumulated in f64
///
/// Chunked processing adds these up before taking the root so the metric
/// covers the whole host block.
#[inline]
pub fn sum_of_squares(samples: &[f32]) -> f64 {
    samples.iter().map(|&s| (s as f64) * (s as f64)).sum()
}

/// Root-mean-square level of a buffer (0.0 for an empty one)
#[inline]
pub fn compute_rms(samples: &[f32]) -> f32 {
    rms_from_sum(sum_of_squares(samples), samples.len())
}

/// RMS from a precomputed sum of squares over `len` samples
#[inline]
pub fn rms_from_sum(sum: f64, len: usize) -> f32 {
    if len == 0 {
        return 0.0;
    }
    (sum / len as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unity_gain_untouched() {
        let mut buffer = vec![0.1, -0.2, 0.3];
        apply_output_gain(&mut buffer, 0.0);
        assert_eq!(buffer, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_gain_scaling() {
        let mut buffer = vec![0.5, -0.5];
        apply_output_gain(&mut buffer, -6.0);
        assert!((buffer[0] - 0.2506).abs() < 1e-3);
        assert!((buffer[1] + 0.2506).abs() < 1e-3);

        let mut buffer = vec![0.1];
        apply_output_gain(&mut buffer, 24.0);
        assert!((buffer[0] - 1.5849).abs() < 1e-3);
    }

    #[test]
    fn test_rms_of_constant() {
        assert!((compute_rms(&[0.5; 64]) - 0.5).abs() < 1e-6);
        assert!((compute_rms(&[-0.5; 64]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rms_of_sine() {
        let sine: Vec<f32> = (0..4800)
            .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 48000.0).sin())
            .collect();
        let rms = compute_rms(&sine);
        assert!((rms - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_rms_empty_and_chunked() {
        assert_eq!(compute_rms(&[]), 0.0);

        let data = [0.1_f32, 0.2, -0.3, 0.4, -0.5, 0.6];
        let chunked = sum_of_squares(&data[..2]) + sum_of_squares(&data[2..]);
        assert!((rms_from_sum(chunked, data.len()) - compute_rms(&data)).abs() < 1e-7);
    }
}
