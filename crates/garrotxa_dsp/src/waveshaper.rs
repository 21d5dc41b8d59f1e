//! Tanh Waveshaper
//!
//! The distortion itself: every oversampled sample goes through
//! `tanh(sample * drive)`. Unlike a threshold soft clipper there is no
//! linear region, so even the minimum drive of 1.0 bends anything near or
//! above unit amplitude. Output is always inside (-1, 1).

/// Shape a single sample
#[inline]
pub fn shape(sample: f32, drive: f32) -> f32 {
    (sample * drive).tanh()
}

/// Apply the waveshaper to a buffer in place
///
/// # Real-time Safety
/// No allocations, O(n) time.
#[inline]
pub fn process_block(samples: &mut [f32], drive: f32) {
    for sample in samples.iter_mut() {
        *sample = shape(*sample, drive);
    }
}
