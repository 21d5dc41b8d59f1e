//! Denormal Protection
//!
//! Recursive filters fed with silence decay toward zero forever and end up
//! in the f32 subnormal range, where arithmetic is many times slower on most
//! CPUs. Filter state below [`DENORMAL_THRESHOLD`] is snapped to exactly zero,
//! which keeps the silent path as cheap as the busy one.

/// Magnitude below which filter state is treated as zero (about -480 dBFS)
pub const DENORMAL_THRESHOLD: f32 = 1e-24;

/// Snap a tiny or non-finite value to zero
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD || !x.is_finite() {
        0.0
    } else {
        x
    }
}
