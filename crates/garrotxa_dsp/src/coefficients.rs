//! EQ Coefficient Calculator
//!
//! Pure mapping from `{oversampled rate, band gains, mid frequency}` to the
//! three biquad coefficient sets of the post-distortion EQ.
//! Formulas follow the RBJ (Robert Bristow-Johnson) Audio EQ Cookbook.
//!
//! The chain is a fixed sequence of band descriptors rather than three
//! hand-written code paths: each descriptor names its filter kind, where its
//! center frequency comes from, and its Q. Gains arrive in dB and are turned
//! into linear factors with `10^(dB/20)` before they reach the formulas.

use biquad::Coefficients;

use crate::params::ProcessParams;

/// Shape of one EQ section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandKind {
    LowShelf,
    Peaking,
    HighShelf,
}

/// Where a band takes its center frequency from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandFrequency {
    Fixed(f64),
    /// Follows the sweepable mid-frequency control
    MidControl,
}

/// Static description of one EQ band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandDescriptor {
    pub name: &'static str,
    pub kind: BandKind,
    pub frequency: BandFrequency,
    pub q: f64,
}

/// Number of sections in the EQ chain
pub const NUM_BANDS: usize = 3;

/// Bass shelf, sweepable mid peak, treble shelf, in processing order
pub const BANDS: [BandDescriptor; NUM_BANDS] = [
    BandDescriptor {
        name: "bass",
        kind: BandKind::LowShelf,
        frequency: BandFrequency::Fixed(150.0),
        q: 0.707,
    },
    BandDescriptor {
        name: "middle",
        kind: BandKind::Peaking,
        frequency: BandFrequency::MidControl,
        q: 0.5,
    },
    BandDescriptor {
        name: "treble",
        kind: BandKind::HighShelf,
        frequency: BandFrequency::Fixed(3000.0),
        q: 0.707,
    },
];

/// Lowest center frequency handed to the formulas
const MIN_FREQUENCY: f64 = 10.0;

/// Highest center frequency as a fraction of the sample rate.
/// Keeps every band clear of Nyquist whatever the host rate is.
const MAX_FREQUENCY_RATIO: f64 = 0.45;

/// The subset of parameters that shapes the EQ
///
/// Also serves as the change-detection key: coefficients only need to be
/// rebuilt when this differs from the previous block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqSettings {
    pub bass_db: f32,
    pub middle_db: f32,
    pub treble_db: f32,
    pub mid_frequency: f32,
}

impl Default for EqSettings {
    fn default() -> Self {
        ProcessParams::default().into()
    }
}

impl From<ProcessParams> for EqSettings {
    fn from(params: ProcessParams) -> Self {
        Self {
            bass_db: params.bass_db,
            middle_db: params.middle_db,
            treble_db: params.treble_db,
            mid_frequency: params.mid_frequency,
        }
    }
}

impl EqSettings {
    /// Gain in dB for the band at `index` in [`BANDS`]
    fn gain_db(&self, index: usize) -> f32 {
        match index {
            0 => self.bass_db,
            1 => self.middle_db,
            _ => self.treble_db,
        }
    }
}

/// Convert dB gain to linear amplitude
/// Formula: amplitude = 10^(dB/20)
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Force a center frequency into the range the formulas are stable for
fn clamp_frequency(frequency: f64, sample_rate: f64) -> f64 {
    let upper = (sample_rate * MAX_FREQUENCY_RATIO).max(MIN_FREQUENCY);
    if frequency.is_nan() {
        return MIN_FREQUENCY;
    }
    frequency.clamp(MIN_FREQUENCY, upper)
}

/// Build one biquad section
///
/// `gain` is linear (1.0 = flat). Computation runs in f64 and is rounded to
/// f32 at the end; low shelves at 4x rates put poles very close to z = 1.
pub fn band_coefficients(
    kind: BandKind,
    sample_rate: f64,
    frequency: f64,
    q: f64,
    gain: f32,
) -> Coefficients<f32> {
    let frequency = clamp_frequency(frequency, sample_rate);
    let q = if q.is_finite() && q > 0.0 { q } else { 0.707 };
    let gain = if gain.is_finite() && gain > 0.0 {
        gain as f64
    } else {
        1.0
    };

    let a = gain.sqrt();
    let omega = 2.0 * std::f64::consts::PI * frequency / sample_rate;
    let (sin_w, cos_w) = omega.sin_cos();

    // Rust pattern: the match produces a tuple, destructured in one binding
    let (b0, b1, b2, a0, a1, a2) = match kind {
        BandKind::LowShelf => {
            let beta = sin_w * a.sqrt() / q;
            (
                a * ((a + 1.0) - (a - 1.0) * cos_w + beta),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                a * ((a + 1.0) - (a - 1.0) * cos_w - beta),
                (a + 1.0) + (a - 1.0) * cos_w + beta,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                (a + 1.0) + (a - 1.0) * cos_w - beta,
            )
        }
        BandKind::Peaking => {
            let alpha = sin_w / (2.0 * q);
            (
                1.0 + alpha * a,
                -2.0 * cos_w,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w,
                1.0 - alpha / a,
            )
        }
        BandKind::HighShelf => {
            let beta = sin_w * a.sqrt() / q;
            (
                a * ((a + 1.0) + (a - 1.0) * cos_w + beta),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
                a * ((a + 1.0) + (a - 1.0) * cos_w - beta),
                (a + 1.0) - (a - 1.0) * cos_w + beta,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
                (a + 1.0) - (a - 1.0) * cos_w - beta,
            )
        }
    };

    Coefficients {
        a1: (a1 / a0) as f32,
        a2: (a2 / a0) as f32,
        b0: (b0 / a0) as f32,
        b1: (b1 / a0) as f32,
        b2: (b2 / a0) as f32,
    }
}

/// Compute all three sections for the given oversampled rate
///
/// Must be fed the rate the filters actually run at (host rate x4).
pub fn eq_coefficients(oversampled_rate: f64, settings: &EqSettings) -> [Coefficients<f32>; NUM_BANDS] {
    core::array::from_fn(|i| {
        let band = &BANDS[i];
        let frequency = match band.frequency {
            BandFrequency::Fixed(hz) => hz,
            BandFrequency::MidControl => settings.mid_frequency as f64,
        };
        band_coefficients(
            band.kind,
            oversampled_rate,
            frequency,
            band.q,
            db_to_gain(settings.gain_db(i)),
        )
    })
}

/// Whether both poles of a section lie strictly inside the unit circle
pub fn is_stable(coeffs: &Coefficients<f32>) -> bool {
    // Stability triangle for z² + a1·z + a2
    coeffs.a2.abs() < 1.0 && coeffs.a1.abs() < 1.0 + coeffs.a2
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const OS_RATE: f64 = 44100.0 * 4.0;

    /// Magnitude response of a section at `freq`
    fn magnitude(c: &Coefficients<f32>, freq: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq / sample_rate;
        let (b0, b1, b2) = (c.b0 as f64, c.b1 as f64, c.b2 as f64);
        let (a1, a2) = (c.a1 as f64, c.a2 as f64);
        let num_re = b0 + b1 * w.cos() + b2 * (2.0 * w).cos();
        let num_im = -(b1 * w.sin() + b2 * (2.0 * w).sin());
        let den_re = 1.0 + a1 * w.cos() + a2 * (2.0 * w).cos();
        let den_im = -(a1 * w.sin() + a2 * (2.0 * w).sin());
        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }

    fn to_db(gain: f64) -> f64 {
        20.0 * gain.log10()
    }

    #[test]
    fn test_band_layout() {
        assert_eq!(BANDS[0].kind, BandKind::LowShelf);
        assert_eq!(BANDS[0].frequency, BandFrequency::Fixed(150.0));
        assert_eq!(BANDS[1].kind, BandKind::Peaking);
        assert_eq!(BANDS[1].frequency, BandFrequency::MidControl);
        assert_eq!(BANDS[1].q, 0.5);
        assert_eq!(BANDS[2].kind, BandKind::HighShelf);
        assert_eq!(BANDS[2].frequency, BandFrequency::Fixed(3000.0));
    }

    #[test]
    fn test_db_to_gain() {
        assert_eq!(db_to_gain(0.0), 1.0);
        assert!((db_to_gain(6.0) - 1.9953).abs() < 1e-3);
        assert!((db_to_gain(-12.0) - 0.2512).abs() < 1e-3);
    }

    #[test]
    fn test_flat_settings_are_identity() {
        let coeffs = eq_coefficients(OS_RATE, &EqSettings::default());
        for c in &coeffs {
            for freq in [50.0, 150.0, 750.0, 3000.0, 15000.0] {
                let db = to_db(magnitude(c, freq, OS_RATE));
                assert!(db.abs() < 0.01, "{} Hz: {} dB", freq, db);
            }
        }
    }

    #[test]
    fn test_low_shelf_boosts_lows() {
        let settings = EqSettings {
            bass_db: 12.0,
            ..Default::default()
        };
        let c = eq_coefficients(OS_RATE, &settings)[0];

        assert!((to_db(magnitude(&c, 20.0, OS_RATE)) - 12.0).abs() < 0.5);
        assert!(to_db(magnitude(&c, 10000.0, OS_RATE)).abs() < 0.5);
    }

    #[test]
    fn test_peak_hits_gain_at_center() {
        for freq in [200.0_f32, 750.0, 5000.0] {
            let settings = EqSettings {
                middle_db: -12.0,
                mid_frequency: freq,
                ..Default::default()
            };
            let c = eq_coefficients(OS_RATE, &settings)[1];
            let db = to_db(magnitude(&c, freq as f64, OS_RATE));
            assert!((db + 12.0).abs() < 0.1, "{} Hz center: {} dB", freq, db);
        }
    }

    #[test]
    fn test_high_shelf_boosts_highs() {
        let settings = EqSettings {
            treble_db: 12.0,
            ..Default::default()
        };
        let c = eq_coefficients(OS_RATE, &settings)[2];

        assert!((to_db(magnitude(&c, 20000.0, OS_RATE)) - 12.0).abs() < 0.5);
        assert!(to_db(magnitude(&c, 100.0, OS_RATE)).abs() < 0.5);
    }

    #[test]
    fn test_stable_across_parameter_ranges() {
        for rate in [8000.0, 44100.0, 48000.0, 96000.0, 192000.0] {
            let os_rate = rate * 4.0;
            for freq in [200.0_f32, 750.0, 2500.0, 5000.0] {
                for gain in [-12.0_f32, 0.0, 12.0] {
                    let settings = EqSettings {
                        bass_db: gain,
                        middle_db: gain,
                        treble_db: gain,
                        mid_frequency: freq,
                    };
                    for c in &eq_coefficients(os_rate, &settings) {
                        assert!(is_stable(c), "unstable at {} Hz / {} dB / {}", freq, gain, os_rate);
                        assert!(c.b0.is_finite() && c.b1.is_finite() && c.b2.is_finite());
                    }
                }
            }
        }
    }

    #[test]
    fn test_frequency_clamped_below_nyquist() {
        // A low host rate where the treble shelf would sit above Nyquist
        let c = band_coefficients(BandKind::HighShelf, 4000.0, 3000.0, 0.707, db_to_gain(12.0));
        assert!(is_stable(&c));

        let c = band_coefficients(BandKind::Peaking, OS_RATE, f64::NAN, 0.5, db_to_gain(6.0));
        assert!(is_stable(&c));
    }

    #[test]
    fn test_invalid_gain_and_q_fall_back() {
        let c = band_coefficients(BandKind::Peaking, OS_RATE, 1000.0, -1.0, f32::NAN);
        assert!(is_stable(&c));
        assert!(to_db(magnitude(&c, 1000.0, OS_RATE)).abs() < 0.01);
    }

    #[test]
    fn test_is_stable_detects_unstable_poles() {
        let c = Coefficients {
            a1: -2.5,
            a2: 1.2,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
        };
        assert!(!is_stable(&c));
    }
}
