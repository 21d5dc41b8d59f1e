//! Three-Band Post EQ
//!
//! Bass low-shelf → mid peak → treble high-shelf, run in series on every
//! channel of the oversampled, waveshaped signal.

use biquad::{Biquad, Coefficients, DirectForm2Transposed};

use crate::coefficients::{eq_coefficients, EqSettings, NUM_BANDS};
use crate::denormal::flush_denormal;
use crate::error::DspError;
use crate::oversampling::MAX_CHANNELS;

/// Filter state for one channel, one section per band
type ChannelFilters = [DirectForm2Transposed<f32>; NUM_BANDS];

/// The EQ chain
///
/// Holds the filter state and processes audio samples.
/// Designed for real-time use: no allocations in `process()`.
pub struct EqualizerChain {
    // DirectForm2Transposed: better numerical stability than DF1
    // Each channel needs its own filter state, nothing is shared across channels
    filters: Vec<ChannelFilters>,
    coefficients: [Coefficients<f32>; NUM_BANDS],
    /// Settings the current coefficients were built from
    settings: EqSettings,
    sample_rate: f64,
}

impl EqualizerChain {
    /// Create a flat chain for `channels` channels running at `sample_rate`
    /// (the oversampled rate)
    pub fn new(sample_rate: f64, channels: usize) -> Result<Self, DspError> {
        let mut chain = Self {
            filters: Vec::new(),
            coefficients: eq_coefficients(sample_rate, &EqSettings::default()),
            settings: EqSettings::default(),
            sample_rate,
        };
        chain.prepare(sample_rate, channels)?;
        Ok(chain)
    }

    /// Rebuild filter state for a new rate or channel count
    ///
    /// Note: This allocates. Only call while the audio thread is idle.
    pub fn prepare(&mut self, sample_rate: f64, channels: usize) -> Result<(), DspError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(DspError::InvalidChannelCount {
                got: channels,
                max: MAX_CHANNELS,
            });
        }

        self.sample_rate = sample_rate;
        self.coefficients = eq_coefficients(sample_rate, &self.settings);

        // Rust pattern: arrays of non-Copy types need explicit initialization,
        // `core::array::from_fn` builds one section per band
        let coefficients = self.coefficients;
        self.filters = (0..channels)
            .map(|_| core::array::from_fn(|band| DirectForm2Transposed::<f32>::new(coefficients[band])))
            .collect();
        Ok(())
    }

    /// Apply new settings
    ///
    /// Coefficients are rebuilt only when the settings differ from the ones
    /// in use; the outcome is the same as rebuilding every call.
    /// Call this between blocks, not during.
    ///
    /// # Real-time Safety
    /// No allocations. Returns whether the coefficients changed.
    pub fn update(&mut self, settings: &EqSettings) -> bool {
        if *settings == self.settings {
            return false;
        }

        self.settings = *settings;
        self.coefficients = eq_coefficients(self.sample_rate, settings);
        for channel in &mut self.filters {
            for (filter, coeffs) in channel.iter_mut().zip(self.coefficients.iter()) {
                filter.update_coefficients(*coeffs);
            }
        }
        true
    }

    /// Run one channel through all three sections in place
    ///
    /// # Real-time Safety
    /// This function performs NO allocations and NO syscalls.
    #[inline]
    pub fn process(&mut self, channel: usize, samples: &mut [f32]) -> Result<(), DspError> {
        let channels = self.filters.len();
        let filters = self
            .filters
            .get_mut(channel)
            .ok_or(DspError::ChannelOutOfRange { channel, channels })?;

        for sample in samples.iter_mut() {
            // Rust pattern: `fold` threads the sample through the cascade
            *sample = filters.iter_mut().fold(*sample, |acc, filter| {
                let y = filter.run(acc);
                // Decaying state would otherwise sink into subnormals
                filter.s1 = flush_denormal(filter.s1);
                filter.s2 = flush_denormal(filter.s2);
                y
            });
        }
        Ok(())
    }

    /// Reset filter state (clear delay lines)
    pub fn reset(&mut self) {
        for channel in &mut self.filters {
            for filter in channel.iter_mut() {
                filter.reset_state();
            }
        }
    }

    /// Settings the current coefficients were built from
    pub fn settings(&self) -> &EqSettings {
        &self.settings
    }

    /// Coefficients in processing order
    pub fn coefficients(&self) -> &[Coefficients<f32>; NUM_BANDS] {
        &self.coefficients
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.filters.len()
    }
}
