//! Parameter Ranges and Per-Block Parameter Snapshot
//!
//! The DSP crate owns the numeric contract of every control: its range,
//! default and the curve used when a host drives it through a 0..1 knob.
//! The thread-safe store lives in `garrotxa_core`; the audio path only ever
//! sees a [`ProcessParams`] copy taken once per block.

/// Numeric range of a single control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    /// Skew exponent for normalized mapping (1.0 = linear).
    /// Values below 1.0 give the lower part of the range more knob travel.
    pub skew: f32,
    /// Step legal values snap to, counted from `min` (0.0 = continuous)
    pub interval: f32,
}

impl ParamRange {
    pub const fn linear(min: f32, max: f32, default: f32) -> Self {
        Self {
            min,
            max,
            default,
            skew: 1.0,
            interval: 0.0,
        }
    }

    pub const fn skewed(min: f32, max: f32, default: f32, skew: f32) -> Self {
        Self {
            min,
            max,
            default,
            skew,
            interval: 0.0,
        }
    }

    /// Same range, snapping legal values to multiples of `interval`
    pub const fn with_interval(self, interval: f32) -> Self {
        Self { interval, ..self }
    }

    /// Snap a value to the nearest legal one. NaN maps to the default.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        let value = value.clamp(self.min, self.max);
        if self.interval > 0.0 {
            let steps = ((value - self.min) / self.interval).round();
            (self.min + steps * self.interval).clamp(self.min, self.max)
        } else {
            value
        }
    }

    /// Map a plain value to a 0..1 control position
    pub fn to_normalized(&self, value: f32) -> f32 {
        let proportion = (self.clamp(value) - self.min) / (self.max - self.min);
        if self.skew == 1.0 {
            proportion
        } else {
            proportion.powf(self.skew)
        }
    }

    /// Map a 0..1 control position back to a plain value
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let normalized = if normalized.is_nan() {
            self.to_normalized(self.default)
        } else {
            normalized.clamp(0.0, 1.0)
        };
        let proportion = if self.skew == 1.0 {
            normalized
        } else {
            normalized.powf(1.0 / self.skew)
        };
        self.clamp(self.min + (self.max - self.min) * proportion)
    }
}

/// Drive into the tanh stage (linear multiplier, not dB)
pub const GAIN_RANGE: ParamRange = ParamRange::linear(1.0, 30.0, 10.0);

/// Final output level in dB
pub const OUTPUT_RANGE: ParamRange = ParamRange::linear(-24.0, 24.0, 0.0);

/// Gain of each EQ band in dB (bass, middle, treble)
pub const BAND_GAIN_RANGE: ParamRange = ParamRange::linear(-12.0, 12.0, 0.0);

/// Center of the sweepable mid band in Hz.
/// Skew 0.5: a knob position `p` lands on `200 + 4800 * p²` Hz, snapped to 1 Hz.
pub const MID_FREQUENCY_RANGE: ParamRange =
    ParamRange::skewed(200.0, 5000.0, 750.0, 0.5).with_interval(1.0);

/// Values the audio path reads at a block boundary
///
/// Rust pattern: a plain `Copy` struct is the unit of exchange between the
/// atomic store and the processor, so a block never sees half an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessParams {
    pub gain: f32,
    pub output_db: f32,
    pub bass_db: f32,
    pub middle_db: f32,
    pub treble_db: f32,
    pub mid_frequency: f32,
}

impl Default for ProcessParams {
    fn default() -> Self {
        Self {
            gain: GAIN_RANGE.default,
            output_db: OUTPUT_RANGE.default,
            bass_db: BAND_GAIN_RANGE.default,
            middle_db: BAND_GAIN_RANGE.default,
            treble_db: BAND_GAIN_RANGE.default,
            mid_frequency: MID_FREQUENCY_RANGE.default,
        }
    }
}

impl ProcessParams {
    /// Return a copy with every field forced into its declared range
    pub fn clamped(self) -> Self {
        Self {
            gain: GAIN_RANGE.clamp(self.gain),
            output_db: OUTPUT_RANGE.clamp(self.output_db),
            bass_db: BAND_GAIN_RANGE.clamp(self.bass_db),
            middle_db: BAND_GAIN_RANGE.clamp(self.middle_db),
            treble_db: BAND_GAIN_RANGE.clamp(self.treble_db),
            mid_frequency: MID_FREQUENCY_RANGE.clamp(self.mid_frequency),
        }
    }
}
