//! Distortion Processor
//!
//! Ties the stages together. Per block:
//!
//! ```text
//! params ──▶ EQ coefficients (at 4x rate)
//! input ──▶ upsample 4x ──▶ tanh(x · gain) ──▶ bass/mid/treble ──▶ downsample ──▶ output gain ──▶ RMS
//! ```

use crate::coefficients::EqSettings;
use crate::eq::EqualizerChain;
use crate::error::DspError;
use crate::oversampling::{Oversampler, MAX_CHANNELS, OVERSAMPLING_FACTOR};
use crate::output::{apply_output_gain, rms_from_sum, sum_of_squares};
use crate::params::ProcessParams;
use crate::waveshaper;

/// Stream metadata fixed for the duration of a processing session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    /// Host sample rate in Hz
    pub sample_rate: f64,
    /// Largest block the host will pass, in frames
    pub max_block_size: usize,
    pub channels: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f64, max_block_size: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            channels,
        }
    }

    /// Reject anything the processor cannot be prepared with
    pub fn validate(&self) -> Result<(), DspError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(self.sample_rate));
        }
        if self.max_block_size == 0 {
            return Err(DspError::InvalidBlockSize(self.max_block_size));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(DspError::InvalidChannelCount {
                got: self.channels,
                max: MAX_CHANNELS,
            });
        }
        Ok(())
    }

    /// Rate the waveshaper and EQ run at
    pub fn oversampled_rate(&self) -> f64 {
        self.sample_rate * OVERSAMPLING_FACTOR as f64
    }
}

/// Everything that only exists between `prepare` and `release`
struct PreparedState {
    spec: ProcessSpec,
    oversampler: Oversampler,
    eq: EqualizerChain,
    /// Planar scratch for interleaved input, `channels * max_block_size`
    deinterleaved: Vec<f32>,
}

/// The complete distortion signal path
///
/// # Real-time Safety Contract
///
/// `process()` and `process_interleaved()`:
/// - NO heap allocations (all buffers are sized in `prepare()`)
/// - NO locks, NO syscalls
/// - O(n) time where n = block length
/// - never fail: an unprepared processor outputs silence
#[derive(Default)]
pub struct Processor {
    state: Option<PreparedState>,
}

impl Processor {
    /// Create an unprepared processor
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate all state for a session
    ///
    /// Calling this again with the same spec leaves the processor in the same
    /// zeroed state as a fresh one.
    ///
    /// Note: This allocates. Only call while the audio thread is idle.
    pub fn prepare(&mut self, spec: ProcessSpec) -> Result<(), DspError> {
        spec.validate()?;

        let mut oversampler = Oversampler::new();
        oversampler.prepare(spec.channels, spec.max_block_size)?;
        let eq = EqualizerChain::new(spec.oversampled_rate(), spec.channels)?;

        self.state = Some(PreparedState {
            spec,
            oversampler,
            eq,
            deinterleaved: vec![0.0; spec.channels * spec.max_block_size],
        });
        Ok(())
    }

    /// Drop all session state
    pub fn release(&mut self) {
        self.state = None;
    }

    pub fn is_prepared(&self) -> bool {
        self.state.is_some()
    }

    pub fn spec(&self) -> Option<&ProcessSpec> {
        self.state.as_ref().map(|state| &state.spec)
    }

    /// Clear delay lines of the oversampler and EQ, keeping allocations
    pub fn reset(&mut self) {
        if let Some(state) = &mut self.state {
            state.oversampler.reset();
            state.eq.reset();
        }
    }

    /// Processing latency in host-rate samples
    pub fn latency_samples(&self) -> f32 {
        self.state
            .as_ref()
            .map_or(0.0, |state| state.oversampler.latency_samples())
    }

    /// Current EQ settings (for inspection and tests)
    pub fn eq_settings(&self) -> Option<&EqSettings> {
        self.state.as_ref().map(|state| state.eq.settings())
    }

    /// Process planar channel buffers in place
    ///
    /// Returns the RMS of the first channel after the output stage.
    /// Buffers longer than the prepared block size are handled in chunks.
    /// Channels beyond the prepared count are left untouched.
    ///
    /// # Real-time Safety
    /// No allocations. O(n) where n = total samples.
    pub fn process(&mut self, channels: &mut [&mut [f32]], params: &ProcessParams) -> f32 {
        let Some(state) = &mut self.state else {
            for channel in channels.iter_mut() {
                channel.fill(0.0);
            }
            return 0.0;
        };

        let params = params.clamped();
        state.eq.update(&EqSettings::from(params));

        let max_block_size = state.spec.max_block_size;
        let active = channels.len().min(state.spec.channels);
        let mut level_sum = 0.0_f64;
        let mut level_len = 0_usize;

        for (index, channel) in channels.iter_mut().take(active).enumerate() {
            for chunk in channel.chunks_mut(max_block_size) {
                if process_chunk(&mut state.oversampler, &mut state.eq, index, chunk, &params).is_err() {
                    chunk.fill(0.0);
                }
                if index == 0 {
                    level_sum += sum_of_squares(chunk);
                    level_len += chunk.len();
                }
            }
        }

        rms_from_sum(level_sum, level_len)
    }

    /// Process an interleaved buffer in place
    ///
    /// Buffer format: [L0, R0, L1, R1, ...] with the prepared channel count.
    /// A trailing partial frame is left untouched.
    ///
    /// # Real-time Safety
    /// No allocations. O(n) where n = buffer length.
    pub fn process_interleaved(&mut self, buffer: &mut [f32], params: &ProcessParams) -> f32 {
        let Some(state) = &mut self.state else {
            buffer.fill(0.0);
            return 0.0;
        };

        let params = params.clamped();
        state.eq.update(&EqSettings::from(params));

        let channels = state.spec.channels;
        let max_block_size = state.spec.max_block_size;
        let frames = buffer.len() / channels;
        let mut level_sum = 0.0_f64;

        // Spans are whole frames, at most one prepared block long
        for span in buffer[..frames * channels].chunks_mut(max_block_size * channels) {
            let n = span.len() / channels;

            for (i, frame) in span.chunks_exact(channels).enumerate() {
                for (ch, &sample) in frame.iter().enumerate() {
                    state.deinterleaved[ch * max_block_size + i] = sample;
                }
            }

            for ch in 0..channels {
                let start = ch * max_block_size;
                let planar = &mut state.deinterleaved[start..start + n];
                if process_chunk(&mut state.oversampler, &mut state.eq, ch, planar, &params).is_err() {
                    planar.fill(0.0);
                }
                if ch == 0 {
                    level_sum += sum_of_squares(planar);
                }
            }

            for (i, frame) in span.chunks_exact_mut(channels).enumerate() {
                for (ch, sample) in frame.iter_mut().enumerate() {
                    *sample = state.deinterleaved[ch * max_block_size + i];
                }
            }
        }

        rms_from_sum(level_sum, frames)
    }
}

/// Run one channel of at most `max_block_size` samples through the chain
#[inline]
fn process_chunk(
    oversampler: &mut Oversampler,
    eq: &mut EqualizerChain,
    channel: usize,
    samples: &mut [f32],
    params: &ProcessParams,
) -> Result<(), DspError> {
    let wide = oversampler.process_up(channel, samples)?;
    waveshaper::process_block(wide, params.gain);
    eq.process(channel, wide)?;
    oversampler.process_down(channel, samples)?;
    apply_output_gain(samples, params.output_db);
    Ok(())
}
