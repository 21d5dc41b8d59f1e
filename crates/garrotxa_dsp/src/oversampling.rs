//! 4x Oversampling with Polyphase Half-Band IIR Filters
//!
//! The waveshaper creates harmonics far above the host Nyquist limit.
//! Running it at four times the host rate keeps those harmonics from folding
//! back into the audible band.
//!
//! # Structure
//!
//! Two cascaded 2x stages, each a half-band low-pass built from two parallel
//! branches of first-order allpass sections:
//!
//! ```text
//! H(z) = 0.5 * (A0(z²) + z⁻¹ · A1(z²))
//!
//! up:    x ──▶ [stage 1: 1x→2x] ──▶ [stage 2: 2x→4x] ──▶ wide block
//! down:  wide block ──▶ [stage 2: 4x→2x] ──▶ [stage 1: 2x→1x] ──▶ y
//! ```
//!
//! Polyphase form means each branch runs at the lower of the two rates, so
//! upsampling never filters the inserted zeros and downsampling never
//! computes samples that decimation would throw away.
//!
//! Stage 1 sits next to the audio band and gets the steep filter
//! (transition 0.1, ~87 dB rejection). Stage 2 only has to reject images of
//! content that is already band-limited, so a cheaper filter does
//! (transition 0.2, ~77 dB).
//!
//! # Real-time Safety
//! All delay lines and intermediate buffers are allocated in `prepare()`.
//! `process_up()` and `process_down()` never allocate.

use crate::denormal::flush_denormal;
use crate::error::DspError;

/// Fixed oversampling factor (two cascaded 2x stages)
pub const OVERSAMPLING_FACTOR: usize = 4;

/// Upper bound on channels a single oversampler will prepare
pub const MAX_CHANNELS: usize = 8;

/// Stage 1 allpass coefficients, sorted ascending.
/// Even indices feed branch A0, odd indices feed branch A1.
#[allow(clippy::excessive_precision)]
const STAGE1_COEFFS: [f32; 5] = [
    0.054_230_780_876_614,
    0.199_699_579_426_328,
    0.398_796_973_552_974,
    0.621_096_845_120_504,
    0.862_917_812_650_503,
];

/// Stage 2 allpass coefficients, same layout as stage 1
#[allow(clippy::excessive_precision)]
const STAGE2_COEFFS: [f32; 3] = [
    0.081_430_023_176_616,
    0.315_659_840_216_660,
    0.709_770_800_102_477,
];

/// First-order allpass: y = (a + z⁻¹) / (1 + a·z⁻¹)
#[derive(Debug, Clone)]
struct AllpassSection {
    a: f32,
    state: f32,
}

impl AllpassSection {
    fn new(a: f32) -> Self {
        Self { a, state: 0.0 }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        let y = self.a * x + self.state;
        self.state = flush_denormal(x - self.a * y);
        y
    }

    /// Group delay at DC, in samples of the rate this section runs at
    fn dc_delay(&self) -> f32 {
        (1.0 - self.a) / (1.0 + self.a)
    }
}

/// Cascade of allpass sections forming one polyphase branch
#[derive(Debug, Clone)]
struct AllpassBranch {
    sections: Vec<AllpassSection>,
}

impl AllpassBranch {
    /// Build the branch from every second coefficient starting at `offset`
    fn from_interleaved(coeffs: &[f32], offset: usize) -> Self {
        Self {
            sections: coeffs
                .iter()
                .skip(offset)
                .step_by(2)
                .map(|&a| AllpassSection::new(a))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        self.sections
            .iter_mut()
            .fold(x, |acc, section| section.process(acc))
    }

    fn reset(&mut self) {
        for section in &mut self.sections {
            section.state = 0.0;
        }
    }

    /// Sum of the section delays at the low rate
    fn dc_delay(&self) -> f32 {
        self.sections.iter().map(AllpassSection::dc_delay).sum()
    }
}

/// One half-band filter split into its two branches
#[derive(Debug, Clone)]
struct HalfBand {
    branch_a: AllpassBranch,
    branch_b: AllpassBranch,
}

impl HalfBand {
    fn new(coeffs: &[f32]) -> Self {
        Self {
            branch_a: AllpassBranch::from_interleaved(coeffs, 0),
            branch_b: AllpassBranch::from_interleaved(coeffs, 1),
        }
    }

    fn reset(&mut self) {
        self.branch_a.reset();
        self.branch_b.reset();
    }

    /// Group delay at DC in samples of the high rate.
    /// Branches run in z², so each low-rate sample counts twice, and the
    /// B branch carries one extra high-rate sample of delay.
    fn dc_delay(&self) -> f32 {
        (2.0 * self.branch_a.dc_delay() + 2.0 * self.branch_b.dc_delay() + 1.0) * 0.5
    }
}

/// 2x interpolator
#[derive(Debug, Clone)]
struct Upsampler2x {
    filter: HalfBand,
}

impl Upsampler2x {
    fn new(coeffs: &[f32]) -> Self {
        Self {
            filter: HalfBand::new(coeffs),
        }
    }

    /// `output` must hold exactly `2 * input.len()` samples
    #[inline]
    fn process(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(output.len(), input.len() * 2);

        // Branch A yields the even output samples, branch B the odd ones.
        // The 0.5 of the half-band and the x2 zero-stuffing gain cancel out.
        for (&x, pair) in input.iter().zip(output.chunks_exact_mut(2)) {
            pair[0] = self.filter.branch_a.process(x);
            pair[1] = self.filter.branch_b.process(x);
        }
    }

    fn reset(&mut self) {
        self.filter.reset();
    }
}

/// 2x decimator
#[derive(Debug, Clone)]
struct Downsampler2x {
    filter: HalfBand,
    /// Previous branch B output, aligns the odd phase with the even one
    delay: f32,
}

impl Downsampler2x {
    fn new(coeffs: &[f32]) -> Self {
        Self {
            filter: HalfBand::new(coeffs),
            delay: 0.0,
        }
    }

    /// `input` must hold exactly `2 * output.len()` samples
    #[inline]
    fn process(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), output.len() * 2);

        for (pair, out) in input.chunks_exact(2).zip(output.iter_mut()) {
            let a = self.filter.branch_a.process(pair[0]);
            let b = self.filter.branch_b.process(pair[1]);
            *out = (a + self.delay) * 0.5;
            self.delay = b;
        }
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.delay = 0.0;
    }
}

/// Filter state and scratch buffers for one channel
#[derive(Debug, Clone)]
struct ChannelOversampler {
    up_stage1: Upsampler2x,
    up_stage2: Upsampler2x,
    down_stage2: Downsampler2x,
    down_stage1: Downsampler2x,
    /// Intermediate signal at 2x
    mid: Vec<f32>,
    /// Signal at 4x, handed out by `process_up`
    wide: Vec<f32>,
    /// Base-rate length of the block currently sitting in `wide`
    pending: Option<usize>,
}

impl ChannelOversampler {
    fn new(max_block_size: usize) -> Self {
        Self {
            up_stage1: Upsampler2x::new(&STAGE1_COEFFS),
            up_stage2: Upsampler2x::new(&STAGE2_COEFFS),
            down_stage2: Downsampler2x::new(&STAGE2_COEFFS),
            down_stage1: Downsampler2x::new(&STAGE1_COEFFS),
            mid: vec![0.0; max_block_size * 2],
            wide: vec![0.0; max_block_size * OVERSAMPLING_FACTOR],
            pending: None,
        }
    }

    fn reset(&mut self) {
        self.up_stage1.reset();
        self.up_stage2.reset();
        self.down_stage2.reset();
        self.down_stage1.reset();
        self.mid.fill(0.0);
        self.wide.fill(0.0);
        self.pending = None;
    }
}

/// Multi-channel 4x oversampler
///
/// Usage per block and channel is strictly `process_up` → work on the
/// returned wide slice → `process_down`. Any change of sample rate or block
/// size requires a new `prepare()`, which also clears every delay line.
#[derive(Debug, Clone, Default)]
pub struct Oversampler {
    channels: Vec<ChannelOversampler>,
    max_block_size: usize,
}

impl Oversampler {
    /// Create an unprepared oversampler
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate state for `channels` channels and blocks of up to
    /// `max_block_size` samples. Previous state is discarded.
    ///
    /// Note: This allocates. Only call while the audio thread is idle.
    pub fn prepare(&mut self, channels: usize, max_block_size: usize) -> Result<(), DspError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(DspError::InvalidChannelCount {
                got: channels,
                max: MAX_CHANNELS,
            });
        }
        if max_block_size == 0 {
            return Err(DspError::InvalidBlockSize(max_block_size));
        }

        self.channels = (0..channels)
            .map(|_| ChannelOversampler::new(max_block_size))
            .collect();
        self.max_block_size = max_block_size;
        Ok(())
    }

    /// Clear all delay lines without reallocating
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
    }

    /// Whether `prepare()` has succeeded
    pub fn is_prepared(&self) -> bool {
        !self.channels.is_empty()
    }

    pub fn factor(&self) -> usize {
        OVERSAMPLING_FACTOR
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Round-trip (up + down) group delay at DC in base-rate samples
    pub fn latency_samples(&self) -> f32 {
        let stage1 = HalfBand::new(&STAGE1_COEFFS).dc_delay();
        let stage2 = HalfBand::new(&STAGE2_COEFFS).dc_delay();
        // Each stage is applied twice (up and down). Stage 1 delay is counted
        // in 2x samples, stage 2 in 4x samples.
        2.0 * stage1 / 2.0 + 2.0 * stage2 / 4.0
    }

    /// Upsample one channel of a base-rate block
    ///
    /// Returns the 4x signal (`input.len() * 4` samples) for in-place
    /// processing. It stays valid until the matching `process_down()`.
    ///
    /// # Real-time Safety
    /// No allocations. O(n) where n = block length.
    pub fn process_up(&mut self, channel: usize, input: &[f32]) -> Result<&mut [f32], DspError> {
        if !self.is_prepared() {
            return Err(DspError::NotPrepared);
        }
        let max_block_size = self.max_block_size;
        let channels = self.channels.len();
        let state = self
            .channels
            .get_mut(channel)
            .ok_or(DspError::ChannelOutOfRange { channel, channels })?;

        if input.len() > max_block_size {
            return Err(DspError::BufferSizeMismatch {
                expected: max_block_size,
                got: input.len(),
            });
        }

        let n = input.len();
        let mid = &mut state.mid[..n * 2];
        let wide = &mut state.wide[..n * OVERSAMPLING_FACTOR];

        state.up_stage1.process(input, mid);
        state.up_stage2.process(mid, wide);
        state.pending = Some(n);

        Ok(wide)
    }

    /// Downsample the wide signal of one channel back into `output`
    ///
    /// `output` must have the length of the block passed to the matching
    /// `process_up()`.
    ///
    /// # Real-time Safety
    /// No allocations. O(n) where n = block length.
    pub fn process_down(&mut self, channel: usize, output: &mut [f32]) -> Result<(), DspError> {
        if !self.is_prepared() {
            return Err(DspError::NotPrepared);
        }
        let channels = self.channels.len();
        let state = self
            .channels
            .get_mut(channel)
            .ok_or(DspError::ChannelOutOfRange { channel, channels })?;

        // Rust pattern: `Option::take` consumes the pending marker so a second
        // `process_down` for the same block is rejected
        let n = state.pending.take().ok_or(DspError::DownWithoutUp(channel))?;
        if output.len() != n {
            return Err(DspError::BufferSizeMismatch {
                expected: n,
                got: output.len(),
            });
        }

        let mid = &mut state.mid[..n * 2];
        let wide = &state.wide[..n * OVERSAMPLING_FACTOR];

        state.down_stage2.process(wide, mid);
        state.down_stage1.process(mid, output);

        Ok(())
    }
}
