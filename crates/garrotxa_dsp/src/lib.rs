//! Garrotxa DSP - Digital Signal Processing Module
//!
//! This crate provides the audio processing pipeline for Garrotxa, including:
//! - 4x oversampling with polyphase half-band IIR filters
//! - Tanh waveshaping driven by the gain control
//! - 3-band post EQ (bass shelf, sweepable mid peak, treble shelf) using BiQuad filters
//! - Output gain and RMS level metric
//! - Zero-allocation processing path, with filter state kept out of subnormals
//!
//! # Architecture
//!
//! The DSP chain follows a strict "no allocation in audio callback" rule.
//! Every buffer is sized in `prepare()`; parameters arrive as a `Copy`
//! snapshot once per block, so coefficients never change mid-block.

mod coefficients;
mod denormal;
mod eq;
mod error;
mod oversampling;
mod output;
mod params;
mod processor;
mod waveshaper;

pub use coefficients::{
    band_coefficients, db_to_gain, eq_coefficients, is_stable, BandDescriptor, BandFrequency,
    BandKind, EqSettings, BANDS, NUM_BANDS,
};
pub use denormal::{flush_denormal, DENORMAL_THRESHOLD};
pub use eq::EqualizerChain;
pub use error::DspError;
pub use oversampling::{Oversampler, MAX_CHANNELS, OVERSAMPLING_FACTOR};
pub use output::{apply_output_gain, compute_rms};
pub use params::{
    ParamRange, ProcessParams, BAND_GAIN_RANGE, GAIN_RANGE, MID_FREQUENCY_RANGE, OUTPUT_RANGE,
};
pub use processor::{ProcessSpec, Processor};
pub use waveshaper::shape;

// Re-export the coefficient type so dependents don't need `biquad` directly
pub use biquad::Coefficients;
