//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during DSP operations
///
/// Every payload is `Copy` so these can be built on the audio thread
/// without touching the allocator.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DspError {
    #[error("Sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("Block size must be at least 1 sample, got {0}")]
    InvalidBlockSize(usize),

    #[error("Channel count must be 1-{max}, got {got}")]
    InvalidChannelCount { got: usize, max: usize },

    #[error("Channel {channel} out of range ({channels} channels prepared)")]
    ChannelOutOfRange { channel: usize, channels: usize },

    #[error("Buffer size mismatch: expected at most {expected}, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },

    #[error("Downsampling channel {0} without a matching upsampled block")]
    DownWithoutUp(usize),

    #[error("Processor has not been prepared")]
    NotPrepared,
}
