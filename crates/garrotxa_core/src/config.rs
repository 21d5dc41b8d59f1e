//! Host and Stream Configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::meter::meter_period;

/// Audio stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Buffer size in frames (lower = less latency, higher = more stability)
    pub buffer_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            buffer_size: 512,
        }
    }
}

impl StreamConfig {
    /// Calculate latency in milliseconds for this configuration
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Interleaved samples in one buffer
    pub fn samples_per_buffer(&self) -> usize {
        self.buffer_size as usize * self.channels as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> EngineResult<()> {
        if self.sample_rate < 8000 || self.sample_rate > 192000 {
            return Err(EngineError::ConfigError(format!(
                "Invalid sample rate: {}",
                self.sample_rate
            )));
        }
        if self.channels == 0 || self.channels as usize > garrotxa_dsp::MAX_CHANNELS {
            return Err(EngineError::ConfigError(format!(
                "Invalid channel count: {}",
                self.channels
            )));
        }
        if self.buffer_size < 32 || self.buffer_size > 8192 {
            return Err(EngineError::ConfigError(format!(
                "Invalid buffer size: {}",
                self.buffer_size
            )));
        }
        Ok(())
    }
}

/// Everything the live host needs besides the plugin itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Stream configuration
    pub stream: StreamConfig,

    /// How often the level meter is polled, in Hz
    pub meter_rate_hz: f32,

    /// Where state is loaded from and saved to (platform default when `None`)
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            meter_rate_hz: 60.0,
            state_path: None,
        }
    }
}

impl HostConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                channels: 2,
                buffer_size: 128, // ~2.7ms latency
            },
            ..Default::default()
        }
    }

    /// Create config optimized for stability
    pub fn stable() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                channels: 2,
                buffer_size: 1024, // ~21ms latency
            },
            ..Default::default()
        }
    }

    pub fn latency_ms(&self) -> f32 {
        self.stream.latency_ms()
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.stream.validate()?;
        meter_period(self.meter_rate_hz)?;
        Ok(())
    }
}
