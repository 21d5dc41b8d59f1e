//! Garrotxa Core - Engine
//!
//! This crate wraps the DSP chain into something a host can drive:
//! - Lock-free parameter store shared between control and audio threads
//! - Prepare/process/release session lifecycle
//! - Level meter plus a polling thread for presentation
//! - Tagged state blobs with default fallback
//! - Live duplex stream (via CPAL)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Control Thread                          │
//! │   set()/restore() ──▶ ParameterStore (atomics)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ snapshot() once per block
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Audio Thread                           │
//! │   Capture ──rtrb──▶ Plugin::process ──▶ Output              │
//! │                           │                                 │
//! │              (Zero allocation in this path)                 │
//! └───────────────────────────┼─────────────────────────────────┘
//!                             │ LevelMeter (atomic)
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Presentation Thread                        │
//! │   MeterPoller ──crossbeam-channel──▶ Event::LevelUpdate     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod message;
mod meter;
mod params;
mod plugin;
mod state;
mod stream;

pub use config::{HostConfig, StreamConfig};
pub use error::{EngineError, EngineResult};
pub use message::Event;
pub use meter::{
    meter_period, LevelMeter, MeterPoller, MAX_METER_RATE_HZ, MIN_METER_RATE_HZ, SILENCE_DB,
};
pub use params::{ParamId, ParameterStore};
pub use plugin::{Plugin, SessionState};
pub use state::{PluginState, STATE_TAG, STATE_VERSION};
pub use stream::{pull_output, push_input, AudioStream};

// Re-export DSP types for convenience
pub use garrotxa_dsp::{ParamRange, ProcessParams, ProcessSpec, OVERSAMPLING_FACTOR};
