//! Processing Session
//!
//! [`Plugin`] is what a host talks to. It owns the [`Processor`] and shares
//! the [`ParameterStore`] and [`LevelMeter`] with control and presentation
//! threads.
//!
//! ```text
//!              prepare()            process()
//! Unprepared ───────────▶ Prepared ───────────▶ Processing ──┐
//!     ▲                      │                      ▲        │ process()
//!     │       release()      │                      └────────┘
//!     └──────────────────────┴──────────────────────────────┘
//! ```
//!
//! `prepare` while `Processing` is rejected; release first.

use std::sync::Arc;

use garrotxa_dsp::{ProcessSpec, Processor};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::meter::LevelMeter;
use crate::params::ParameterStore;

/// Lifecycle of a processing session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unprepared,
    Prepared,
    Processing,
}

/// The distortion effect as seen by a host
pub struct Plugin {
    processor: Processor,
    params: Arc<ParameterStore>,
    meter: Arc<LevelMeter>,
    state: SessionState,
}

impl Default for Plugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin {
    /// Create an unprepared plugin with default parameters
    pub fn new() -> Self {
        Self::with_params(Arc::new(ParameterStore::new()))
    }

    /// Create an unprepared plugin around an existing parameter store
    pub fn with_params(params: Arc<ParameterStore>) -> Self {
        Self {
            processor: Processor::new(),
            params,
            meter: Arc::new(LevelMeter::new()),
            state: SessionState::Unprepared,
        }
    }

    /// Shared handle for control threads
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Shared handle for presentation threads
    pub fn meter(&self) -> &Arc<LevelMeter> {
        &self.meter
    }

    pub fn session_state(&self) -> SessionState {
        self.state
    }

    pub fn spec(&self) -> Option<&ProcessSpec> {
        self.processor.spec()
    }

    /// Start a session
    ///
    /// Any previous session is torn down first, so a failed prepare leaves
    /// the plugin `Unprepared`.
    ///
    /// Note: This allocates. The host must not call `process` concurrently.
    pub fn prepare(&mut self, sample_rate: f64, block_size: usize, channels: usize) -> EngineResult<()> {
        if self.state == SessionState::Processing {
            warn!("prepare() rejected while processing");
            return Err(EngineError::ReconfigureWhileProcessing);
        }

        self.processor.release();
        self.state = SessionState::Unprepared;
        self.meter.publish(0.0);

        let spec = ProcessSpec::new(sample_rate, block_size, channels);
        self.processor.prepare(spec)?;
        self.state = SessionState::Prepared;

        info!(
            "Prepared: {} Hz, {} frames, {} channel(s), latency {:.2} samples",
            sample_rate,
            block_size,
            channels,
            self.processor.latency_samples()
        );
        Ok(())
    }

    /// End the session and free its buffers
    pub fn release(&mut self) {
        if self.state != SessionState::Unprepared {
            info!("Released processing session");
        }
        self.processor.release();
        self.state = SessionState::Unprepared;
        self.meter.publish(0.0);
    }

    /// Clear filter history without ending the session
    pub fn reset(&mut self) {
        self.processor.reset();
    }

    /// Group delay at DC in host-rate samples, for latency compensation
    pub fn latency_samples(&self) -> f32 {
        self.processor.latency_samples()
    }

    /// Process planar channel buffers in place and publish the block level
    ///
    /// Unprepared: outputs silence and publishes zero.
    ///
    /// # Real-time Safety
    /// No allocations, no locks. Parameters are read once per call.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) -> f32 {
        let params = self.params.snapshot();
        let rms = self.processor.process(channels, &params);
        self.finish_block(rms)
    }

    /// Process an interleaved buffer in place and publish the block level
    ///
    /// # Real-time Safety
    /// No allocations, no locks. Parameters are read once per call.
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) -> f32 {
        let params = self.params.snapshot();
        let rms = self.processor.process_interleaved(buffer, &params);
        self.finish_block(rms)
    }

    #[inline]
    fn finish_block(&mut self, rms: f32) -> f32 {
        if self.state == SessionState::Prepared {
            self.state = SessionState::Processing;
        }
        self.meter.publish(rms);
        rms
    }

    /// Serialize the parameter values
    pub fn save_state(&self) -> EngineResult<Vec<u8>> {
        self.params.save_state()
    }

    /// Restore parameter values, falling back to defaults on a bad blob
    pub fn restore_state(&self, bytes: &[u8]) -> bool {
        self.params.restore(bytes)
    }
}
