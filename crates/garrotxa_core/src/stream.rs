//! Live Audio Stream
//!
//! Runs a [`Plugin`] between a capture device and a playback device.
//!
//! ```text
//! input device ──▶ capture callback ──▶ rtrb ring ──▶ output callback ──▶ output device
//!                                                       │
//!                                               Plugin::process_interleaved
//! ```
//!
//! The two callbacks run on backend threads. The ring buffer is the only
//! thing they share; an empty ring on the output side plays silence and
//! reports [`Event::BufferUnderrun`], a full ring on the capture side drops
//! input and reports [`Event::Overrun`].

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig as CpalStreamConfig};
use crossbeam_channel::Sender;
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{info, warn};

use crate::config::StreamConfig;
use crate::error::{EngineError, EngineResult};
use crate::message::Event;
use crate::meter::LevelMeter;
use crate::params::ParameterStore;
use crate::plugin::Plugin;

/// Ring capacity in buffers
const RING_BUFFERS: usize = 4;

/// Push captured samples into the ring
///
/// Returns `false` if the ring was too full to take all of them.
///
/// # Real-time Safety
/// No allocations, no locks.
#[inline]
pub fn push_input(producer: &mut Producer<f32>, data: &[f32]) -> bool {
    let writable = producer.slots().min(data.len());
    let written = producer
        .write_chunk_uninit(writable)
        .map_or(0, |chunk| chunk.fill_from_iter(data.iter().copied()));
    written == data.len()
}

/// Fill `data` from the ring, padding with silence
///
/// Returns `false` on underrun.
///
/// # Real-time Safety
/// No allocations, no locks.
#[inline]
pub fn pull_output(consumer: &mut Consumer<f32>, data: &mut [f32]) -> bool {
    let to_read = data.len().min(consumer.slots());

    if to_read < data.len() {
        data.fill(0.0);
    }

    if let Ok(chunk) = consumer.read_chunk(to_read) {
        let (first, second) = chunk.as_slices();
        data[..first.len()].copy_from_slice(first);
        data[first.len()..first.len() + second.len()].copy_from_slice(second);
        chunk.commit_all();
    }

    to_read == data.len()
}

/// An active duplex stream running the plugin
pub struct AudioStream {
    /// Rust pattern: held only to keep the backend streams alive
    #[allow(dead_code)]
    capture_stream: Stream,

    #[allow(dead_code)]
    output_stream: Stream,

    params: Arc<ParameterStore>,
    meter: Arc<LevelMeter>,
    latency_samples: f32,

    /// Current stream configuration
    pub config: StreamConfig,
}

impl AudioStream {
    /// Open the default input and output devices of the default host
    pub fn open_default(
        config: StreamConfig,
        plugin: Plugin,
        event_sender: Sender<Event>,
    ) -> EngineResult<Self> {
        let host = cpal::default_host();
        let input = host.default_input_device().ok_or(EngineError::NoDevicesFound)?;
        let output = host.default_output_device().ok_or(EngineError::NoDevicesFound)?;

        info!(
            "Using input '{}' and output '{}' on {:?}",
            input.name().unwrap_or_else(|_| "unknown".into()),
            output.name().unwrap_or_else(|_| "unknown".into()),
            host.id()
        );

        Self::new_duplex(config, &input, &output, plugin, event_sender)
    }

    /// Build and start a duplex stream
    ///
    /// The plugin is prepared for `config` here and then moved into the
    /// output callback; keep its `params()` and `meter()` handles beforehand
    /// or read them back from the returned stream.
    pub fn new_duplex(
        config: StreamConfig,
        input_device: &Device,
        output_device: &Device,
        mut plugin: Plugin,
        event_sender: Sender<Event>,
    ) -> EngineResult<Self> {
        config.validate()?;

        plugin.prepare(
            config.sample_rate as f64,
            config.buffer_size as usize,
            config.channels as usize,
        )?;
        let params = Arc::clone(plugin.params());
        let meter = Arc::clone(plugin.meter());
        let latency_samples = plugin.latency_samples();

        let ring_size = config.samples_per_buffer() * RING_BUFFERS;
        let (producer, consumer) = RingBuffer::<f32>::new(ring_size);

        let cpal_config = CpalStreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let capture_stream =
            Self::build_capture_stream(input_device, &cpal_config, producer, event_sender.clone())?;
        let output_stream =
            Self::build_output_stream(output_device, &cpal_config, consumer, plugin, event_sender)?;

        capture_stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;
        output_stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;

        info!(
            "Stream started: {} Hz, {} frames ({:.1} ms), {} channel(s)",
            config.sample_rate,
            config.buffer_size,
            config.latency_ms(),
            config.channels
        );

        Ok(Self {
            capture_stream,
            output_stream,
            params,
            meter,
            latency_samples,
            config,
        })
    }

    fn build_capture_stream(
        device: &Device,
        config: &CpalStreamConfig,
        mut producer: Producer<f32>,
        event_sender: Sender<Event>,
    ) -> EngineResult<Stream> {
        let err_sender = event_sender.clone();

        let stream = device
            .build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Real-time audio callback - NO allocations allowed here
                    if !push_input(&mut producer, data) {
                        let _ = event_sender.try_send(Event::Overrun);
                    }
                },
                move |err| {
                    let _ = err_sender.try_send(Event::error(err.to_string()));
                },
                None, // No timeout
            )
            .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

        Ok(stream)
    }

    fn build_output_stream(
        device: &Device,
        config: &CpalStreamConfig,
        mut consumer: Consumer<f32>,
        mut plugin: Plugin,
        event_sender: Sender<Event>,
    ) -> EngineResult<Stream> {
        let err_sender = event_sender.clone();

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Real-time audio callback - NO allocations allowed here
                    if !pull_output(&mut consumer, data) {
                        let _ = event_sender.try_send(Event::BufferUnderrun);
                    }
                    plugin.process_interleaved(data);
                },
                move |err| {
                    let _ = err_sender.try_send(Event::error(err.to_string()));
                },
                None,
            )
            .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

        Ok(stream)
    }

    /// Parameter store of the running plugin
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Level meter of the running plugin
    pub fn meter(&self) -> &Arc<LevelMeter> {
        &self.meter
    }

    /// Processing latency in samples, excluding device buffers
    pub fn latency_samples(&self) -> f32 {
        self.latency_samples
    }

    /// Pause both streams
    pub fn pause(&self) -> EngineResult<()> {
        self.output_stream
            .pause()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;
        if let Err(e) = self.capture_stream.pause() {
            warn!("Failed to pause capture stream: {}", e);
        }
        Ok(())
    }

    /// Resume both streams
    pub fn resume(&self) -> EngineResult<()> {
        self.capture_stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;
        self.output_stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))
    }
}
