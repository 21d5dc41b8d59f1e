//! Level Meter and Poller
//!
//! The audio thread publishes one RMS value per block into [`LevelMeter`].
//! Presentation code either reads it directly or runs a [`MeterPoller`],
//! which samples it at a fixed rate and forwards [`Event::LevelUpdate`]s.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::message::Event;

/// Scale from RMS to indicator brightness
const LED_SCALE: f32 = 5.0;

/// Floor reported by [`LevelMeter::rms_db`] for silence
pub const SILENCE_DB: f32 = -100.0;

/// Slowest accepted poll rate
pub const MIN_METER_RATE_HZ: f32 = 0.1;

/// Fastest accepted poll rate
pub const MAX_METER_RATE_HZ: f32 = 1000.0;

/// Poll period for `rate_hz`, rejecting rates outside
/// [`MIN_METER_RATE_HZ`]..=[`MAX_METER_RATE_HZ`]
pub fn meter_period(rate_hz: f32) -> EngineResult<Duration> {
    if !(MIN_METER_RATE_HZ..=MAX_METER_RATE_HZ).contains(&rate_hz) {
        return Err(EngineError::ConfigError(format!(
            "Invalid meter rate: {} (expected {} to {} Hz)",
            rate_hz, MIN_METER_RATE_HZ, MAX_METER_RATE_HZ
        )));
    }
    Duration::try_from_secs_f32(1.0 / rate_hz)
        .map_err(|e| EngineError::ConfigError(format!("Invalid meter rate: {}: {}", rate_hz, e)))
}

/// Most recent block RMS, written by the audio thread
#[derive(Debug)]
pub struct LevelMeter {
    /// Rust pattern: AtomicF32 doesn't exist, so we use bit-casting
    rms_bits: AtomicU32,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            rms_bits: AtomicU32::new(0.0_f32.to_bits()),
        }
    }

    /// Publish the level of the block just processed
    ///
    /// # Real-time Safety
    /// A single relaxed store.
    #[inline]
    pub fn publish(&self, rms: f32) {
        let rms = if rms.is_finite() { rms.max(0.0) } else { 0.0 };
        self.rms_bits.store(rms.to_bits(), Ordering::Relaxed);
    }

    /// Linear RMS of the last processed block (first channel)
    #[inline]
    pub fn rms(&self) -> f32 {
        f32::from_bits(self.rms_bits.load(Ordering::Relaxed))
    }

    /// Level in dBFS, floored at [`SILENCE_DB`]
    pub fn rms_db(&self) -> f32 {
        let rms = self.rms();
        if rms <= 0.0 {
            SILENCE_DB
        } else {
            (20.0 * rms.log10()).max(SILENCE_DB)
        }
    }

    /// Indicator brightness in 0..1
    pub fn led_brightness(&self) -> f32 {
        (self.rms() * LED_SCALE).clamp(0.0, 1.0)
    }

    /// Current reading as an event
    pub fn event(&self) -> Event {
        Event::LevelUpdate {
            rms: self.rms(),
            brightness: self.led_brightness(),
        }
    }
}

/// Background thread sampling a [`LevelMeter`] at a fixed rate
///
/// Stops when dropped, or on its own once the event receiver is gone.
pub struct MeterPoller {
    stop_sender: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl MeterPoller {
    /// Start polling `meter` every `1 / rate_hz` seconds
    pub fn spawn(meter: Arc<LevelMeter>, rate_hz: f32, events: Sender<Event>) -> EngineResult<Self> {
        let period = meter_period(rate_hz)?;
        let (stop_sender, stop_receiver) = bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("garrotxa-meter".into())
            .spawn(move || {
                debug!("Meter poller started ({:?} period)", period);
                loop {
                    match stop_receiver.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {
                            if events.send(meter.event()).is_err() {
                                break;
                            }
                        }
                        // Stop requested or poller dropped
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Meter poller stopped");
            })?;

        Ok(Self {
            stop_sender,
            thread: Some(thread),
        })
    }

    /// Stop the thread and wait for it
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_sender.try_send(());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MeterPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_starts_silent() {
        let meter = LevelMeter::new();
        assert_eq!(meter.rms(), 0.0);
        assert_eq!(meter.rms_db(), SILENCE_DB);
        assert_eq!(meter.led_brightness(), 0.0);
    }

    #[test]
    fn test_led_brightness() {
        let meter = LevelMeter::new();
        meter.publish(0.1);
        assert!((meter.led_brightness() - 0.5).abs() < 1e-6);

        meter.publish(0.5725);
        assert_eq!(meter.led_brightness(), 1.0);
    }

    #[test]
    fn test_rms_db() {
        let meter = LevelMeter::new();
        meter.publish(0.5);
        assert!((meter.rms_db() - (-6.0206)).abs() < 0.01);

        meter.publish(1e-9);
        assert_eq!(meter.rms_db(), SILENCE_DB);
    }

    #[test]
    fn test_publish_rejects_garbage() {
        let meter = LevelMeter::new();
        meter.publish(f32::NAN);
        assert_eq!(meter.rms(), 0.0);
        meter.publish(f32::INFINITY);
        assert_eq!(meter.rms(), 0.0);
        meter.publish(-1.0);
        assert_eq!(meter.rms(), 0.0);
    }

    #[test]
    fn test_event_reflects_reading() {
        let meter = LevelMeter::new();
        meter.publish(0.1);
        match meter.event() {
            Event::LevelUpdate { rms, brightness } => {
                assert_eq!(rms, 0.1);
                assert!((brightness - 0.5).abs() < 1e-6);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_poller_sends_updates() {
        let meter = Arc::new(LevelMeter::new());
        meter.publish(0.2);
        let (sender, receiver) = unbounded();

        let poller = MeterPoller::spawn(Arc::clone(&meter), 200.0, sender).unwrap();
        let event = receiver.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(event, Event::LevelUpdate { rms, .. } if rms == 0.2));
        poller.stop();

        // Drain whatever was sent before the stop, then the channel closes
        while receiver.recv_timeout(Duration::from_secs(1)).is_ok() {}
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_poller_exits_when_receiver_dropped() {
        let meter = Arc::new(LevelMeter::new());
        let (sender, receiver) = unbounded();
        let poller = MeterPoller::spawn(meter, 500.0, sender).unwrap();
        drop(receiver);
        // Dropping must not hang
        drop(poller);
    }

    #[test]
    fn test_poller_rejects_bad_rate() {
        let meter = Arc::new(LevelMeter::new());
        let (sender, _receiver) = unbounded();
        assert!(MeterPoller::spawn(Arc::clone(&meter), 0.0, sender.clone()).is_err());
        assert!(MeterPoller::spawn(meter, f32::NAN, sender).is_err());
    }

    #[test]
    fn test_poller_rejects_out_of_range_rate() {
        let meter = Arc::new(LevelMeter::new());
        let (sender, _receiver) = unbounded();
        for rate in [1e-20, f32::MIN_POSITIVE, 0.05, 1001.0, f32::INFINITY, -5.0] {
            let result = MeterPoller::spawn(Arc::clone(&meter), rate, sender.clone());
            assert!(
                matches!(result, Err(EngineError::ConfigError(_))),
                "rate {} accepted",
                rate
            );
        }
    }

    #[test]
    fn test_meter_period_bounds() {
        let slowest = meter_period(MIN_METER_RATE_HZ).unwrap();
        assert!((slowest.as_secs_f64() - 10.0).abs() < 1e-3);
        let fastest = meter_period(MAX_METER_RATE_HZ).unwrap();
        assert!((fastest.as_secs_f64() - 0.001).abs() < 1e-6);
        assert!(meter_period(1e-20).is_err());
    }
}
