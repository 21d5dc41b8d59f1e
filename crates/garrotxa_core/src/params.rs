//! Parameter Store
//!
//! One atomic cell per control. Control surfaces (UI, host automation,
//! state restore) write from their own threads; the audio thread takes a
//! [`ProcessParams`] snapshot at each block boundary.
//!
//! Out-of-range writes are clamped, never rejected: the audio path has no
//! way to report a failure.

use std::sync::atomic::{AtomicU32, Ordering};

use garrotxa_dsp::{
    ParamRange, ProcessParams, BAND_GAIN_RANGE, GAIN_RANGE, MID_FREQUENCY_RANGE, OUTPUT_RANGE,
};

use crate::error::{EngineError, EngineResult};

/// Identifier of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Gain,
    Output,
    Bass,
    Middle,
    Treble,
    Frequency,
}

impl ParamId {
    /// All parameters in declaration order
    pub const ALL: [ParamId; 6] = [
        ParamId::Gain,
        ParamId::Output,
        ParamId::Bass,
        ParamId::Middle,
        ParamId::Treble,
        ParamId::Frequency,
    ];

    /// Stable name used for persistence and automation
    pub fn name(self) -> &'static str {
        match self {
            ParamId::Gain => "gain",
            ParamId::Output => "out",
            ParamId::Bass => "bass",
            ParamId::Middle => "middle",
            ParamId::Treble => "treble",
            ParamId::Frequency => "frequency",
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            ParamId::Gain => "Gain",
            ParamId::Output => "Output",
            ParamId::Bass => "Bass",
            ParamId::Middle => "Middle",
            ParamId::Treble => "Treble",
            ParamId::Frequency => "Mid Freq",
        }
    }

    /// Unit suffix for display
    pub fn unit(self) -> &'static str {
        match self {
            ParamId::Gain => "x",
            ParamId::Frequency => "Hz",
            _ => "dB",
        }
    }

    pub fn range(self) -> ParamRange {
        match self {
            ParamId::Gain => GAIN_RANGE,
            ParamId::Output => OUTPUT_RANGE,
            ParamId::Bass | ParamId::Middle | ParamId::Treble => BAND_GAIN_RANGE,
            ParamId::Frequency => MID_FREQUENCY_RANGE,
        }
    }

    pub fn default_value(self) -> f32 {
        self.range().default
    }

    /// Look up a parameter by its stable name
    pub fn from_name(name: &str) -> Option<ParamId> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A single f32 stored as its bit pattern
///
/// Rust pattern: AtomicF32 doesn't exist, so we use bit-casting
#[derive(Debug)]
struct AtomicParam(AtomicU32);

impl AtomicParam {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(&self, value: f32) {
        // Relaxed is enough: each value stands alone and a block may see an
        // update one block late
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Thread-safe store of every control value
///
/// Share it as `Arc<ParameterStore>`; all methods take `&self`.
#[derive(Debug)]
pub struct ParameterStore {
    values: [AtomicParam; 6],
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    /// Create a store with every parameter at its default
    pub fn new() -> Self {
        Self {
            values: core::array::from_fn(|i| AtomicParam::new(ParamId::ALL[i].default_value())),
        }
    }

    /// Current value of a parameter
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        self.values[id.index()].load()
    }

    /// Write a parameter, clamped into its range
    ///
    /// NaN is ignored and leaves the previous value in place.
    /// Returns the value actually stored.
    pub fn set(&self, id: ParamId, value: f32) -> f32 {
        if value.is_nan() {
            return self.get(id);
        }
        let clamped = id.range().clamp(value);
        self.values[id.index()].store(clamped);
        clamped
    }

    /// Current value as a 0..1 control position
    pub fn normalized(&self, id: ParamId) -> f32 {
        id.range().to_normalized(self.get(id))
    }

    /// Write a parameter from a 0..1 control position
    pub fn set_normalized(&self, id: ParamId, normalized: f32) -> f32 {
        if normalized.is_nan() {
            return self.get(id);
        }
        self.set(id, id.range().from_normalized(normalized))
    }

    /// Read a parameter by its stable name
    pub fn get_by_name(&self, name: &str) -> EngineResult<f32> {
        ParamId::from_name(name)
            .map(|id| self.get(id))
            .ok_or_else(|| EngineError::UnknownParameter(name.to_string()))
    }

    /// Write a parameter by its stable name
    pub fn set_by_name(&self, name: &str, value: f32) -> EngineResult<f32> {
        ParamId::from_name(name)
            .map(|id| self.set(id, value))
            .ok_or_else(|| EngineError::UnknownParameter(name.to_string()))
    }

    /// Put every parameter back to its default
    pub fn reset(&self) {
        for id in ParamId::ALL {
            self.values[id.index()].store(id.default_value());
        }
    }

    /// Read every parameter once for the coming block
    ///
    /// # Real-time Safety
    /// Six relaxed atomic loads, no allocation.
    #[inline]
    pub fn snapshot(&self) -> ProcessParams {
        ProcessParams {
            gain: self.get(ParamId::Gain),
            output_db: self.get(ParamId::Output),
            bass_db: self.get(ParamId::Bass),
            middle_db: self.get(ParamId::Middle),
            treble_db: self.get(ParamId::Treble),
            mid_frequency: self.get(ParamId::Frequency),
        }
    }

    /// Iterate `(name, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        ParamId::ALL.into_iter().map(move |id| (id.name(), self.get(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_defaults() {
        let store = ParameterStore::new();
        assert_eq!(store.get(ParamId::Gain), 10.0);
        assert_eq!(store.get(ParamId::Output), 0.0);
        assert_eq!(store.get(ParamId::Bass), 0.0);
        assert_eq!(store.get(ParamId::Middle), 0.0);
        assert_eq!(store.get(ParamId::Treble), 0.0);
        assert_eq!(store.get(ParamId::Frequency), 750.0);
        assert_eq!(store.snapshot(), ProcessParams::default());
    }

    #[test]
    fn test_names_round_trip() {
        for id in ParamId::ALL {
            assert_eq!(ParamId::from_name(id.name()), Some(id));
        }
        assert_eq!(ParamId::from_name("drive"), None);
        assert_eq!(ParamId::Output.name(), "out");
        assert_eq!(ParamId::Frequency.label(), "Mid Freq");
    }

    #[test]
    fn test_write_then_read() {
        let store = ParameterStore::new();
        assert_eq!(store.set(ParamId::Gain, 12.5), 12.5);
        assert_eq!(store.get(ParamId::Gain), 12.5);

        store.set(ParamId::Frequency, 1234.0);
        assert_eq!(store.get(ParamId::Frequency), 1234.0);
    }

    #[test]
    fn test_out_of_range_writes_clamp() {
        let store = ParameterStore::new();
        assert_eq!(store.set(ParamId::Gain, 0.0), 1.0);
        assert_eq!(store.set(ParamId::Output, 100.0), 24.0);
        assert_eq!(store.set(ParamId::Bass, -40.0), -12.0);
        assert_eq!(store.set(ParamId::Frequency, 20000.0), 5000.0);
        assert_eq!(store.set(ParamId::Frequency, f32::NEG_INFINITY), 200.0);
        assert_eq!(store.get(ParamId::Frequency), 200.0);
    }

    #[test]
    fn test_nan_write_ignored() {
        let store = ParameterStore::new();
        store.set(ParamId::Treble, 3.0);
        assert_eq!(store.set(ParamId::Treble, f32::NAN), 3.0);
        assert_eq!(store.get(ParamId::Treble), 3.0);
    }

    #[test]
    fn test_writes_are_independent() {
        let store = ParameterStore::new();
        store.set(ParamId::Middle, -6.0);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.middle_db, -6.0);
        assert_eq!(snapshot.bass_db, 0.0);
        assert_eq!(snapshot.treble_db, 0.0);
        assert_eq!(snapshot.gain, 10.0);
    }

    #[test]
    fn test_by_name() {
        let store = ParameterStore::new();
        assert_eq!(store.set_by_name("treble", 4.0).unwrap(), 4.0);
        assert_eq!(store.get_by_name("treble").unwrap(), 4.0);
        assert!(matches!(
            store.set_by_name("volume", 1.0),
            Err(EngineError::UnknownParameter(_))
        ));
        assert!(store.get_by_name("").is_err());
    }

    #[test]
    fn test_normalized_uses_skew() {
        let store = ParameterStore::new();
        store.set_normalized(ParamId::Frequency, 0.5);
        assert!((store.get(ParamId::Frequency) - 1400.0).abs() < 0.01);
        assert!((store.normalized(ParamId::Frequency) - 0.5).abs() < 1e-5);

        store.set_normalized(ParamId::Output, 1.0);
        assert_eq!(store.get(ParamId::Output), 24.0);
    }

    #[test]
    fn test_reset() {
        let store = ParameterStore::new();
        store.set(ParamId::Gain, 25.0);
        store.set(ParamId::Frequency, 3000.0);
        store.reset();
        assert_eq!(store.snapshot(), ProcessParams::default());
    }

    #[test]
    fn test_iter_in_declaration_order() {
        let store = ParameterStore::new();
        let names: Vec<&str> = store.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["gain", "out", "bass", "middle", "treble", "frequency"]);
    }

    #[test]
    fn test_concurrent_writes_never_tear() {
        let store = Arc::new(ParameterStore::new());
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..10_000 {
                    let value = if i % 2 == 0 { 1.0 } else { 30.0 };
                    store.set(ParamId::Gain, value);
                }
            })
        };

        for _ in 0..10_000 {
            let gain = store.snapshot().gain;
            assert!(gain == 1.0 || gain == 30.0 || gain == 10.0, "torn value {}", gain);
        }
        writer.join().unwrap();
    }
}
