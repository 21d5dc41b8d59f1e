//! Events flowing from the engine to presentation threads

use serde::{Deserialize, Serialize};

/// Events sent from the engine to whoever displays it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Level meter reading
    /// `brightness` is the 0..1 indicator value derived from `rms`
    LevelUpdate { rms: f32, brightness: f32 },

    /// The audio backend reported a stream error
    StreamError { message: String },

    /// Buffer underrun detected (audio glitch)
    BufferUnderrun,

    /// Capture ring was full, so captured input was dropped
    /// because the output side isn't keeping up
    Overrun,
}

impl Event {
    /// Helper to create a stream error event
    pub fn error(message: impl Into<String>) -> Self {
        Event::StreamError {
            message: message.into(),
        }
    }
}
