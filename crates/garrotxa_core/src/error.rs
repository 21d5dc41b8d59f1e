//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("DSP error: {0}")]
    DspError(#[from] garrotxa_dsp::DspError),

    #[error("Cannot reconfigure while processing - release the session first")]
    ReconfigureWhileProcessing,

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Could not restore state: {0}")]
    StateRestore(String),

    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("No audio devices found")]
    NoDevicesFound,

    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("Failed to play audio stream: {0}")]
    StreamPlayError(String),

    #[error("Stream configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
