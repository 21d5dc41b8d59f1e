//! Persistent Plugin State
//!
//! Serializes the parameter values into a tagged, versioned JSON blob.
//! Hosts store the blob in their project; the CLI stores it on disk.
//!
//! # Storage Locations
//! - Linux: `~/.config/garrotxa/state.json`
//! - Windows: `%APPDATA%\garrotxa\state.json`
//! - macOS: `~/Library/Application Support/garrotxa/state.json`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::params::{ParamId, ParameterStore};

/// Tag identifying a blob as ours
pub const STATE_TAG: &str = "garrotxa";

/// Current blob format version
pub const STATE_VERSION: u32 = 1;

/// Snapshot of every parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginState {
    pub tag: String,
    pub version: u32,
    /// Keyed by stable parameter name
    #[serde(default)]
    pub params: BTreeMap<String, f32>,
}

impl Default for PluginState {
    fn default() -> Self {
        Self {
            tag: STATE_TAG.to_string(),
            version: STATE_VERSION,
            params: ParamId::ALL
                .into_iter()
                .map(|id| (id.name().to_string(), id.default_value()))
                .collect(),
        }
    }
}

impl PluginState {
    /// Read the current values out of a store
    pub fn capture(store: &ParameterStore) -> Self {
        Self {
            tag: STATE_TAG.to_string(),
            version: STATE_VERSION,
            params: store.iter().map(|(name, value)| (name.to_string(), value)).collect(),
        }
    }

    /// Write these values into a store
    ///
    /// Missing or non-finite entries put that parameter back to its default.
    /// Unknown names are ignored.
    pub fn apply(&self, store: &ParameterStore) {
        for id in ParamId::ALL {
            let value = self
                .params
                .get(id.name())
                .copied()
                .filter(|value| value.is_finite())
                .unwrap_or_else(|| id.default_value());
            store.set(id, value);
        }

        for name in self.params.keys() {
            if ParamId::from_name(name).is_none() {
                warn!("Ignoring unknown parameter '{}' in saved state", name);
            }
        }
    }

    pub fn to_bytes(&self) -> EngineResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse a blob, rejecting anything that isn't ours
    pub fn from_bytes(bytes: &[u8]) -> EngineResult<Self> {
        let state: PluginState = serde_json::from_slice(bytes)
            .map_err(|e| EngineError::StateRestore(format!("malformed state: {}", e)))?;

        if state.tag != STATE_TAG {
            return Err(EngineError::StateRestore(format!(
                "unexpected tag '{}'",
                state.tag
            )));
        }
        if state.version > STATE_VERSION {
            return Err(EngineError::StateRestore(format!(
                "unsupported version {}",
                state.version
            )));
        }
        Ok(state)
    }

    /// Write the blob to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> EngineResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;

        info!("State saved to {:?}", path);
        Ok(())
    }

    pub fn load_from(path: &Path) -> EngineResult<Self> {
        let bytes = fs::read(path)?;
        let state = Self::from_bytes(&bytes)?;
        info!("State loaded from {:?}", path);
        Ok(state)
    }

    /// Platform-specific location of the state file
    pub fn default_path() -> EngineResult<PathBuf> {
        ProjectDirs::from("com", "garrotxa", "garrotxa")
            .map(|proj| proj.config_dir().join("state.json"))
            .ok_or(EngineError::NoConfigDir)
    }
}

impl ParameterStore {
    /// Serialize the current values
    pub fn save_state(&self) -> EngineResult<Vec<u8>> {
        PluginState::capture(self).to_bytes()
    }

    /// Restore values from a blob
    ///
    /// Never fails: an unreadable or foreign blob resets every parameter to
    /// its default. Returns whether the blob was accepted.
    pub fn restore(&self, bytes: &[u8]) -> bool {
        match PluginState::from_bytes(bytes) {
            Ok(state) => {
                state.apply(self);
                true
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                self.reset();
                false
            }
        }
    }
}
