// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Benchmark configuration file (JSON).
//!
//! Every field is optional; anything missing falls back to the built-in
//! defaults. Command-line flags are applied on top with
//! [`BenchConfig::with_overrides`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wlogic_core::InferenceConfig;

use crate::dataset::DEFAULT_SEED;

/// Error type for config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading (including a missing file).
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Deserialization failure.
    #[error("serde error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Solver settings as they appear in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceSettings {
    /// Upper bound on gradient iterations.
    pub max_iterations: u32,
    /// Step fraction in `(0, 1]`.
    pub step_size: f64,
    /// Convergence threshold.
    pub tolerance: f64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        let cfg = InferenceConfig::default();
        Self {
            max_iterations: cfg.max_iterations,
            step_size: cfg.step_size,
            tolerance: cfg.tolerance,
        }
    }
}

impl From<InferenceSettings> for InferenceConfig {
    fn from(s: InferenceSettings) -> Self {
        Self {
            max_iterations: s.max_iterations,
            step_size: s.step_size,
            tolerance: s.tolerance,
        }
    }
}

/// Top-level benchmark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Dataset seed.
    pub seed: u64,
    /// Directory for the disk backend's log file.
    pub store_dir: PathBuf,
    /// Solver settings.
    pub inference: InferenceSettings,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            store_dir: std::env::temp_dir().join("wlogic-bench"),
            inference: InferenceSettings::default(),
        }
    }
}

impl BenchConfig {
    /// Parses a config from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a config file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, seed: Option<u64>, store_dir: Option<PathBuf>) -> Self {
        if let Some(seed) = seed {
            self.seed = seed;
        }
        if let Some(dir) = store_dir {
            self.store_dir = dir;
        }
        self
    }
}
