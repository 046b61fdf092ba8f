pub mod path;

use std::{io, path::PathBuf, time::Duration};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents all possible errors loading a [CodecConfig]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// Tunables for the codec and the protocols layered on it
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct CodecConfig {
    pub version: u32,
    pub kind: String,
    #[serde(default)]
    pub diagnostic: DiagnosticConfig,
    /// Data size of outgoing feature reports, excluding the report id
    #[serde(default = "default_feature_report_size")]
    pub feature_report_size: usize,
    /// Drop full Bluetooth input reports with a bad checksum trailer
    #[serde(default)]
    pub verify_input_checksum: bool,
    /// Consecutive failed output sends before the device is treated as gone
    #[serde(default = "default_disconnect_after_failures")]
    pub disconnect_after_failures: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            version: 1,
            kind: "CodecConfig".to_string(),
            diagnostic: DiagnosticConfig::default(),
            feature_report_size: default_feature_report_size(),
            verify_input_checksum: false,
            disconnect_after_failures: default_disconnect_after_failures(),
        }
    }
}

impl CodecConfig {
    /// Load a [CodecConfig] from the given YAML string
    pub fn from_yaml(content: String) -> Result<CodecConfig, LoadError> {
        let config: CodecConfig = serde_yaml::from_str(content.as_str())?;
        Ok(config)
    }

    /// Load a [CodecConfig] from the given YAML file
    pub fn from_yaml_file(path: String) -> Result<CodecConfig, LoadError> {
        let file = std::fs::File::open(path)?;
        let config: CodecConfig = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    /// Loads the first config found on the search path, falling back to the
    /// built-in defaults.
    pub fn load() -> CodecConfig {
        for file in path::get_config_paths() {
            if !file.exists() {
                continue;
            }
            let Some(path) = file.to_str() else {
                continue;
            };
            match CodecConfig::from_yaml_file(path.to_string()) {
                Ok(config) => {
                    log::debug!("Loaded config from {path}");
                    return config;
                }
                Err(e) => log::warn!("Failed to load config {path}: {e}"),
            }
        }
        log::debug!("No config found. Using defaults.");
        CodecConfig::default()
    }

    /// Loads the config at the given path, or searches for one if no path
    /// was given.
    pub fn load_from(path: Option<PathBuf>) -> Result<CodecConfig, LoadError> {
        match path {
            Some(path) => CodecConfig::from_yaml_file(path.to_string_lossy().to_string()),
            None => Ok(CodecConfig::load()),
        }
    }
}

/// Timing of the diagnostic test command protocol
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct DiagnosticConfig {
    /// Wait between reads of the result report
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up on a test command after this long. Unset waits forever.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    /// Number of busy replies tolerated while verifying individual data
    #[serde(default = "default_verify_retry_limit")]
    pub verify_retry_limit: u32,
    #[serde(default = "default_verify_interval_ms")]
    pub verify_interval_ms: u64,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            deadline_ms: None,
            verify_retry_limit: default_verify_retry_limit(),
            verify_interval_ms: default_verify_interval_ms(),
        }
    }
}

impl DiagnosticConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn verify_interval(&self) -> Duration {
        Duration::from_millis(self.verify_interval_ms)
    }
}

fn default_feature_report_size() -> usize {
    63
}

fn default_disconnect_after_failures() -> u32 {
    3
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_verify_retry_limit() -> u32 {
    20
}

fn default_verify_interval_ms() -> u64 {
    50
}
