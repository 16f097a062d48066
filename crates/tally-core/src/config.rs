// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Target configuration.
//!
//! Every setting is optional and off by default: a target started without any
//! configuration prints its greeting and spins, nothing more. Configuration is
//! read from a JSON file named by `TALLY_CONFIG`, then overridden by
//! `TALLY_SAMPLE_INTERVAL_MS`.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming a JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "TALLY_CONFIG";

/// Environment variable that enables the sampler with the given interval.
pub const SAMPLE_INTERVAL_ENV: &str = "TALLY_SAMPLE_INTERVAL_MS";

/// Default interval between two samples.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;

/// Smallest interval the sampler accepts.
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 1;

/// Complete target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Default `env_logger` filter, used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Background sampling settings.
    pub sampler: SamplerConfig,
}

/// Configuration of the background sampling thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Whether a sampling thread is started at all.
    pub enabled: bool,
    /// Time between two samples, in milliseconds.
    pub interval_ms: u64,
    /// Whether to also poll host CPU load.
    pub monitor_cpu: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            sampler: SamplerConfig::default(),
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            monitor_cpu: false,
        }
    }
}

impl SamplerConfig {
    /// Returns the sampling interval, clamped to at least one millisecond.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_SAMPLE_INTERVAL_MS))
    }
}

impl TargetConfig {
    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// Save configuration to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))
    }

    /// Builds the configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Kept separate from [`TargetConfig::from_env`] so tests never have to
    /// mutate the real process environment.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };

        if let Some(raw) = lookup(SAMPLE_INTERVAL_ENV) {
            let interval_ms = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: SAMPLE_INTERVAL_ENV.to_string(),
                    value: raw.clone(),
                })?;
            config.sampler.enabled = true;
            config.sampler.interval_ms = interval_ms;
        }

        Ok(config)
    }
}

/// A specialized `Result` type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// An error that can occur while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    Io(String),
    /// The configuration file is not valid JSON for [`TargetConfig`].
    Parse(String),
    /// An environment variable holds a value that cannot be used.
    InvalidValue {
        /// The variable name.
        key: String,
        /// The offending value.
        value: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {msg}"),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {key}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_leave_instrumentation_off() {
        let config = TargetConfig::default();
        assert_eq!(config.log_filter, "warn");
        assert!(!config.sampler.enabled);
        assert!(!config.sampler.monitor_cpu);
        assert_eq!(config.sampler.interval_ms, DEFAULT_SAMPLE_INTERVAL_MS);
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = TargetConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, TargetConfig::default());
    }

    #[test]
    fn interval_variable_enables_sampler() {
        let config =
            TargetConfig::from_lookup(lookup_from(&[(SAMPLE_INTERVAL_ENV, " 25 ")])).unwrap();
        assert!(config.sampler.enabled);
        assert_eq!(config.sampler.interval(), Duration::from_millis(25));
    }

    #[test]
    fn invalid_interval_is_rejected() {
        let err =
            TargetConfig::from_lookup(lookup_from(&[(SAMPLE_INTERVAL_ENV, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: SAMPLE_INTERVAL_ENV.to_string(),
                value: "soon".to_string(),
            }
        );
    }

    #[test]
    fn zero_interval_is_clamped() {
        let sampler = SamplerConfig {
            interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(sampler.interval(), Duration::from_millis(MIN_SAMPLE_INTERVAL_MS));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = TargetConfig::from_json(r#"{ "sampler": { "enabled": true } }"#).unwrap();
        assert!(config.sampler.enabled);
        assert_eq!(config.sampler.interval_ms, DEFAULT_SAMPLE_INTERVAL_MS);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = TargetConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn file_round_trip_and_env_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tally.json");

        let written = TargetConfig {
            log_filter: "debug".to_string(),
            sampler: SamplerConfig {
                enabled: false,
                interval_ms: 500,
                monitor_cpu: true,
            },
        };
        written.to_file(&path).unwrap();
        assert_eq!(TargetConfig::from_file(&path).unwrap(), written);

        let path_str = path.to_string_lossy().to_string();
        let config = TargetConfig::from_lookup(lookup_from(&[
            (CONFIG_PATH_ENV, path_str.as_str()),
            (SAMPLE_INTERVAL_ENV, "10"),
        ]))
        .unwrap();
        assert_eq!(config.log_filter, "debug");
        assert!(config.sampler.monitor_cpu);
        assert!(config.sampler.enabled);
        assert_eq!(config.sampler.interval_ms, 10);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = TargetConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
