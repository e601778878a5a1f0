use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::assets::CachePolicy;

pub const CONFIG_ENV_VAR: &str = "STELLAR_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamingConfig {
    pub max_loaded_zones: usize,
    pub max_unused_time_ms: u64,
    pub gc_interval_ms: u64,
    pub preload_distance: u32,
    pub preloads_per_tick: usize,
    pub transition_duration_ms: u64,
    pub gate_activation_radius: f32,
    pub gate_ring_radius: f32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_loaded_zones: 3,
            max_unused_time_ms: 30_000,
            gc_interval_ms: 10_000,
            preload_distance: 1,
            preloads_per_tick: 1,
            transition_duration_ms: 3_000,
            gate_activation_radius: 150.0,
            gate_ring_radius: 2_500.0,
        }
    }
}

impl StreamingConfig {
    /// Clamps values the streaming core cannot run with back to usable ones.
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            max_loaded_zones: self.max_loaded_zones.max(1),
            max_unused_time_ms: self.max_unused_time_ms,
            gc_interval_ms: non_zero_or(self.gc_interval_ms, defaults.gc_interval_ms),
            preload_distance: self.preload_distance,
            preloads_per_tick: self.preloads_per_tick.max(1),
            transition_duration_ms: non_zero_or(
                self.transition_duration_ms,
                defaults.transition_duration_ms,
            ),
            gate_activation_radius: positive_or(
                self.gate_activation_radius,
                defaults.gate_activation_radius,
            ),
            gate_ring_radius: positive_or(self.gate_ring_radius, defaults.gate_ring_radius),
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            max_unused_time: Duration::from_millis(self.max_unused_time_ms),
            gc_interval: Duration::from_millis(self.gc_interval_ms),
        }
    }

    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition_duration_ms)
    }
}

fn non_zero_or(value: u64, fallback: u64) -> u64 {
    if value == 0 {
        fallback
    } else {
        value
    }
}

fn positive_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
}

/// `STELLAR_CONFIG` wins over `<root>/config/streaming.json`.
pub fn resolve_config_path(root: &Path) -> Result<PathBuf, ConfigError> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(value) => Ok(PathBuf::from(value)),
        Err(env::VarError::NotPresent) => Ok(root.join("config").join("streaming.json")),
        Err(source) => Err(ConfigError::EnvVar {
            var: CONFIG_ENV_VAR,
            source,
        }),
    }
}

pub fn load_streaming_config(path: &Path) -> Result<StreamingConfig, ConfigError> {
    if !path.exists() {
        info!(path = %path.display(), "streaming_config_defaults");
        return Ok(StreamingConfig::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_streaming_config(&raw).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    let config = parsed.clone().normalized();
    if config != parsed {
        warn!(path = %path.display(), "streaming_config_normalized");
    }
    info!(
        path = %path.display(),
        max_loaded_zones = config.max_loaded_zones,
        max_unused_time_ms = config.max_unused_time_ms,
        gc_interval_ms = config.gc_interval_ms,
        preload_distance = config.preload_distance,
        "streaming_config_loaded"
    );
    Ok(config)
}

fn parse_streaming_config(raw: &str) -> Result<StreamingConfig, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, StreamingConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(source.to_string())
            } else {
                Err(format!("at {path}: {source}"))
            }
        }
    }
}
