use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use stellar_engine::zones::ZoneId;
use thiserror::Error;

const DEFAULT_MAX_DURATION_MS: u64 = 120_000;

#[derive(Debug, Error)]
pub(crate) enum TourError {
    #[error("failed to read tour {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse tour {label}: {message}")]
    Parse { label: String, message: String },
}

/// One scripted pilot action. Written in JSON as `{"travel": "mars"}`, or a
/// bare string for steps without an argument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TourStep {
    Travel(ZoneId),
    /// Fly to the gate for a connected zone in the current zone and confirm.
    FlyToGate(ZoneId),
    AwaitArrival,
    WaitMs(u64),
    Console(String),
    Unlock(ZoneId),
    Discover(ZoneId),
    Unload(ZoneId),
    ToggleOverlay,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TourScript {
    pub(crate) name: String,
    #[serde(default = "default_max_duration_ms")]
    pub(crate) max_duration_ms: u64,
    pub(crate) steps: Vec<TourStep>,
}

fn default_max_duration_ms() -> u64 {
    DEFAULT_MAX_DURATION_MS
}

impl TourScript {
    pub(crate) fn parse(raw: &str, label: &str) -> Result<Self, TourError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, TourScript>(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            let source = error.into_inner();
            let message = if path.is_empty() || path == "." {
                source.to_string()
            } else {
                format!("at {path}: {source}")
            };
            TourError::Parse {
                label: label.to_string(),
                message,
            }
        })
    }

    pub(crate) fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms.max(1))
    }

    pub(crate) fn into_queue(self) -> VecDeque<TourStep> {
        self.steps.into()
    }
}

pub(crate) fn load_tour(path: &Path) -> Result<TourScript, TourError> {
    let raw = fs::read_to_string(path).map_err(|source| TourError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    TourScript::parse(&raw, &path.display().to_string())
}
