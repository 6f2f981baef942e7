//! Configuration
//!
//! Two sources feed the orchestrator:
//! - [`OrchestratorConfig`]: process-level tuning read from the environment.
//! - [`LaunchMetadata`]: the embedding page's launch metadata (JSON).

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Default per-layer readiness wait.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between the finish step and the result callbacks.
pub const DEFAULT_PRESENTATION_DELAY: Duration = Duration::from_millis(2000);

/// Default ceiling for a single frame's delta.
pub const DEFAULT_MAX_FRAME_DELTA: Duration = Duration::from_secs(1);

/// Default environment variable carrying the score encryption key.
pub const DEFAULT_PUBLIC_KEY_VAR: &str = "GAME_PUBLIC_KEY";

/// Environment variable carrying the launch metadata JSON.
pub const LAUNCH_METADATA_VAR: &str = "ARCADE_LAUNCH_METADATA";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Raw value found.
        value: String,
    },
    /// Launch metadata could not be parsed.
    #[error("invalid launch metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Orchestrator tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Bounded wait for each layer's readiness signal.
    pub ready_timeout: Duration,
    /// Delay before result callbacks fire.
    pub presentation_delay: Duration,
    /// Per-frame delta ceiling used for score accounting.
    pub max_frame_delta: Duration,
    /// Environment variable that provisions the public key.
    pub public_key_var: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ready_timeout: DEFAULT_READY_TIMEOUT,
            presentation_delay: DEFAULT_PRESENTATION_DELAY,
            max_frame_delta: DEFAULT_MAX_FRAME_DELTA,
            public_key_var: DEFAULT_PUBLIC_KEY_VAR.to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            ready_timeout: env_millis("ARCADE_READY_TIMEOUT_MS", defaults.ready_timeout)?,
            presentation_delay: env_millis(
                "ARCADE_PRESENTATION_DELAY_MS",
                defaults.presentation_delay,
            )?,
            max_frame_delta: env_millis("ARCADE_MAX_FRAME_DELTA_MS", defaults.max_frame_delta)?,
            public_key_var: std::env::var("ARCADE_PUBLIC_KEY_VAR")
                .unwrap_or(defaults.public_key_var),
        })
    }
}

fn env_millis(var: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(default),
    }
}

/// Launch metadata supplied by the embedding page.
///
/// Host callbacks are not part of the JSON; they are attached to the
/// orchestrator directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchMetadata {
    /// Best score known to the host. Numbers and numeric strings accepted.
    #[serde(default, deserialize_with = "deserialize_score")]
    pub high_score: u64,
    /// Sponsor identifier.
    #[serde(default)]
    pub sponsor: String,
    /// Game identifier echoed in the score payload.
    #[serde(default)]
    pub game_id: Option<String>,
    /// Season identifier echoed in the score payload.
    #[serde(default)]
    pub season_id: Option<String>,
    /// Layout hint (container width as styled by the page).
    #[serde(default)]
    pub parent_size: Option<String>,
    /// Name tag reported in the game-start event.
    #[serde(default = "default_game_name")]
    pub game_name: String,
}

fn default_game_name() -> String {
    "game_name".to_string()
}

impl Default for LaunchMetadata {
    fn default() -> Self {
        Self {
            high_score: 0,
            sponsor: String::new(),
            game_id: None,
            season_id: None,
            parent_size: None,
            game_name: default_game_name(),
        }
    }
}

impl LaunchMetadata {
    /// Parse metadata JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read metadata JSON from [`LAUNCH_METADATA_VAR`], or defaults if unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(LAUNCH_METADATA_VAR) {
            Ok(json) => Self::from_json(&json),
            Err(_) => Ok(Self::default()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreValue {
    Number(u64),
    Text(String),
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match ScoreValue::deserialize(deserializer)? {
        ScoreValue::Number(n) => Ok(n),
        ScoreValue::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
