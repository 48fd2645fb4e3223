use crate::{error::ConfigError, flags::ENV_PREFIX, settings::batch_size::BatchSize};
use engine_core::context::env::EnvContext;
use std::{path::PathBuf, time::Duration};

pub mod batch_size;

pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MONITOR_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Engine-wide settings resolved once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub batch_size: BatchSize,
    pub state_dir: PathBuf,
    pub monitor_interval: Duration,
    pub monitor_join_timeout: Duration,
}

impl EngineSettings {
    pub fn from_env(env: &EnvContext) -> Result<Self, ConfigError> {
        let batch_size = match env.get(&key("BATCH_SIZE")) {
            Some(raw) => BatchSize::parse(&key("BATCH_SIZE"), &raw)?,
            None => BatchSize::default(),
        };

        let state_dir = match env.get(&key("STATE_DIR")) {
            Some(dir) => PathBuf::from(dir),
            None => default_state_dir()?,
        };

        Ok(EngineSettings {
            batch_size,
            state_dir,
            monitor_interval: millis(env, "MONITOR_INTERVAL_MS", DEFAULT_MONITOR_INTERVAL)?,
            monitor_join_timeout: millis(
                env,
                "MONITOR_JOIN_TIMEOUT_MS",
                DEFAULT_MONITOR_JOIN_TIMEOUT,
            )?,
        })
    }

    /// Settings for tests and embedded use; nothing is read from the environment.
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        EngineSettings {
            batch_size: BatchSize::default(),
            state_dir: state_dir.into(),
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            monitor_join_timeout: DEFAULT_MONITOR_JOIN_TIMEOUT,
        }
    }
}

pub fn default_state_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".sluice").join("state"))
        .ok_or(ConfigError::NoHomeDir)
}

fn key(name: &str) -> String {
    format!("{ENV_PREFIX}{name}")
}

fn millis(env: &EnvContext, name: &str, default: Duration) -> Result<Duration, ConfigError> {
    let key = key(name);
    match env.get(&key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .ok_or(ConfigError::InvalidValue {
                key,
                value: raw,
                reason: "expected a positive number of milliseconds".into(),
            }),
    }
}
