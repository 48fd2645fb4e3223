use thiserror::Error;

/// Errors raised while building configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Forcing both engines at once has no meaningful routing.
    #[error("both force-legacy and force-next engine flags are set")]
    ConflictingEngineFlags,

    #[error("rollout percentage must be within 0..=100, got {0}")]
    InvalidRolloutPercentage(i64),

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("could not determine a home directory for the default state directory")]
    NoHomeDir,
}
