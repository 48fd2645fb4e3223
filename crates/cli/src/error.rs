use engine_config::error::ConfigError;
use engine_core::error::StateStoreError;
use engine_runtime::error::RuntimeError;
use planner::error::PlanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read input file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to deserialize JSON input: {0}")]
    JsonDeserialize(#[from] serde_json::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid plan: {0}")]
    Plan(#[from] PlanError),

    #[error("Watermark store error: {0}")]
    State(#[from] StateStoreError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Invalid env file: {0}")]
    EnvFile(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
