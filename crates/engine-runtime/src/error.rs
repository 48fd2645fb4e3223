use engine_config::error::ConfigError;
use engine_processing::error::StepError;
use model::execution::result::EngineKind;
use thiserror::Error;

/// Failure raised by an engine instead of a result value.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{engine} engine fault: {source}")]
    Step {
        engine: EngineKind,
        #[source]
        source: StepError,
    },

    #[error("{engine} engine internal error: {message}")]
    Internal { engine: EngineKind, message: String },

    #[error("{0} engine does not support resume")]
    ResumeUnsupported(EngineKind),

    #[error("no execution state recorded for '{0}'")]
    UnknownExecution(String),

    #[error("run '{0}' is still in progress")]
    RunInProgress(String),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The next engine failed and the legacy fallback failed as well.
    #[error("both engines failed; next: {next}; legacy: {legacy}")]
    BothEnginesFailed { next: String, legacy: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors raised while assembling the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}
