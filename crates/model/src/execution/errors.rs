use thiserror::Error;

/// A step or source definition that can never execute as written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("load step '{step}' uses MERGE but declares no merge keys")]
    MissingMergeKeys { step: String },

    #[error("load step '{step}' declares merge keys but mode is {mode}")]
    UnexpectedMergeKeys { step: String, mode: String },

    #[error("incremental source '{source_name}' has no cursor field")]
    MissingCursorField { source_name: String },

    #[error("step '{step}' has an empty {field}")]
    EmptyField { step: String, field: &'static str },
}
