use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("circular dependency between steps: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    #[error("step '{0}' is not part of the dependency graph")]
    UnknownStep(String),

    #[error("step id '{0}' is declared more than once")]
    DuplicateStep(String),

    #[error("source '{0}' is defined more than once")]
    DuplicateSource(String),

    #[error("invalid source definition: {0}")]
    InvalidSource(String),
}
