use engine_core::error::{ConnectorError, StateStoreError, WarehouseError};
use model::execution::errors::DefinitionError;
use planner::error::PlanError;
use std::fmt;
use thiserror::Error;

/// Classification of a step failure.
///
/// Configuration, schema and connector failures are expected outcomes of a
/// run and are reported as a failed result. `Engine` failures are faults in
/// the orchestrator's own infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    SchemaIncompatibility,
    Connector,
    Engine,
}

impl ErrorKind {
    pub fn is_domain(&self) -> bool {
        !matches!(self, ErrorKind::Engine)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::SchemaIncompatibility => "schema_incompatibility",
            ErrorKind::Connector => "connector",
            ErrorKind::Engine => "engine",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("source '{0}' is not defined")]
    SourceNotDefined(String),

    #[error("load step '{step}' uses MERGE but declares no merge keys")]
    MissingMergeKeys { step: String },

    #[error("invalid definition: {0}")]
    InvalidDefinition(#[from] DefinitionError),

    #[error("target table '{0}' does not exist")]
    TargetMissing(String),

    #[error("columns not present in target '{table}': {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("incompatible column types for target '{table}': {}", columns.join(", "))]
    TypeMismatch { table: String, columns: Vec<String> },

    #[error("merge keys missing or incompatible for target '{table}': {}", columns.join(", "))]
    MergeKeyMismatch { table: String, columns: Vec<String> },

    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("watermark store error: {0}")]
    Watermark(#[from] StateStoreError),
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::SourceNotDefined(_)
            | LoadError::MissingMergeKeys { .. }
            | LoadError::InvalidDefinition(_)
            | LoadError::TargetMissing(_) => ErrorKind::Configuration,
            LoadError::MissingColumns { .. }
            | LoadError::TypeMismatch { .. }
            | LoadError::MergeKeyMismatch { .. } => ErrorKind::SchemaIncompatibility,
            LoadError::Connector(e) => connector_kind(e),
            LoadError::Warehouse(e) => warehouse_kind(e),
            LoadError::Watermark(_) => ErrorKind::Engine,
        }
    }

    /// Offending column names for schema failures.
    pub fn columns(&self) -> &[String] {
        match self {
            LoadError::MissingColumns { columns, .. }
            | LoadError::TypeMismatch { columns, .. }
            | LoadError::MergeKeyMismatch { columns, .. } => columns.as_slice(),
            _ => &[],
        }
    }
}

#[derive(Error, Debug)]
pub enum StepError {
    #[error("step '{step_id}' failed: {source}")]
    Load {
        step_id: String,
        #[source]
        source: LoadError,
    },

    #[error("step '{step_id}' is invalid: {source}")]
    Definition {
        step_id: String,
        #[source]
        source: DefinitionError,
    },

    #[error("step '{step_id}' references undefined variable '{name}'")]
    UndefinedVariable { step_id: String, name: String },

    #[error("step '{step_id}' failed: {source}")]
    Warehouse {
        step_id: String,
        #[source]
        source: WarehouseError,
    },

    #[error("step '{step_id}' failed: {source}")]
    Connector {
        step_id: String,
        #[source]
        source: ConnectorError,
    },

    #[error("invalid plan: {0}")]
    Plan(#[from] PlanError),

    #[error("run cancelled before step '{step_id}'")]
    Cancelled { step_id: String },
}

impl StepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Load { source, .. } => source.kind(),
            StepError::Definition { .. }
            | StepError::UndefinedVariable { .. }
            | StepError::Plan(_)
            | StepError::Cancelled { .. } => ErrorKind::Configuration,
            StepError::Warehouse { source, .. } => warehouse_kind(source),
            StepError::Connector { source, .. } => connector_kind(source),
        }
    }

    pub fn step_id(&self) -> Option<&str> {
        match self {
            StepError::Load { step_id, .. }
            | StepError::Definition { step_id, .. }
            | StepError::UndefinedVariable { step_id, .. }
            | StepError::Warehouse { step_id, .. }
            | StepError::Connector { step_id, .. }
            | StepError::Cancelled { step_id } => Some(step_id),
            StepError::Plan(_) => None,
        }
    }
}

fn connector_kind(e: &ConnectorError) -> ErrorKind {
    match e {
        ConnectorError::UnknownConnector(_) => ErrorKind::Configuration,
        _ => ErrorKind::Connector,
    }
}

fn warehouse_kind(e: &WarehouseError) -> ErrorKind {
    match e {
        WarehouseError::TableNotFound(_) | WarehouseError::Sql(_) => ErrorKind::Configuration,
        WarehouseError::Internal(_) => ErrorKind::Engine,
    }
}
