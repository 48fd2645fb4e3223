use crate::execution::pipeline::{PipelineStep, StepType};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Legacy,
    Next,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Legacy => "legacy",
            EngineKind::Next => "next",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Error,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Success => f.write_str("success"),
            ExecutionStatus::Failed => f.write_str("failed"),
            ExecutionStatus::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_id: String,
    pub step_type: StepType,
    pub status: StepStatus,
    pub rows_affected: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl StepOutcome {
    pub fn succeeded(step: &PipelineStep, rows_affected: u64) -> Self {
        StepOutcome {
            step_id: step.id.clone(),
            step_type: step.step_type(),
            status: StepStatus::Success,
            rows_affected,
            message: None,
            error_kind: None,
        }
    }

    pub fn failed(step: &PipelineStep, error_kind: &str, message: impl Into<String>) -> Self {
        StepOutcome {
            step_id: step.id.clone(),
            step_type: step.step_type(),
            status: StepStatus::Failed,
            rows_affected: 0,
            message: Some(message.into()),
            error_kind: Some(error_kind.to_string()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Outcome of one run on one engine. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    status: ExecutionStatus,
    executed_steps: usize,
    total_steps: usize,
    step_results: Vec<StepOutcome>,
    rows_affected: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ExecutionResult {
    pub fn success(total_steps: usize, step_results: Vec<StepOutcome>) -> Self {
        Self::build(ExecutionStatus::Success, total_steps, step_results, None)
    }

    pub fn failed(total_steps: usize, step_results: Vec<StepOutcome>, error: String) -> Self {
        Self::build(ExecutionStatus::Failed, total_steps, step_results, Some(error))
    }

    pub fn errored(total_steps: usize, step_results: Vec<StepOutcome>, error: String) -> Self {
        Self::build(ExecutionStatus::Error, total_steps, step_results, Some(error))
    }

    fn build(
        status: ExecutionStatus,
        total_steps: usize,
        step_results: Vec<StepOutcome>,
        error: Option<String>,
    ) -> Self {
        let executed_steps = step_results.iter().filter(|o| o.is_success()).count();
        let rows_affected = step_results.iter().map(|o| o.rows_affected).sum();
        ExecutionResult {
            status,
            executed_steps,
            total_steps,
            step_results,
            rows_affected,
            error,
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    pub fn executed_steps(&self) -> usize {
        self.executed_steps
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn step_results(&self) -> &[StepOutcome] {
        &self.step_results
    }

    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Engine-agnostic envelope returned to callers: the engine's result plus
/// which engine produced it and how long the run took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(flatten)]
    result: ExecutionResult,
    engine: EngineKind,
    execution_id: String,
    /// Run of the engine that produced `result`.
    #[serde(default)]
    run_id: String,
    duration_ms: u64,
    fallback_used: bool,
}

impl RunReport {
    pub fn new(
        result: ExecutionResult,
        engine: EngineKind,
        execution_id: impl Into<String>,
        duration_ms: u64,
        fallback_used: bool,
    ) -> Self {
        RunReport {
            result,
            engine,
            execution_id: execution_id.into(),
            run_id: String::new(),
            duration_ms,
            fallback_used,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn result(&self) -> &ExecutionResult {
        &self.result
    }

    pub fn status(&self) -> ExecutionStatus {
        self.result.status()
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn fallback_used(&self) -> bool {
        self.fallback_used
    }
}
