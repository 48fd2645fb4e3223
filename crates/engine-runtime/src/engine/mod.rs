use crate::error::EngineError;
use async_trait::async_trait;
use model::execution::{
    plan::{ExecutionPlan, Variables},
    result::{EngineKind, ExecutionResult},
};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

pub mod legacy;
pub mod next;
pub mod sequence;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use state::{ExecutionState, RunPhase};

static RUN_SEQ: AtomicU64 = AtomicU64::new(1);

/// Per-run handle. Runs of the same plan within the same hour share an
/// `execution_id`; `run_id` is unique for every run in this process.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub execution_id: String,
    pub run_id: String,
    pub seq: u64,
    pub cancel: CancellationToken,
}

impl RunOptions {
    pub fn new(execution_id: impl Into<String>) -> Self {
        let execution_id = execution_id.into();
        let seq = RUN_SEQ.fetch_add(1, Ordering::Relaxed);
        RunOptions {
            run_id: format!("{execution_id}-{seq}"),
            execution_id,
            seq,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A new run of the same execution, sharing its cancellation token.
    pub fn fresh_run(&self) -> Self {
        RunOptions::new(self.execution_id.clone()).with_cancel(self.cancel.clone())
    }

    /// Options that continue the run recorded in `state`.
    pub fn continuing(state: &ExecutionState, cancel: CancellationToken) -> Self {
        RunOptions {
            execution_id: state.execution_id.clone(),
            run_id: state.run_id.clone(),
            seq: state.seq,
            cancel,
        }
    }
}

/// One of the two interchangeable plan executors.
///
/// Domain failures (bad configuration, schema mismatches, connector errors)
/// are always returned as a failed [`ExecutionResult`], never as `Err`.
#[async_trait]
pub trait Engine: Send + Sync {
    fn kind(&self) -> EngineKind;

    async fn execute(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
        opts: &RunOptions,
    ) -> Result<ExecutionResult, EngineError>;

    /// Continues a previous run from its first unfinished step. The run is
    /// looked up by `opts.run_id`, then by the latest run of `opts.execution_id`.
    async fn resume(
        &self,
        _plan: &ExecutionPlan,
        _variables: &Variables,
        _opts: &RunOptions,
    ) -> Result<ExecutionResult, EngineError> {
        Err(EngineError::ResumeUnsupported(self.kind()))
    }

    /// State of a run, by run id or by the latest run of an execution id.
    fn execution_state(&self, handle: &str) -> Option<ExecutionState>;
}
