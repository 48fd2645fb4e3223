use crate::{
    engine::{
        Engine, ExecutionState, RunOptions,
        sequence::{SequenceEnd, StepSequence},
        state::{ExecutionStates, RunPhase},
    },
    error::EngineError,
};
use async_trait::async_trait;
use engine_core::sources::SourceRegistry;
use engine_processing::step::StepExecutor;
use model::execution::{
    plan::{ExecutionPlan, Variables},
    result::{EngineKind, ExecutionResult, StepOutcome},
};
use std::sync::Arc;
use tracing::info;

/// The engine under rollout. Same step semantics as the legacy engine, but
/// infrastructure faults are raised so the bridge can fall back, and
/// interrupted executions can be resumed.
pub struct NextEngine {
    steps: StepExecutor,
    registry: Option<Arc<dyn SourceRegistry>>,
    states: ExecutionStates,
}

impl NextEngine {
    pub fn new(steps: StepExecutor, registry: Option<Arc<dyn SourceRegistry>>) -> Self {
        NextEngine {
            steps,
            registry,
            states: ExecutionStates::default(),
        }
    }

    async fn run(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
        opts: &RunOptions,
        carried: Vec<StepOutcome>,
    ) -> Result<ExecutionResult, EngineError> {
        let sequence = StepSequence {
            executor: &self.steps,
            registry: self.registry.as_ref(),
            states: &self.states,
        };
        let run = sequence
            .run(plan, variables, opts, carried)
            .await;

        match run.end {
            SequenceEnd::Completed => Ok(ExecutionResult::success(run.total_steps, run.outcomes)),
            SequenceEnd::Failed(msg) | SequenceEnd::Cancelled(msg) => {
                Ok(ExecutionResult::failed(run.total_steps, run.outcomes, msg))
            }
            SequenceEnd::Fault(source) => Err(EngineError::Step {
                engine: EngineKind::Next,
                source,
            }),
        }
    }
}

#[async_trait]
impl Engine for NextEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Next
    }

    async fn execute(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
        opts: &RunOptions,
    ) -> Result<ExecutionResult, EngineError> {
        info!(execution_id = %opts.execution_id, steps = plan.len(), "Next engine executing plan");
        self.run(plan, variables, opts, Vec::new()).await
    }

    async fn resume(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
        opts: &RunOptions,
    ) -> Result<ExecutionResult, EngineError> {
        let state = self
            .states
            .get(&opts.run_id)
            .or_else(|| self.states.get(&opts.execution_id))
            .ok_or_else(|| EngineError::UnknownExecution(opts.execution_id.clone()))?;

        match state.phase {
            RunPhase::Completed => {
                return Ok(ExecutionResult::success(state.total_steps, state.outcomes));
            }
            RunPhase::Running => return Err(EngineError::RunInProgress(state.run_id)),
            RunPhase::Failed | RunPhase::Cancelled => {}
        }

        info!(
            execution_id = %state.execution_id,
            run_id = %state.run_id,
            completed = state.completed_step_ids().count(),
            "Resuming execution"
        );
        let opts = RunOptions::continuing(&state, opts.cancel.clone());
        self.run(plan, variables, &opts, state.outcomes).await
    }

    fn execution_state(&self, handle: &str) -> Option<ExecutionState> {
        self.states.get(handle)
    }
}
