use crate::{
    engine::{
        Engine, ExecutionState, RunOptions,
        sequence::{SequenceEnd, StepSequence},
        state::ExecutionStates,
    },
    error::EngineError,
};
use async_trait::async_trait;
use engine_core::sources::SourceRegistry;
use engine_processing::step::StepExecutor;
use model::execution::{
    plan::{ExecutionPlan, Variables},
    result::{EngineKind, ExecutionResult},
};
use std::sync::Arc;
use tracing::info;

/// The established engine. Never raises for step failures: infrastructure
/// faults are reported as an `error` status.
pub struct LegacyEngine {
    steps: StepExecutor,
    registry: Option<Arc<dyn SourceRegistry>>,
    states: ExecutionStates,
}

impl LegacyEngine {
    pub fn new(steps: StepExecutor, registry: Option<Arc<dyn SourceRegistry>>) -> Self {
        LegacyEngine {
            steps,
            registry,
            states: ExecutionStates::default(),
        }
    }
}

#[async_trait]
impl Engine for LegacyEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Legacy
    }

    async fn execute(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
        opts: &RunOptions,
    ) -> Result<ExecutionResult, EngineError> {
        info!(execution_id = %opts.execution_id, steps = plan.len(), "Legacy engine executing plan");
        let sequence = StepSequence {
            executor: &self.steps,
            registry: self.registry.as_ref(),
            states: &self.states,
        };
        let run = sequence
            .run(plan, variables, opts, Vec::new())
            .await;

        Ok(match run.end {
            SequenceEnd::Completed => ExecutionResult::success(run.total_steps, run.outcomes),
            SequenceEnd::Failed(msg) | SequenceEnd::Cancelled(msg) => {
                ExecutionResult::failed(run.total_steps, run.outcomes, msg)
            }
            SequenceEnd::Fault(e) => {
                ExecutionResult::errored(run.total_steps, run.outcomes, e.to_string())
            }
        })
    }

    fn execution_state(&self, handle: &str) -> Option<ExecutionState> {
        self.states.get(handle)
    }
}
