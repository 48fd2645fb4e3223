use crate::engine::{
    RunOptions,
    state::{ExecutionStates, RunPhase},
};
use engine_core::sources::SourceRegistry;
use engine_processing::{error::StepError, scope::RunScope, step::StepExecutor};
use model::execution::{
    pipeline::PipelineStep,
    plan::{ExecutionPlan, Variables},
    result::StepOutcome,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// How a sequential run ended.
pub enum SequenceEnd {
    Completed,
    /// A domain failure; the message names the step and cause.
    Failed(String),
    Cancelled(String),
    /// An infrastructure fault the engine decides how to surface.
    Fault(StepError),
}

pub struct SequenceOutcome {
    pub total_steps: usize,
    pub outcomes: Vec<StepOutcome>,
    pub end: SequenceEnd,
}

/// Shared step loop of both engines. Steps run strictly one after another in
/// submission order; the first failure stops the run.
pub struct StepSequence<'a> {
    pub executor: &'a StepExecutor,
    pub registry: Option<&'a Arc<dyn SourceRegistry>>,
    pub states: &'a ExecutionStates,
}

impl StepSequence<'_> {
    pub async fn run(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
        opts: &RunOptions,
        carried: Vec<StepOutcome>,
    ) -> SequenceOutcome {
        let execution_id = opts.execution_id.as_str();
        let run_id = opts.run_id.as_str();
        let total_steps = plan.len();
        // Only successful outcomes carry over; a failed step is re-run.
        let mut outcomes: Vec<StepOutcome> =
            carried.into_iter().filter(|o| o.is_success()).collect();
        self.states.begin(opts, total_steps, outcomes.clone());

        let mut scope = match RunScope::new(plan, variables.clone()) {
            Ok(scope) => scope,
            Err(e) => {
                warn!(execution_id, error = %e, "Plan rejected");
                self.states.finish(run_id, RunPhase::Failed);
                return SequenceOutcome {
                    total_steps,
                    outcomes,
                    end: SequenceEnd::Failed(e.to_string()),
                };
            }
        };
        if let Some(registry) = self.registry {
            scope = scope.with_registry(registry.clone());
        }

        let done: Vec<String> = outcomes.iter().map(|o| o.step_id.clone()).collect();
        let pending: Vec<&PipelineStep> =
            plan.steps.iter().filter(|s| !done.contains(&s.id)).collect();

        for (idx, step) in pending.iter().enumerate() {
            if opts.cancel.is_cancelled() {
                warn!(
                    execution_id,
                    step_id = %step.id,
                    "Cancellation requested, not starting remaining {} step(s)",
                    pending.len() - idx
                );
                self.states.finish(run_id, RunPhase::Cancelled);
                return SequenceOutcome {
                    total_steps,
                    outcomes,
                    end: SequenceEnd::Cancelled(
                        StepError::Cancelled {
                            step_id: step.id.clone(),
                        }
                        .to_string(),
                    ),
                };
            }

            match self.executor.execute(&scope, step).await {
                Ok(outcome) => {
                    self.states.record(run_id, outcome.clone());
                    outcomes.push(outcome);
                }
                Err(e) if e.kind().is_domain() => {
                    warn!(execution_id, step_id = %step.id, kind = %e.kind(), error = %e, "Step failed");
                    let outcome = StepOutcome::failed(step, e.kind().as_str(), e.to_string());
                    self.states.record(run_id, outcome.clone());
                    self.states.finish(run_id, RunPhase::Failed);
                    outcomes.push(outcome);
                    return SequenceOutcome {
                        total_steps,
                        outcomes,
                        end: SequenceEnd::Failed(e.to_string()),
                    };
                }
                Err(e) => {
                    error!(execution_id, step_id = %step.id, error = %e, "Step aborted by engine fault");
                    let outcome = StepOutcome::failed(step, e.kind().as_str(), e.to_string());
                    self.states.record(run_id, outcome.clone());
                    self.states.finish(run_id, RunPhase::Failed);
                    outcomes.push(outcome);
                    return SequenceOutcome {
                        total_steps,
                        outcomes,
                        end: SequenceEnd::Fault(e),
                    };
                }
            }
        }

        self.states.finish(run_id, RunPhase::Completed);
        info!(execution_id, steps = outcomes.len(), "All steps completed");
        SequenceOutcome {
            total_steps,
            outcomes,
            end: SequenceEnd::Completed,
        }
    }
}
