use crate::{
    engine::{Engine, ExecutionState, RunOptions},
    error::{BridgeError, EngineError},
    execution::safeguard::ExecutionOrderSafeguard,
};
use chrono::Utc;
use engine_config::{
    flags::{Feature, FeatureFlagManager},
    rollout::{RolloutDecision, decide, derive_execution_id, time_bucket},
};
use engine_core::metrics::{ExecutionMetrics, MetricsSnapshot};
use model::execution::{
    plan::{ExecutionPlan, Variables},
    result::{EngineKind, ExecutionResult, ExecutionStatus, RunReport},
};
use std::{sync::Arc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Routes each run to the legacy or next engine and falls back to legacy
/// when next fails.
#[derive(Clone)]
pub struct DualEngineBridge {
    legacy: Arc<dyn Engine>,
    next: Arc<dyn Engine>,
    flags: Arc<FeatureFlagManager>,
    metrics: ExecutionMetrics,
    safeguard: Arc<ExecutionOrderSafeguard>,
}

impl DualEngineBridge {
    pub fn new(
        legacy: Arc<dyn Engine>,
        next: Arc<dyn Engine>,
        flags: Arc<FeatureFlagManager>,
        metrics: ExecutionMetrics,
    ) -> Self {
        DualEngineBridge {
            legacy,
            next,
            flags,
            metrics,
            safeguard: Arc::new(ExecutionOrderSafeguard::new()),
        }
    }

    pub fn flags(&self) -> &Arc<FeatureFlagManager> {
        &self.flags
    }

    pub fn safeguard(&self) -> &ExecutionOrderSafeguard {
        &self.safeguard
    }

    pub fn execution_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Routing for `plan` under the current flags, without executing it.
    pub fn route(&self, plan: &ExecutionPlan) -> (String, RolloutDecision) {
        let execution_id = derive_execution_id(&plan.step_ids(), time_bucket(Utc::now()));
        let decision = decide(&execution_id, &self.flags.snapshot());
        (execution_id, decision)
    }

    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
    ) -> Result<RunReport, BridgeError> {
        self.execute_with(plan, variables, CancellationToken::new())
            .await
    }

    pub async fn execute_with(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
        cancel: CancellationToken,
    ) -> Result<RunReport, BridgeError> {
        // One snapshot for the whole run.
        let flags = self.flags.snapshot();
        if flags.is_enabled(Feature::OrderSafeguard) {
            self.safeguard.check(&plan.steps);
        }

        let execution_id = derive_execution_id(&plan.step_ids(), time_bucket(Utc::now()));
        let decision = decide(&execution_id, &flags);
        info!(
            execution_id = %execution_id,
            engine = %decision.engine,
            reason = ?decision.reason,
            bucket = ?decision.bucket,
            "Routing execution"
        );

        self.metrics.record_execution();
        let opts = RunOptions::new(execution_id.clone()).with_cancel(cancel);
        let started = Instant::now();

        let outcome = match decision.engine {
            EngineKind::Legacy => self
                .legacy
                .execute(plan, variables, &opts)
                .await
                .map(|result| Finished {
                    result,
                    engine: EngineKind::Legacy,
                    run_id: opts.run_id.clone(),
                    fallback_used: false,
                })
                .map_err(BridgeError::from),
            EngineKind::Next => {
                self.run_next(plan, variables, &opts, flags.is_enabled(Feature::Fallback))
                    .await
            }
        };

        let finished = match outcome {
            Ok(done) => done,
            Err(e) => {
                self.metrics.record_failed_execution();
                return Err(e);
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        self.metrics.record_completion(
            finished.engine,
            duration_ms,
            finished.result.is_success(),
        );
        info!(
            execution_id = %execution_id,
            run_id = %finished.run_id,
            engine = %finished.engine,
            status = %finished.result.status(),
            duration_ms,
            fallback_used = finished.fallback_used,
            "Execution finished"
        );

        Ok(RunReport::new(
            finished.result,
            finished.engine,
            execution_id,
            duration_ms,
            finished.fallback_used,
        )
        .with_run_id(finished.run_id))
    }

    async fn run_next(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
        opts: &RunOptions,
        fallback: bool,
    ) -> Result<Finished, BridgeError> {
        self.metrics.record_next_attempt();
        let next_err = match self.next.execute(plan, variables, opts).await {
            Ok(result) => {
                return Ok(Finished {
                    result,
                    engine: EngineKind::Next,
                    run_id: opts.run_id.clone(),
                    fallback_used: false,
                });
            }
            Err(e) => e,
        };
        self.metrics.record_next_failure();

        if !fallback {
            return Err(next_err.into());
        }

        error!(
            execution_id = %opts.execution_id,
            run_id = %opts.run_id,
            error = %next_err,
            "Next engine failed"
        );
        warn!(
            execution_id = %opts.execution_id,
            "Falling back to legacy engine"
        );
        self.metrics.record_fallback();

        // The failed next run stays resumable under its own run id.
        let legacy_opts = opts.fresh_run();
        match self.legacy.execute(plan, variables, &legacy_opts).await {
            Ok(result) if result.status() != ExecutionStatus::Error => Ok(Finished {
                result,
                engine: EngineKind::Legacy,
                run_id: legacy_opts.run_id,
                fallback_used: true,
            }),
            Ok(result) => Err(BridgeError::BothEnginesFailed {
                next: next_err.to_string(),
                legacy: result.error().unwrap_or("unknown error").to_string(),
            }),
            Err(legacy_err) => Err(BridgeError::BothEnginesFailed {
                next: next_err.to_string(),
                legacy: legacy_err.to_string(),
            }),
        }
    }

    /// Continues an interrupted next-engine run, by run id or by the latest
    /// run of an execution id.
    pub async fn resume(
        &self,
        handle: &str,
        plan: &ExecutionPlan,
        variables: &Variables,
    ) -> Result<ExecutionResult, EngineError> {
        let opts = match self.next.execution_state(handle) {
            Some(state) => RunOptions::continuing(&state, CancellationToken::new()),
            None => return Err(EngineError::UnknownExecution(handle.to_string())),
        };
        self.next.resume(plan, variables, &opts).await
    }

    /// State of a run, by run id or by execution id. When both engines ran
    /// the same execution, the later run is the one that produced the result.
    pub fn execution_state(&self, handle: &str) -> Option<ExecutionState> {
        match (
            self.next.execution_state(handle),
            self.legacy.execution_state(handle),
        ) {
            (Some(next), Some(legacy)) => Some(if legacy.seq > next.seq { legacy } else { next }),
            (next, legacy) => next.or(legacy),
        }
    }
}

struct Finished {
    result: ExecutionResult,
    engine: EngineKind,
    run_id: String,
    fallback_used: bool,
}
