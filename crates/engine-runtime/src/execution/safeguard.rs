use model::execution::pipeline::PipelineStep;
use planner::{error::PlanError, graph::DependencyResolver};
use std::{
    collections::HashSet,
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCheck {
    Consistent,
    Mismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    /// The dependency graph could not be ordered at all.
    Skipped { reason: String },
}

/// Compares submitted step order with dependency order. Advisory only: it
/// logs a single warning on mismatch and never stops a run.
#[derive(Debug, Default)]
pub struct ExecutionOrderSafeguard {
    warnings: AtomicU64,
}

impl ExecutionOrderSafeguard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings_emitted(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn check(&self, steps: &[PipelineStep]) -> OrderCheck {
        let actual: Vec<String> = steps.iter().map(|s| s.id.clone()).collect();
        let resolver = DependencyResolver::from_steps(steps);

        let expected = match resolver.execution_order(actual.as_slice()) {
            Ok(order) => order,
            Err(err) => {
                let reason = match err {
                    PlanError::CircularDependency { chain } => {
                        format!("circular dependency: {}", chain.join(" -> "))
                    }
                    other => other.to_string(),
                };
                warn!(%reason, "Skipping execution order check");
                self.warnings.fetch_add(1, Ordering::Relaxed);
                return OrderCheck::Skipped { reason };
            }
        };

        // Compare only ids both sequences share.
        let submitted: HashSet<&str> = actual.iter().map(String::as_str).collect();
        let expected: Vec<String> = expected
            .into_iter()
            .filter(|id| submitted.contains(id.as_str()))
            .collect();
        let in_expected: HashSet<&str> = expected.iter().map(String::as_str).collect();
        let actual: Vec<String> = actual
            .into_iter()
            .filter(|id| in_expected.contains(id.as_str()))
            .collect();

        if expected == actual {
            return OrderCheck::Consistent;
        }

        warn!(
            expected = ?expected,
            actual = ?actual,
            "Steps submitted out of dependency order"
        );
        self.warnings.fetch_add(1, Ordering::Relaxed);
        OrderCheck::Mismatch { expected, actual }
    }
}
