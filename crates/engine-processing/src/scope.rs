use crate::error::StepError;
use engine_core::sources::SourceRegistry;
use model::execution::{
    pipeline::SourceDefinition,
    plan::{ExecutionPlan, Variables},
};
use planner::sources::register_sources;
use std::{collections::HashMap, sync::Arc};

/// Per-run view shared by every step of one execution.
///
/// Source steps of the plan are registered up front, so a load may name a
/// source declared later in the plan.
#[derive(Clone)]
pub struct RunScope {
    pipeline: String,
    sources: HashMap<String, SourceDefinition>,
    variables: Variables,
    registry: Option<Arc<dyn SourceRegistry>>,
}

impl RunScope {
    pub fn new(plan: &ExecutionPlan, variables: Variables) -> Result<Self, StepError> {
        Ok(RunScope {
            pipeline: plan.pipeline.clone(),
            sources: register_sources(plan)?,
            variables,
            registry: None,
        })
    }

    /// Sources the plan does not declare are looked up in `registry`.
    pub fn with_registry(mut self, registry: Arc<dyn SourceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn resolve_source(&self, name: &str) -> Option<SourceDefinition> {
        self.sources.get(name).cloned().or_else(|| {
            self.registry
                .as_ref()
                .and_then(|r| r.get_source_definition(name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::sources::InMemorySourceRegistry;
    use model::execution::pipeline::{PipelineStep, StepKind};

    #[test]
    fn plan_sources_shadow_the_registry() {
        let registry = InMemorySourceRegistry::new();
        registry.register(SourceDefinition::new("orders", "remote"));
        registry.register(SourceDefinition::new("users", "remote"));

        let plan = ExecutionPlan::new(
            "p",
            vec![PipelineStep::new(
                "src_orders",
                StepKind::Source(SourceDefinition::new("orders", "memory")),
            )],
        );
        let scope = RunScope::new(&plan, Variables::new())
            .unwrap()
            .with_registry(Arc::new(registry));

        assert_eq!(scope.resolve_source("orders").unwrap().connector_type, "memory");
        assert_eq!(scope.resolve_source("users").unwrap().connector_type, "remote");
        assert!(scope.resolve_source("missing").is_none());
    }
}
