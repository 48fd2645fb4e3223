use crate::error::PlanError;
use model::execution::{pipeline::SourceDefinition, plan::ExecutionPlan};
use std::collections::{HashMap, HashSet};

/// Collects the plan's source definitions, once per compile.
pub fn register_sources(plan: &ExecutionPlan) -> Result<HashMap<String, SourceDefinition>, PlanError> {
    let mut sources = HashMap::new();
    for def in plan.source_definitions() {
        def.validate()
            .map_err(|e| PlanError::InvalidSource(e.to_string()))?;
        if sources.insert(def.name.clone(), def.clone()).is_some() {
            return Err(PlanError::DuplicateSource(def.name.clone()));
        }
    }
    Ok(sources)
}

/// Rejects plans that reuse a step id.
pub fn check_unique_ids(plan: &ExecutionPlan) -> Result<(), PlanError> {
    let mut seen = HashSet::new();
    for step in &plan.steps {
        if !seen.insert(step.id.as_str()) {
            return Err(PlanError::DuplicateStep(step.id.clone()));
        }
    }
    Ok(())
}
