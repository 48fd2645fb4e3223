use crate::{
    core::value::Value,
    execution::pipeline::{PipelineStep, SourceDefinition, StepKind},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Run variables substituted into transform statements.
pub type Variables = BTreeMap<String, Value>;

/// Ordered steps submitted for one run of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub pipeline: String,
    pub steps: Vec<PipelineStep>,
}

impl ExecutionPlan {
    pub fn new(pipeline: impl Into<String>, steps: Vec<PipelineStep>) -> Self {
        ExecutionPlan {
            pipeline: pipeline.into(),
            steps,
        }
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn source_definitions(&self) -> impl Iterator<Item = &SourceDefinition> {
        self.steps.iter().filter_map(|s| match &s.kind {
            StepKind::Source(def) => Some(def),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
