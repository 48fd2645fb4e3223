use crate::engine::RunOptions;
use model::execution::result::StepOutcome;
use std::{
    collections::{HashMap, VecDeque},
    sync::RwLock,
};

/// Finished runs kept for inspection and resume before the oldest is dropped.
pub const DEFAULT_RETAINED_RUNS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Progress of one run as seen by the engine that ran it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionState {
    pub execution_id: String,
    pub run_id: String,
    /// Process-wide start order of the run.
    pub seq: u64,
    pub phase: RunPhase,
    pub total_steps: usize,
    pub outcomes: Vec<StepOutcome>,
}

impl ExecutionState {
    pub fn completed_step_ids(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.step_id.as_str())
    }
}

#[derive(Debug, Default)]
struct StateTable {
    runs: HashMap<String, ExecutionState>,
    /// Run ids, oldest first.
    order: VecDeque<String>,
}

impl StateTable {
    fn evict(&mut self, capacity: usize) {
        while self.runs.len() > capacity {
            let Some(pos) = self.order.iter().position(|id| {
                self.runs
                    .get(id)
                    .is_none_or(|s| s.phase != RunPhase::Running)
            }) else {
                // Every retained run is still in flight.
                return;
            };
            if let Some(id) = self.order.remove(pos) {
                self.runs.remove(&id);
            }
        }
    }
}

/// Run states keyed by run id, bounded to a fixed number of runs.
#[derive(Debug)]
pub struct ExecutionStates {
    inner: RwLock<StateTable>,
    capacity: usize,
}

impl Default for ExecutionStates {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RETAINED_RUNS)
    }
}

impl ExecutionStates {
    pub fn with_capacity(capacity: usize) -> Self {
        ExecutionStates {
            inner: RwLock::new(StateTable::default()),
            capacity: capacity.max(1),
        }
    }

    /// Starts (or restarts, on resume) the record of a run.
    pub fn begin(&self, opts: &RunOptions, total_steps: usize, carried: Vec<StepOutcome>) {
        let capacity = self.capacity;
        self.write(|table| {
            table.order.retain(|id| id != &opts.run_id);
            table.order.push_back(opts.run_id.clone());
            table.runs.insert(
                opts.run_id.clone(),
                ExecutionState {
                    execution_id: opts.execution_id.clone(),
                    run_id: opts.run_id.clone(),
                    seq: opts.seq,
                    phase: RunPhase::Running,
                    total_steps,
                    outcomes: carried,
                },
            );
            table.evict(capacity);
        });
    }

    pub fn record(&self, run_id: &str, outcome: StepOutcome) {
        self.write(|table| {
            if let Some(state) = table.runs.get_mut(run_id) {
                state.outcomes.push(outcome);
            }
        });
    }

    pub fn finish(&self, run_id: &str, phase: RunPhase) {
        let capacity = self.capacity;
        self.write(|table| {
            if let Some(state) = table.runs.get_mut(run_id) {
                state.phase = phase;
            }
            table.evict(capacity);
        });
    }

    /// Looks up a run by its run id, or the latest run of an execution id.
    pub fn get(&self, handle: &str) -> Option<ExecutionState> {
        let table = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(state) = table.runs.get(handle) {
            return Some(state.clone());
        }
        table
            .order
            .iter()
            .rev()
            .filter_map(|id| table.runs.get(id))
            .find(|s| s.execution_id == handle)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .runs
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self, f: impl FnOnce(&mut StateTable)) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard);
    }
}
