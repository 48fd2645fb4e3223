use model::execution::result::EngineKind;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

#[derive(Debug, Default)]
struct InnerMetrics {
    total_executions: AtomicU64,
    legacy_executions: AtomicU64,
    next_executions: AtomicU64,
    next_attempts: AtomicU64,
    next_failures: AtomicU64,
    fallback_count: AtomicU64,
    failed_executions: AtomicU64,
    total_duration_ms: AtomicU64,
}

/// Process-wide execution counters shared by every bridge clone.
#[derive(Debug, Clone)]
pub struct ExecutionMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_executions: u64,
    pub per_engine_counts: BTreeMap<EngineKind, u64>,
    pub next_attempts: u64,
    pub next_failures: u64,
    pub fallback_count: u64,
    pub failed_executions: u64,
    /// Share of next-engine attempts that did not raise; 1.0 before any attempt.
    pub success_rate: f64,
    pub average_duration_ms: f64,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        ExecutionMetrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn record_execution(&self) {
        self.inner.total_executions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_next_attempt(&self) {
        self.inner.next_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_next_failure(&self) {
        self.inner.next_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.inner.fallback_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Credits the engine that produced the final result of a run.
    pub fn record_completion(&self, engine: EngineKind, duration_ms: u64, succeeded: bool) {
        match engine {
            EngineKind::Legacy => self.inner.legacy_executions.fetch_add(1, Ordering::Relaxed),
            EngineKind::Next => self.inner.next_executions.fetch_add(1, Ordering::Relaxed),
        };
        if !succeeded {
            self.inner.failed_executions.fetch_add(1, Ordering::Relaxed);
        }
        self.inner
            .total_duration_ms
            .fetch_add(duration_ms, Ordering::Relaxed);
    }

    pub fn record_failed_execution(&self) {
        self.inner.failed_executions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let legacy = self.inner.legacy_executions.load(Ordering::Relaxed);
        let next = self.inner.next_executions.load(Ordering::Relaxed);
        let attempts = self.inner.next_attempts.load(Ordering::Relaxed);
        let failures = self.inner.next_failures.load(Ordering::Relaxed);
        let completed = legacy + next;

        let success_rate = if attempts == 0 {
            1.0
        } else {
            attempts.saturating_sub(failures) as f64 / attempts as f64
        };
        let average_duration_ms = if completed == 0 {
            0.0
        } else {
            self.inner.total_duration_ms.load(Ordering::Relaxed) as f64 / completed as f64
        };

        MetricsSnapshot {
            total_executions: self.inner.total_executions.load(Ordering::Relaxed),
            per_engine_counts: BTreeMap::from([
                (EngineKind::Legacy, legacy),
                (EngineKind::Next, next),
            ]),
            next_attempts: attempts,
            next_failures: failures,
            fallback_count: self.inner.fallback_count.load(Ordering::Relaxed),
            failed_executions: self.inner.failed_executions.load(Ordering::Relaxed),
            success_rate,
            average_duration_ms,
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn reset(&self) {
        for counter in [
            &self.inner.total_executions,
            &self.inner.legacy_executions,
            &self.inner.next_executions,
            &self.inner.next_attempts,
            &self.inner.next_failures,
            &self.inner.fallback_count,
            &self.inner.failed_executions,
            &self.inner.total_duration_ms,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_defaults_to_one() {
        let metrics = ExecutionMetrics::new();
        assert_eq!(metrics.snapshot().success_rate, 1.0);
    }

    #[test]
    fn tracks_next_attempts_and_failures() {
        let metrics = ExecutionMetrics::new();
        for _ in 0..4 {
            metrics.record_execution();
            metrics.record_next_attempt();
        }
        metrics.record_next_failure();
        metrics.record_fallback();
        metrics.record_completion(EngineKind::Legacy, 10, true);
        metrics.record_completion(EngineKind::Next, 20, true);
        metrics.record_completion(EngineKind::Next, 30, false);

        let snap = metrics.snapshot();
        assert_eq!(snap.total_executions, 4);
        assert_eq!(snap.success_rate, 0.75);
        assert_eq!(snap.fallback_count, 1);
        assert_eq!(snap.per_engine_counts[&EngineKind::Legacy], 1);
        assert_eq!(snap.per_engine_counts[&EngineKind::Next], 2);
        assert_eq!(snap.failed_executions, 1);
        assert_eq!(snap.average_duration_ms, 20.0);
    }

    #[test]
    fn clones_share_counters() {
        let metrics = ExecutionMetrics::new();
        let clone = metrics.clone();
        clone.record_execution();
        assert_eq!(metrics.snapshot().total_executions, 1);

        metrics.reset();
        assert_eq!(clone.snapshot().total_executions, 0);
    }
}
