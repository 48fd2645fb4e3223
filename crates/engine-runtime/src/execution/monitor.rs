use engine_core::metrics::{ExecutionMetrics, MetricsSnapshot};
use std::time::Duration;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSample {
    pub resident_bytes: Option<u64>,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorReport {
    pub samples: Vec<ResourceSample>,
    /// Set when the sampler had to be aborted after the join timeout.
    pub timed_out: bool,
}

impl MonitorReport {
    pub fn peak_resident_bytes(&self) -> Option<u64> {
        self.samples.iter().filter_map(|s| s.resident_bytes).max()
    }
}

/// Passive resource sampler that runs beside a pipeline run.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    metrics: ExecutionMetrics,
    interval: Duration,
    join_timeout: Duration,
}

impl PerformanceMonitor {
    pub fn new(metrics: ExecutionMetrics, interval: Duration, join_timeout: Duration) -> Self {
        PerformanceMonitor {
            metrics,
            interval,
            join_timeout,
        }
    }

    pub fn start(&self) -> MonitorHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let metrics = self.metrics.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut samples = Vec::new();
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let sample = ResourceSample {
                            resident_bytes: resident_bytes(),
                            metrics: metrics.snapshot(),
                        };
                        debug!(
                            resident_bytes = ?sample.resident_bytes,
                            total_executions = sample.metrics.total_executions,
                            fallback_count = sample.metrics.fallback_count,
                            "Performance sample"
                        );
                        samples.push(sample);
                    }
                }
            }
            samples
        });

        MonitorHandle {
            cancel,
            handle,
            join_timeout: self.join_timeout,
        }
    }
}

/// Owner of a running sampler; must be stopped to collect its samples.
pub struct MonitorHandle {
    cancel: CancellationToken,
    handle: JoinHandle<Vec<ResourceSample>>,
    join_timeout: Duration,
}

impl MonitorHandle {
    pub async fn stop(self) -> MonitorReport {
        self.cancel.cancel();
        let abort = self.handle.abort_handle();

        match tokio::time::timeout(self.join_timeout, self.handle).await {
            Ok(Ok(samples)) => MonitorReport {
                samples,
                timed_out: false,
            },
            Ok(Err(e)) => {
                warn!(error = %e, "Performance monitor task failed");
                MonitorReport::default()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.join_timeout.as_millis() as u64,
                    "Performance monitor did not stop in time, aborting"
                );
                abort.abort();
                MonitorReport {
                    samples: Vec::new(),
                    timed_out: true,
                }
            }
        }
    }
}

/// Resident set size of this process, where `/proc` is available.
fn resident_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn samples_until_stopped() {
        let metrics = ExecutionMetrics::new();
        metrics.record_execution();
        let monitor = PerformanceMonitor::new(
            metrics,
            Duration::from_millis(10),
            Duration::from_secs(2),
        );

        let handle = monitor.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let report = handle.stop().await;

        assert!(!report.timed_out);
        // The first tick fires immediately.
        assert!(!report.samples.is_empty());
        assert_eq!(report.samples[0].metrics.total_executions, 1);
    }

    #[tokio::test]
    async fn stop_right_after_start_is_prompt() {
        let monitor = PerformanceMonitor::new(
            ExecutionMetrics::new(),
            Duration::from_secs(60),
            Duration::from_secs(2),
        );
        let report = monitor.start().stop().await;
        assert!(!report.timed_out);
    }
}
