use crate::{
    error::RuntimeError,
    execution::{
        bridge::DualEngineBridge,
        monitor::{MonitorReport, PerformanceMonitor},
    },
};
use engine_config::flags::Feature;
use model::execution::{
    plan::{ExecutionPlan, Variables},
    result::RunReport,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct RunOutput {
    pub report: RunReport,
    /// Present when performance monitoring was enabled for the run.
    pub monitor: Option<MonitorReport>,
}

/// Runs plans through the bridge with the optional resource sampler alongside.
pub struct PipelineRunner {
    bridge: DualEngineBridge,
    monitor: PerformanceMonitor,
}

impl PipelineRunner {
    pub fn new(bridge: DualEngineBridge, monitor: PerformanceMonitor) -> Self {
        PipelineRunner { bridge, monitor }
    }

    pub fn bridge(&self) -> &DualEngineBridge {
        &self.bridge
    }

    pub async fn run(
        &self,
        plan: &ExecutionPlan,
        variables: &Variables,
        cancel: CancellationToken,
    ) -> Result<RunOutput, RuntimeError> {
        info!(pipeline = %plan.pipeline, steps = plan.len(), "Running pipeline");

        let sampler = self
            .bridge
            .flags()
            .is_enabled(Feature::PerformanceMonitoring)
            .then(|| self.monitor.start());

        let outcome = self.bridge.execute_with(plan, variables, cancel).await;

        // Stop the sampler whether or not the run succeeded.
        let monitor = match sampler {
            Some(handle) => Some(handle.stop().await),
            None => None,
        };

        if let Some(report) = &monitor {
            info!(
                samples = report.samples.len(),
                peak_resident_bytes = ?report.peak_resident_bytes(),
                "Performance monitor stopped"
            );
        }

        Ok(RunOutput {
            report: outcome?,
            monitor,
        })
    }
}
