use crate::{
    engine::{legacy::LegacyEngine, next::NextEngine},
    error::RuntimeError,
    execution::{bridge::DualEngineBridge, executor::PipelineRunner, monitor::PerformanceMonitor},
};
use engine_config::{
    flags::{FeatureFlagManager, FeatureFlags},
    settings::EngineSettings,
};
use engine_core::{
    connectors::connector::ConnectorProvider,
    metrics::ExecutionMetrics,
    sources::SourceRegistry,
    state::{WatermarkStore, sled_store::SledWatermarkStore},
    warehouse::Warehouse,
};
use engine_processing::{
    load::{LoadSettings, LoadStepEngine},
    step::StepExecutor,
};
use std::sync::Arc;
use tracing::info;

/// Everything a runner needs that lives outside the engines.
#[derive(Clone)]
pub struct RuntimeParts {
    pub warehouse: Arc<dyn Warehouse>,
    pub connectors: Arc<dyn ConnectorProvider>,
    pub watermarks: Arc<dyn WatermarkStore>,
    pub registry: Option<Arc<dyn SourceRegistry>>,
    pub allow_undeclared_sources: bool,
}

impl RuntimeParts {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        connectors: Arc<dyn ConnectorProvider>,
        watermarks: Arc<dyn WatermarkStore>,
    ) -> Self {
        RuntimeParts {
            warehouse,
            connectors,
            watermarks,
            registry: None,
            allow_undeclared_sources: false,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn SourceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn allow_undeclared_sources(mut self, allow: bool) -> Self {
        self.allow_undeclared_sources = allow;
        self
    }
}

/// Opens the durable watermark store under the configured state directory.
pub fn open_watermarks(settings: &EngineSettings) -> Result<Arc<SledWatermarkStore>, RuntimeError> {
    let store = SledWatermarkStore::open(settings.state_dir.join("watermarks"))?;
    Ok(Arc::new(store))
}

fn step_executor(settings: &EngineSettings, parts: &RuntimeParts) -> StepExecutor {
    StepExecutor::new(LoadStepEngine::new(
        parts.warehouse.clone(),
        parts.connectors.clone(),
        parts.watermarks.clone(),
        LoadSettings {
            batch_size: settings.batch_size.get(),
            allow_undeclared_sources: parts.allow_undeclared_sources,
        },
    ))
}

pub fn create_bridge(
    settings: &EngineSettings,
    flags: FeatureFlags,
    parts: &RuntimeParts,
    metrics: ExecutionMetrics,
) -> Result<DualEngineBridge, RuntimeError> {
    let flags = Arc::new(FeatureFlagManager::new(flags)?);
    let legacy = LegacyEngine::new(step_executor(settings, parts), parts.registry.clone());
    let next = NextEngine::new(step_executor(settings, parts), parts.registry.clone());

    let snapshot = flags.snapshot();
    info!(
        environment = %snapshot.environment(),
        rollout_percentage = snapshot.rollout_percentage(),
        features = ?snapshot.enabled().map(|f| f.as_str()).collect::<Vec<_>>(),
        "Dual-engine bridge ready"
    );

    Ok(DualEngineBridge::new(
        Arc::new(legacy),
        Arc::new(next),
        flags,
        metrics,
    ))
}

pub fn create_runner(
    settings: &EngineSettings,
    flags: FeatureFlags,
    parts: &RuntimeParts,
) -> Result<PipelineRunner, RuntimeError> {
    let metrics = ExecutionMetrics::new();
    let bridge = create_bridge(settings, flags, parts, metrics.clone())?;
    let monitor = PerformanceMonitor::new(
        metrics,
        settings.monitor_interval,
        settings.monitor_join_timeout,
    );
    Ok(PipelineRunner::new(bridge, monitor))
}
