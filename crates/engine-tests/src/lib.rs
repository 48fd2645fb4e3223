#![allow(dead_code)]

use async_trait::async_trait;
use engine_config::{flags::FeatureFlags, settings::EngineSettings};
use engine_core::{
    connectors::{memory::MemoryConnector, registry::ConnectorRegistry},
    error::WarehouseError,
    state::sled_store::SledWatermarkStore,
    warehouse::{MergeStats, Warehouse, memory::MemoryWarehouse},
};
use engine_runtime::execution::{
    executor::{PipelineRunner, RunOutput},
    factory::{RuntimeParts, create_runner, open_watermarks},
};
use model::{
    execution::plan::{ExecutionPlan, Variables},
    records::{
        batch::Batch,
        row::RowData,
        schema::{ColumnDef, TableSchema},
    },
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub mod engine;
pub mod utils;

/// Connector type under which the harness connector is registered.
pub const MEMORY: &str = "memory";

/// A runner wired to in-memory collaborators and a sled watermark store in a
/// temporary state directory.
pub struct Harness {
    pub warehouse: Arc<OutageWarehouse>,
    pub connector: MemoryConnector,
    pub watermarks: Arc<SledWatermarkStore>,
    pub runner: PipelineRunner,
    _state_dir: TempDir,
}

impl Harness {
    pub fn new(flags: FeatureFlags) -> Self {
        Self::with_connector(flags, MemoryConnector::new(MEMORY))
    }

    pub fn with_connector(flags: FeatureFlags, connector: MemoryConnector) -> Self {
        let state_dir = tempfile::tempdir().expect("create state dir");
        let settings = EngineSettings::with_state_dir(state_dir.path());
        let warehouse = Arc::new(OutageWarehouse::default());
        let watermarks = open_watermarks(&settings).expect("open watermark store");

        let parts = RuntimeParts::new(
            warehouse.clone(),
            Arc::new(ConnectorRegistry::new().with(MEMORY, Arc::new(connector.clone()))),
            watermarks.clone(),
        );
        let runner = create_runner(&settings, flags, &parts).expect("build runner");

        Harness {
            warehouse,
            connector,
            watermarks,
            runner,
            _state_dir: state_dir,
        }
    }

    /// Runs `plan` with no variables, panicking if the bridge raises.
    pub async fn run(&self, plan: &ExecutionPlan) -> RunOutput {
        self.run_with(plan, &Variables::new()).await
    }

    pub async fn run_with(&self, plan: &ExecutionPlan, variables: &Variables) -> RunOutput {
        self.runner
            .run(plan, variables, CancellationToken::new())
            .await
            .expect("run plan")
    }

    pub async fn table(&self, name: &str) -> Vec<RowData> {
        self.warehouse.inner.rows(name).await.unwrap_or_default()
    }
}

/// Memory warehouse that can simulate infrastructure outages: statements
/// containing the armed marker fail with an internal error a fixed number of
/// times.
#[derive(Default)]
pub struct OutageWarehouse {
    pub inner: MemoryWarehouse,
    marker: Mutex<Option<String>>,
    remaining: AtomicUsize,
}

impl OutageWarehouse {
    pub fn fail_statements(&self, marker: &str, times: usize) {
        *self.marker.lock().expect("marker lock") = Some(marker.to_string());
        self.remaining.store(times, Ordering::SeqCst);
    }

    fn outage(&self, sql: &str) -> bool {
        let armed = self
            .marker
            .lock()
            .expect("marker lock")
            .as_deref()
            .is_some_and(|m| sql.contains(m));
        armed
            && self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
    }
}

#[async_trait]
impl Warehouse for OutageWarehouse {
    async fn table_schema(&self, table: &str) -> Result<Option<TableSchema>, WarehouseError> {
        self.inner.table_schema(table).await
    }

    async fn replace_table(
        &self,
        table: &str,
        columns: Vec<ColumnDef>,
        rows: Vec<RowData>,
    ) -> Result<u64, WarehouseError> {
        self.inner.replace_table(table, columns, rows).await
    }

    async fn insert_rows(&self, table: &str, rows: Vec<RowData>) -> Result<u64, WarehouseError> {
        self.inner.insert_rows(table, rows).await
    }

    async fn merge_rows(
        &self,
        table: &str,
        keys: &[String],
        rows: Vec<RowData>,
    ) -> Result<MergeStats, WarehouseError> {
        self.inner.merge_rows(table, keys, rows).await
    }

    async fn scan(&self, table: &str) -> Result<Batch, WarehouseError> {
        self.inner.scan(table).await
    }

    async fn execute_sql(&self, sql: &str) -> Result<u64, WarehouseError> {
        if self.outage(sql) {
            return Err(WarehouseError::Internal(format!(
                "warehouse connection lost while executing '{sql}'"
            )));
        }
        self.inner.execute_sql(sql).await
    }
}
