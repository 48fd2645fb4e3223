use async_trait::async_trait;
use engine_core::{
    connectors::registry::ConnectorRegistry,
    error::WarehouseError,
    state::memory::InMemoryWatermarkStore,
    warehouse::{MergeStats, Warehouse, memory::MemoryWarehouse},
};
use engine_processing::{
    load::{LoadSettings, LoadStepEngine},
    step::StepExecutor,
};
use model::{
    execution::{
        pipeline::{PipelineStep, StepKind, TransformStep},
        plan::ExecutionPlan,
    },
    records::{
        batch::Batch,
        row::RowData,
        schema::{ColumnDef, TableSchema},
    },
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Memory warehouse for engine tests. Statements containing `FLAKY` fail
/// with an internal error while `outages` is above zero; statements
/// containing `BOOM` always fail with a syntax error.
#[derive(Default)]
pub struct FlakyWarehouse {
    pub inner: MemoryWarehouse,
    pub outages: AtomicUsize,
}

impl FlakyWarehouse {
    pub fn failing(times: usize) -> Self {
        FlakyWarehouse {
            inner: MemoryWarehouse::new(),
            outages: AtomicUsize::new(times),
        }
    }
}

#[async_trait]
impl Warehouse for FlakyWarehouse {
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
        if sql.contains("BOOM") {
            return Err(WarehouseError::Sql(format!("syntax error near BOOM in '{sql}'")));
        }
        let outage = sql.contains("FLAKY")
            && self
                .outages
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if outage {
            return Err(WarehouseError::Internal("connection reset".into()));
        }
        self.inner.execute_sql(sql).await
    }
}

pub fn executor(warehouse: Arc<FlakyWarehouse>) -> StepExecutor {
    StepExecutor::new(LoadStepEngine::new(
        warehouse,
        Arc::new(ConnectorRegistry::new()),
        Arc::new(InMemoryWatermarkStore::new()),
        LoadSettings::default(),
    ))
}

pub fn sql_plan(statements: &[(&str, &str)]) -> ExecutionPlan {
    let steps = statements
        .iter()
        .map(|(id, sql)| {
            PipelineStep::new(
                *id,
                StepKind::Transform(TransformStep {
                    target_table: None,
                    sql: sql.to_string(),
                }),
            )
        })
        .collect();
    ExecutionPlan::new("sql", steps)
}
