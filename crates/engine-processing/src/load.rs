use crate::{
    error::LoadError,
    incremental::IncrementalSync,
    validation::{check_append, check_merge, check_replace},
};
use engine_core::{
    connectors::connector::ConnectorProvider,
    state::WatermarkStore,
    warehouse::{MergeStats, Warehouse},
};
use model::{
    execution::{
        errors::DefinitionError,
        pipeline::{LoadMode, LoadStep, SourceDefinition},
    },
    records::{batch::Batch, schema::TableSchema},
    state::cursor::CursorValue,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSettings {
    pub batch_size: usize,
    /// Lets a load name an undeclared source when a warehouse table of that
    /// name already exists. Off unless explicitly enabled.
    pub allow_undeclared_sources: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        LoadSettings {
            batch_size: 1000,
            allow_undeclared_sources: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub mode: LoadMode,
    pub rows_read: u64,
    pub rows_affected: u64,
    pub merge: Option<MergeStats>,
    /// Watermark committed by this load, if it moved.
    pub watermark: Option<CursorValue>,
}

impl LoadOutcome {
    fn empty(mode: LoadMode) -> Self {
        LoadOutcome {
            mode,
            rows_read: 0,
            rows_affected: 0,
            merge: None,
            watermark: None,
        }
    }
}

/// Executes a single load step against the warehouse.
#[derive(Clone)]
pub struct LoadStepEngine {
    warehouse: Arc<dyn Warehouse>,
    connectors: Arc<dyn ConnectorProvider>,
    watermarks: Arc<dyn WatermarkStore>,
    settings: LoadSettings,
}

impl LoadStepEngine {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        connectors: Arc<dyn ConnectorProvider>,
        watermarks: Arc<dyn WatermarkStore>,
        settings: LoadSettings,
    ) -> Self {
        LoadStepEngine {
            warehouse,
            connectors,
            watermarks,
            settings,
        }
    }

    pub fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    pub fn warehouse(&self) -> &Arc<dyn Warehouse> {
        &self.warehouse
    }

    pub fn connectors(&self) -> &Arc<dyn ConnectorProvider> {
        &self.connectors
    }

    pub async fn execute(
        &self,
        pipeline: &str,
        step_id: &str,
        step: &LoadStep,
        source: Option<&SourceDefinition>,
    ) -> Result<LoadOutcome, LoadError> {
        step.validate(step_id).map_err(|e| match e {
            DefinitionError::MissingMergeKeys { step } => LoadError::MissingMergeKeys { step },
            other => LoadError::InvalidDefinition(other),
        })?;

        let target = self.warehouse.table_schema(&step.table_name).await?;
        if target.is_none() && step.mode != LoadMode::Replace {
            return Err(LoadError::TargetMissing(step.table_name.clone()));
        }

        let mut sync = None;
        let batch = match source {
            Some(def) => {
                def.validate()?;
                let connector = self.connectors.connector(&def.connector_type)?;
                if def.is_incremental() {
                    let mut s = IncrementalSync::new(pipeline, def)?;
                    s.retrieve(self.watermarks.as_ref()).await?;
                    let batch = s.read(connector.as_ref(), self.settings.batch_size).await?;
                    sync = Some(s);
                    batch
                } else {
                    connector.read(def.object_id()).await?
                }
            }
            None => self.read_undeclared(step).await?,
        };

        if batch.is_empty() {
            info!(step_id, table = %step.table_name, mode = %step.mode, "Source returned no rows");
            return Ok(LoadOutcome::empty(step.mode));
        }

        let rows_read = batch.len() as u64;
        let (rows_affected, merge) = self.apply(step, target.as_ref(), batch).await?;

        let watermark = match sync.as_mut() {
            Some(s) => s.advance(self.watermarks.as_ref()).await?,
            None => None,
        };

        info!(
            step_id,
            table = %step.table_name,
            mode = %step.mode,
            rows_read,
            rows_affected,
            "Load step applied"
        );

        Ok(LoadOutcome {
            mode: step.mode,
            rows_read,
            rows_affected,
            merge,
            watermark,
        })
    }

    async fn apply(
        &self,
        step: &LoadStep,
        target: Option<&TableSchema>,
        batch: Batch,
    ) -> Result<(u64, Option<MergeStats>), LoadError> {
        let table = &step.table_name;
        match (step.mode, target) {
            (LoadMode::Replace, _) => {
                check_replace(table, &batch)?;
                let written = self
                    .warehouse
                    .replace_table(table, batch.columns, batch.rows)
                    .await?;
                Ok((written, None))
            }
            (LoadMode::Append, Some(target)) => {
                check_append(target, &batch)?;
                let inserted = self.warehouse.insert_rows(table, batch.rows).await?;
                Ok((inserted, None))
            }
            (LoadMode::Merge, Some(target)) => {
                let keys = step.ordered_merge_keys();
                check_merge(target, &batch, &keys)?;
                let stats = self.warehouse.merge_rows(table, &keys, batch.rows).await?;
                Ok((stats.total(), Some(stats)))
            }
            (_, None) => Err(LoadError::TargetMissing(table.clone())),
        }
    }

    /// Compatibility path for loads whose source was never declared: an
    /// existing warehouse table of the same name stands in for the source.
    async fn read_undeclared(&self, step: &LoadStep) -> Result<Batch, LoadError> {
        if !self.settings.allow_undeclared_sources {
            return Err(LoadError::SourceNotDefined(step.source_name.clone()));
        }
        match self.warehouse.table_schema(&step.source_name).await? {
            Some(_) => {
                warn!(
                    source = %step.source_name,
                    table = %step.table_name,
                    "Source not declared, reading existing warehouse table of the same name"
                );
                Ok(self.warehouse.scan(&step.source_name).await?)
            }
            None => Err(LoadError::SourceNotDefined(step.source_name.clone())),
        }
    }
}
