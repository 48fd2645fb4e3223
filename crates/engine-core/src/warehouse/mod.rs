use crate::error::WarehouseError;
use async_trait::async_trait;
use model::records::{
    batch::Batch,
    row::RowData,
    schema::{ColumnDef, TableSchema},
};
use serde::Serialize;

pub mod memory;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub inserted: u64,
    pub updated: u64,
}

impl MergeStats {
    pub fn total(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// The target store that load steps write into.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// `None` when the table does not exist.
    async fn table_schema(&self, table: &str) -> Result<Option<TableSchema>, WarehouseError>;

    /// Atomically swaps `table` for a new table holding exactly `rows`.
    async fn replace_table(
        &self,
        table: &str,
        columns: Vec<ColumnDef>,
        rows: Vec<RowData>,
    ) -> Result<u64, WarehouseError>;

    async fn insert_rows(&self, table: &str, rows: Vec<RowData>) -> Result<u64, WarehouseError>;

    /// Upserts `rows`, matching existing rows on `keys`.
    async fn merge_rows(
        &self,
        table: &str,
        keys: &[String],
        rows: Vec<RowData>,
    ) -> Result<MergeStats, WarehouseError>;

    async fn scan(&self, table: &str) -> Result<Batch, WarehouseError>;

    async fn execute_sql(&self, sql: &str) -> Result<u64, WarehouseError>;
}
