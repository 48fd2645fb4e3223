use crate::{
    error::WarehouseError,
    warehouse::{MergeStats, Warehouse},
};
use async_trait::async_trait;
use model::{
    core::value::Value,
    records::{
        batch::Batch,
        row::RowData,
        schema::{ColumnDef, TableSchema},
    },
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct MemoryTable {
    schema: TableSchema,
    rows: Vec<RowData>,
}

impl MemoryTable {
    fn project(&self, row: &RowData) -> RowData {
        row.project(&self.schema.column_names())
    }
}

/// Warehouse kept entirely in memory. Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    tables: Arc<RwLock<HashMap<String, MemoryTable>>>,
    statements: Arc<RwLock<Vec<String>>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_table(&self, schema: TableSchema) {
        self.tables.write().await.insert(
            schema.name.clone(),
            MemoryTable {
                schema,
                rows: Vec::new(),
            },
        );
    }

    pub async fn rows(&self, table: &str) -> Option<Vec<RowData>> {
        self.tables.read().await.get(table).map(|t| t.rows.clone())
    }

    pub async fn statements(&self) -> Vec<String> {
        self.statements.read().await.clone()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn table_schema(&self, table: &str) -> Result<Option<TableSchema>, WarehouseError> {
        Ok(self.tables.read().await.get(table).map(|t| t.schema.clone()))
    }

    async fn replace_table(
        &self,
        table: &str,
        columns: Vec<ColumnDef>,
        rows: Vec<RowData>,
    ) -> Result<u64, WarehouseError> {
        let replacement = MemoryTable {
            schema: TableSchema::new(table, columns),
            rows,
        };
        let rows: Vec<RowData> = replacement
            .rows
            .iter()
            .map(|r| replacement.project(r))
            .collect();
        let count = rows.len() as u64;

        // The new table is fully built before it becomes visible.
        self.tables.write().await.insert(
            table.to_string(),
            MemoryTable {
                rows,
                ..replacement
            },
        );
        debug!(table, rows = count, "Replaced table");
        Ok(count)
    }

    async fn insert_rows(&self, table: &str, rows: Vec<RowData>) -> Result<u64, WarehouseError> {
        let mut tables = self.tables.write().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?;

        let projected: Vec<RowData> = rows.iter().map(|r| target.project(r)).collect();
        let count = projected.len() as u64;
        target.rows.extend(projected);
        Ok(count)
    }

    async fn merge_rows(
        &self,
        table: &str,
        keys: &[String],
        rows: Vec<RowData>,
    ) -> Result<MergeStats, WarehouseError> {
        if keys.is_empty() {
            return Err(WarehouseError::Sql(format!(
                "merge into '{table}' requires at least one key column"
            )));
        }

        let mut tables = self.tables.write().await;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?;

        let mut index: HashMap<Vec<Value>, usize> = target
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.key(keys), i))
            .collect();

        let columns = target.schema.column_names();
        let mut stats = MergeStats::default();
        for row in &rows {
            let key = row.key(keys);
            match index.get(&key) {
                Some(&pos) => {
                    // Only columns the incoming row carries are overwritten.
                    let existing = &mut target.rows[pos];
                    for field in &row.field_values {
                        if let Some(column) = columns
                            .iter()
                            .find(|c| c.eq_ignore_ascii_case(&field.name))
                        {
                            existing.set(column, field.value.clone());
                        }
                    }
                    stats.updated += 1;
                }
                None => {
                    index.insert(key, target.rows.len());
                    target.rows.push(row.project(&columns));
                    stats.inserted += 1;
                }
            }
        }

        debug!(
            table,
            inserted = stats.inserted,
            updated = stats.updated,
            "Merged rows"
        );
        Ok(stats)
    }

    async fn scan(&self, table: &str) -> Result<Batch, WarehouseError> {
        let tables = self.tables.read().await;
        let target = tables
            .get(table)
            .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))?;
        Ok(Batch::new(target.schema.columns.clone(), target.rows.clone()))
    }

    async fn execute_sql(&self, sql: &str) -> Result<u64, WarehouseError> {
        if sql.trim().is_empty() {
            return Err(WarehouseError::Sql("empty statement".into()));
        }
        self.statements.write().await.push(sql.to_string());
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::data_type::DataType;

    fn users_schema() -> TableSchema {
        TableSchema::new(
            "users",
            vec![
                ColumnDef::new("id", DataType::Long),
                ColumnDef::new("name", DataType::String),
            ],
        )
    }

    fn user(id: i64, name: &str) -> RowData {
        RowData::from_pairs([("id", Value::Int(id)), ("name", Value::from(name))])
    }

    #[tokio::test]
    async fn merge_upserts_on_key() {
        let wh = MemoryWarehouse::new();
        wh.create_table(users_schema()).await;
        wh.insert_rows("users", vec![user(1, "a"), user(2, "b")])
            .await
            .unwrap();

        let stats = wh
            .merge_rows("users", &["id".to_string()], vec![user(2, "B"), user(3, "c")])
            .await
            .unwrap();
        assert_eq!(stats, MergeStats { inserted: 1, updated: 1 });

        let rows = wh.rows("users").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].get_value("name"), Value::from("B"));
    }

    #[tokio::test]
    async fn merge_keeps_columns_the_source_does_not_carry() {
        let wh = MemoryWarehouse::new();
        let mut schema = users_schema();
        schema.columns.push(ColumnDef::new("email", DataType::String));
        wh.create_table(schema).await;
        wh.insert_rows(
            "users",
            vec![RowData::from_pairs([
                ("id", Value::Int(2)),
                ("name", Value::from("b")),
                ("email", Value::from("b@x")),
            ])],
        )
        .await
        .unwrap();

        wh.merge_rows("users", &["id".to_string()], vec![user(2, "B")])
            .await
            .unwrap();

        let rows = wh.rows("users").await.unwrap();
        assert_eq!(rows[0].get_value("name"), Value::from("B"));
        assert_eq!(rows[0].get_value("email"), Value::from("b@x"));
        assert_eq!(rows[0].field_values.len(), 3);
    }

    #[tokio::test]
    async fn insert_into_missing_table_fails() {
        let wh = MemoryWarehouse::new();
        assert!(matches!(
            wh.insert_rows("ghost", vec![user(1, "a")]).await,
            Err(WarehouseError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn replace_swaps_contents() {
        let wh = MemoryWarehouse::new();
        wh.create_table(users_schema()).await;
        wh.insert_rows("users", vec![user(1, "a")]).await.unwrap();

        let written = wh
            .replace_table("users", users_schema().columns, vec![user(7, "z")])
            .await
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(wh.rows("users").await.unwrap(), vec![user(7, "z")]);
    }

    #[tokio::test]
    async fn insert_fills_missing_columns_with_null() {
        let wh = MemoryWarehouse::new();
        wh.create_table(users_schema()).await;
        wh.insert_rows("users", vec![RowData::from_pairs([("id", Value::Int(1))])])
            .await
            .unwrap();
        assert_eq!(wh.rows("users").await.unwrap()[0].get_value("name"), Value::Null);
    }
}
