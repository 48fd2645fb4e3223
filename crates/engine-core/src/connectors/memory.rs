use crate::{connectors::connector::Connector, error::ConnectorError};
use async_trait::async_trait;
use model::{
    records::{batch::Batch, row::RowData},
    state::cursor::CursorValue,
};
use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Connector over named in-memory row sets.
///
/// Incremental support can be switched off to exercise the full-read path.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    name: String,
    objects: Arc<RwLock<HashMap<String, Vec<RowData>>>>,
    incremental: bool,
}

impl MemoryConnector {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryConnector {
            name: name.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
            incremental: true,
        }
    }

    pub fn without_incremental(mut self) -> Self {
        self.incremental = false;
        self
    }

    pub async fn put_rows(&self, object_id: &str, rows: Vec<RowData>) {
        self.objects.write().await.insert(object_id.to_string(), rows);
    }

    pub async fn append_rows(&self, object_id: &str, rows: Vec<RowData>) {
        self.objects
            .write()
            .await
            .entry(object_id.to_string())
            .or_default()
            .extend(rows);
    }

    pub async fn rows(&self, object_id: &str) -> Option<Vec<RowData>> {
        self.objects.read().await.get(object_id).cloned()
    }

    async fn object(&self, object_id: &str) -> Result<Vec<RowData>, ConnectorError> {
        self.rows(object_id)
            .await
            .ok_or_else(|| ConnectorError::ObjectNotFound(object_id.to_string()))
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, object_id: &str) -> Result<Batch, ConnectorError> {
        Ok(Batch::from_rows(self.object(object_id).await?))
    }

    fn supports_incremental(&self) -> bool {
        self.incremental
    }

    async fn read_incremental(
        &self,
        object_id: &str,
        cursor_field: &str,
        after: Option<&CursorValue>,
        batch_size: usize,
    ) -> Result<Batch, ConnectorError> {
        if !self.incremental {
            return Err(ConnectorError::Unsupported {
                connector: self.name.clone(),
                operation: "incremental reads",
            });
        }

        let mut keyed: Vec<(CursorValue, RowData)> = self
            .object(object_id)
            .await?
            .into_iter()
            .filter_map(|row| {
                let cursor = CursorValue::from_value(&row.get_value(cursor_field))?;
                match after {
                    Some(prior) if cursor.partial_cmp(prior) != Some(Ordering::Greater) => None,
                    _ => Some((cursor, row)),
                }
            })
            .collect();

        keyed.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let rows = keyed
            .into_iter()
            .take(batch_size.max(1))
            .map(|(_, row)| row)
            .collect();

        Ok(Batch::from_rows(rows))
    }

    async fn write(&self, object_id: &str, batch: Batch) -> Result<u64, ConnectorError> {
        let written = batch.len() as u64;
        self.put_rows(object_id, batch.rows).await;
        Ok(written)
    }
}
