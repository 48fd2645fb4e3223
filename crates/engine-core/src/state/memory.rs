use crate::{
    error::StateStoreError,
    state::{WatermarkStore, advances},
};
use async_trait::async_trait;
use model::state::{
    cursor::CursorValue,
    watermark::{WatermarkKey, WatermarkRecord},
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Non-durable store for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryWatermarkStore {
    records: RwLock<HashMap<WatermarkKey, WatermarkRecord>>,
}

impl InMemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatermarkStore for InMemoryWatermarkStore {
    async fn get_watermark(
        &self,
        key: &WatermarkKey,
    ) -> Result<Option<CursorValue>, StateStoreError> {
        Ok(self.records.read().await.get(key).map(|r| r.value.clone()))
    }

    async fn set_watermark(
        &self,
        key: &WatermarkKey,
        value: &CursorValue,
    ) -> Result<bool, StateStoreError> {
        let mut records = self.records.write().await;
        if !advances(records.get(key).map(|r| &r.value), value) {
            return Ok(false);
        }
        records.insert(
            key.clone(),
            WatermarkRecord {
                key: key.clone(),
                value: value.clone(),
                updated_at: chrono::Utc::now(),
            },
        );
        Ok(true)
    }

    async fn list_watermarks(
        &self,
        pipeline: &str,
    ) -> Result<Vec<WatermarkRecord>, StateStoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.key.pipeline == pipeline)
            .cloned()
            .collect())
    }

    async fn clear_watermark(&self, key: &WatermarkKey) -> Result<bool, StateStoreError> {
        Ok(self.records.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_highest_value() {
        let store = InMemoryWatermarkStore::new();
        let key = WatermarkKey::new("p", "s", "id");

        assert!(store.set_watermark(&key, &CursorValue::Int(3)).await.unwrap());
        assert!(!store.set_watermark(&key, &CursorValue::Int(2)).await.unwrap());
        assert!(store.set_watermark(&key, &CursorValue::Int(4)).await.unwrap());
        assert_eq!(store.get_watermark(&key).await.unwrap(), Some(CursorValue::Int(4)));
        assert_eq!(store.list_watermarks("p").await.unwrap().len(), 1);
        assert!(store.list_watermarks("other").await.unwrap().is_empty());
    }
}
