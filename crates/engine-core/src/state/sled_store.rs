use crate::{
    error::StateStoreError,
    state::{WatermarkStore, advances},
};
use async_trait::async_trait;
use model::state::{
    cursor::CursorValue,
    watermark::{WatermarkKey, WatermarkRecord},
};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::debug;

pub struct SledWatermarkStore {
    db: sled::Db,
}

impl SledWatermarkStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn wm_key(key: &WatermarkKey) -> String {
        format!("wm:{}:{}:{}", key.pipeline, key.source, key.cursor_field)
    }

    fn decode(bytes: &[u8]) -> Result<WatermarkRecord, StateStoreError> {
        bincode::deserialize(bytes).map_err(|e| StateStoreError::Codec(e.to_string()))
    }
}

#[async_trait]
impl WatermarkStore for SledWatermarkStore {
    async fn get_watermark(
        &self,
        key: &WatermarkKey,
    ) -> Result<Option<CursorValue>, StateStoreError> {
        let bytes = self
            .db
            .get(Self::wm_key(key))
            .map_err(|e| StateStoreError::LoadWatermark(e.to_string()))?;
        match bytes {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?.value)),
            None => Ok(None),
        }
    }

    async fn set_watermark(
        &self,
        key: &WatermarkKey,
        value: &CursorValue,
    ) -> Result<bool, StateStoreError> {
        let db_key = Self::wm_key(key);
        let record = WatermarkRecord {
            key: key.clone(),
            value: value.clone(),
            updated_at: chrono::Utc::now(),
        };
        let new_bytes =
            bincode::serialize(&record).map_err(|e| StateStoreError::Codec(e.to_string()))?;

        // Check-then-set inside a transaction so concurrent writers cannot
        // interleave and move the watermark backwards.
        let result = self.db.transaction::<_, _, StateStoreError>(|tx_db| {
            if let Some(existing_bytes) = tx_db.get(db_key.as_bytes())? {
                let existing =
                    Self::decode(&existing_bytes).map_err(ConflictableTransactionError::Abort)?;
                if !advances(Some(&existing.value), value) {
                    // Intentionally skip update, not an error.
                    return Ok(false);
                }
            }

            tx_db.insert(db_key.as_bytes(), new_bytes.as_slice())?;
            Ok(true)
        });

        match result {
            Ok(changed) => {
                debug!(watermark = %key, value = %value, changed, "Watermark write");
                Ok(changed)
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(StateStoreError::SaveWatermark(e.to_string())),
        }
    }

    async fn list_watermarks(
        &self,
        pipeline: &str,
    ) -> Result<Vec<WatermarkRecord>, StateStoreError> {
        let prefix = format!("wm:{}:", pipeline);
        let mut records = Vec::new();

        for item in self.db.scan_prefix(prefix) {
            let (_key, value) = item.map_err(|e| StateStoreError::LoadWatermark(e.to_string()))?;
            let record = Self::decode(&value)?;
            // Prefix scans also match pipelines whose name extends this one.
            if record.key.pipeline == pipeline {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn clear_watermark(&self, key: &WatermarkKey) -> Result<bool, StateStoreError> {
        let removed = self
            .db
            .remove(Self::wm_key(key))
            .map_err(|e| StateStoreError::ClearWatermark(e.to_string()))?;
        Ok(removed.is_some())
    }
}
