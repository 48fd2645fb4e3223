use crate::error::StateStoreError;
use async_trait::async_trait;
use model::state::{
    cursor::CursorValue,
    watermark::{WatermarkKey, WatermarkRecord},
};
use std::cmp::Ordering;

pub mod memory;
pub mod sled_store;

/// Durable per-source progress for incremental reads.
///
/// A stored watermark never moves backwards: `set_watermark` with a value that
/// is not strictly greater than the stored one is skipped, not rejected.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn get_watermark(&self, key: &WatermarkKey)
    -> Result<Option<CursorValue>, StateStoreError>;

    /// Returns `true` when the stored value changed.
    async fn set_watermark(
        &self,
        key: &WatermarkKey,
        value: &CursorValue,
    ) -> Result<bool, StateStoreError>;

    async fn list_watermarks(&self, pipeline: &str)
    -> Result<Vec<WatermarkRecord>, StateStoreError>;

    /// Returns `true` when a watermark was removed.
    async fn clear_watermark(&self, key: &WatermarkKey) -> Result<bool, StateStoreError>;
}

/// Whether `candidate` may replace `existing`.
pub(crate) fn advances(existing: Option<&CursorValue>, candidate: &CursorValue) -> bool {
    match existing {
        None => true,
        Some(existing) => candidate.partial_cmp(existing) == Some(Ordering::Greater),
    }
}
