use crate::error::LoadError;
use engine_core::{connectors::connector::Connector, state::WatermarkStore};
use model::{
    execution::{errors::DefinitionError, pipeline::SourceDefinition},
    records::batch::Batch,
    state::{cursor::CursorValue, watermark::WatermarkKey},
};
use std::cmp::Ordering;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    NotStarted,
    WatermarkRetrieved,
    Read,
    WatermarkAdvanced,
    ReadFailed,
}

/// Watermark-driven read of one incremental source.
///
/// The new cursor is only held as pending after the read; it reaches the
/// store through [`IncrementalSync::advance`], which the caller invokes once
/// the rows have been applied.
#[derive(Debug)]
pub struct IncrementalSync {
    key: WatermarkKey,
    object_id: String,
    state: SyncState,
    prior: Option<CursorValue>,
    pending: Option<CursorValue>,
    full_read_fallback: bool,
}

impl IncrementalSync {
    pub fn new(pipeline: &str, source: &SourceDefinition) -> Result<Self, LoadError> {
        let cursor_field = source
            .cursor_field
            .clone()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| DefinitionError::MissingCursorField {
                source_name: source.name.clone(),
            })?;

        Ok(IncrementalSync {
            key: WatermarkKey::new(pipeline, &source.name, cursor_field),
            object_id: source.object_id().to_string(),
            state: SyncState::NotStarted,
            prior: None,
            pending: None,
            full_read_fallback: false,
        })
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn key(&self) -> &WatermarkKey {
        &self.key
    }

    pub fn prior(&self) -> Option<&CursorValue> {
        self.prior.as_ref()
    }

    pub fn pending(&self) -> Option<&CursorValue> {
        self.pending.as_ref()
    }

    /// True when the connector could not read incrementally and the whole
    /// object was read instead.
    pub fn used_full_read(&self) -> bool {
        self.full_read_fallback
    }

    pub async fn retrieve(
        &mut self,
        store: &dyn WatermarkStore,
    ) -> Result<Option<&CursorValue>, LoadError> {
        self.prior = store.get_watermark(&self.key).await?;
        self.state = SyncState::WatermarkRetrieved;
        debug!(watermark = %self.key, prior = ?self.prior, "Watermark retrieved");
        Ok(self.prior.as_ref())
    }

    pub async fn read(
        &mut self,
        connector: &dyn Connector,
        batch_size: usize,
    ) -> Result<Batch, LoadError> {
        let result = if connector.supports_incremental() {
            match connector
                .read_incremental(
                    &self.object_id,
                    &self.key.cursor_field,
                    self.prior.as_ref(),
                    batch_size,
                )
                .await
            {
                Err(e) if e.is_unsupported() => self.read_full(connector).await,
                other => other.map_err(LoadError::from),
            }
        } else {
            self.read_full(connector).await
        };

        let batch = match result {
            Ok(batch) => batch,
            Err(e) => {
                self.state = SyncState::ReadFailed;
                self.pending = None;
                return Err(e);
            }
        };

        if !self.full_read_fallback {
            self.pending = connector
                .cursor_value(&batch, &self.key.cursor_field)
                .filter(|next| match &self.prior {
                    Some(prior) => next.partial_cmp(prior) == Some(Ordering::Greater),
                    None => true,
                });
        }
        self.state = SyncState::Read;
        debug!(
            watermark = %self.key,
            rows = batch.len(),
            pending = ?self.pending,
            "Incremental read complete"
        );
        Ok(batch)
    }

    /// Commits the pending cursor. Only valid after a successful read.
    pub async fn advance(
        &mut self,
        store: &dyn WatermarkStore,
    ) -> Result<Option<CursorValue>, LoadError> {
        if self.state != SyncState::Read {
            return Ok(None);
        }

        let committed = match self.pending.take() {
            Some(next) => {
                if store.set_watermark(&self.key, &next).await? {
                    info!(watermark = %self.key, value = %next, "Watermark advanced");
                    Some(next)
                } else {
                    None
                }
            }
            None => None,
        };
        self.state = SyncState::WatermarkAdvanced;
        Ok(committed)
    }

    async fn read_full(&mut self, connector: &dyn Connector) -> Result<Batch, LoadError> {
        info!(
            source = %self.key.source,
            connector = connector.name(),
            "Connector has no incremental support, reading full source"
        );
        self.full_read_fallback = true;
        Ok(connector.read(&self.object_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use engine_core::{
        connectors::memory::MemoryConnector, error::ConnectorError,
        state::memory::InMemoryWatermarkStore,
    };
    use model::{core::value::Value, records::row::RowData};
    use tracing_test::traced_test;

    struct BrokenConnector;

    #[async_trait]
    impl Connector for BrokenConnector {
        fn name(&self) -> &str {
            "broken"
        }

        async fn read(&self, _object_id: &str) -> Result<Batch, ConnectorError> {
            Err(ConnectorError::Read("connection reset".into()))
        }

        fn supports_incremental(&self) -> bool {
            true
        }

        async fn read_incremental(
            &self,
            _object_id: &str,
            _cursor_field: &str,
            _after: Option<&CursorValue>,
            _batch_size: usize,
        ) -> Result<Batch, ConnectorError> {
            Err(ConnectorError::Read("connection reset".into()))
        }
    }

    fn source() -> SourceDefinition {
        SourceDefinition::new("events", "memory").incremental("seq")
    }

    fn rows(range: std::ops::RangeInclusive<i64>) -> Vec<RowData> {
        range
            .map(|i| RowData::from_pairs([("seq", Value::Int(i))]))
            .collect()
    }

    #[tokio::test]
    async fn walks_the_state_machine() {
        let store = InMemoryWatermarkStore::new();
        let conn = MemoryConnector::new("memory");
        conn.put_rows("events", rows(1..=5)).await;

        let mut sync = IncrementalSync::new("p", &source()).unwrap();
        assert_eq!(sync.state(), SyncState::NotStarted);

        assert_eq!(sync.retrieve(&store).await.unwrap(), None);
        assert_eq!(sync.state(), SyncState::WatermarkRetrieved);

        let batch = sync.read(&conn, 100).await.unwrap();
        assert_eq!(batch.len(), 5);
        assert_eq!(sync.state(), SyncState::Read);
        // Nothing is stored until the caller advances.
        assert_eq!(store.get_watermark(sync.key()).await.unwrap(), None);

        assert_eq!(sync.advance(&store).await.unwrap(), Some(CursorValue::Int(5)));
        assert_eq!(sync.state(), SyncState::WatermarkAdvanced);
        assert_eq!(
            store.get_watermark(sync.key()).await.unwrap(),
            Some(CursorValue::Int(5))
        );
    }

    #[tokio::test]
    async fn failed_read_leaves_watermark_untouched() {
        let store = InMemoryWatermarkStore::new();
        let key = WatermarkKey::new("p", "events", "seq");
        store.set_watermark(&key, &CursorValue::Int(3)).await.unwrap();

        let mut sync = IncrementalSync::new("p", &source()).unwrap();
        sync.retrieve(&store).await.unwrap();
        assert!(matches!(
            sync.read(&BrokenConnector, 10).await,
            Err(LoadError::Connector(_))
        ));
        assert_eq!(sync.state(), SyncState::ReadFailed);
        assert_eq!(sync.advance(&store).await.unwrap(), None);

        assert_eq!(
            store.get_watermark(&key).await.unwrap(),
            Some(CursorValue::Int(3))
        );
    }

    #[tokio::test]
    async fn resumes_after_prior_watermark() {
        let store = InMemoryWatermarkStore::new();
        let conn = MemoryConnector::new("memory");
        conn.put_rows("events", rows(1..=5)).await;
        store
            .set_watermark(&WatermarkKey::new("p", "events", "seq"), &CursorValue::Int(3))
            .await
            .unwrap();

        let mut sync = IncrementalSync::new("p", &source()).unwrap();
        sync.retrieve(&store).await.unwrap();
        let batch = sync.read(&conn, 100).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(sync.pending(), Some(&CursorValue::Int(5)));
    }

    #[tokio::test]
    #[traced_test]
    async fn falls_back_to_full_read_without_touching_watermark() {
        let store = InMemoryWatermarkStore::new();
        let conn = MemoryConnector::new("memory").without_incremental();
        conn.put_rows("events", rows(1..=4)).await;

        let mut sync = IncrementalSync::new("p", &source()).unwrap();
        sync.retrieve(&store).await.unwrap();
        let batch = sync.read(&conn, 2).await.unwrap();

        assert_eq!(batch.len(), 4);
        assert!(sync.used_full_read());
        assert_eq!(sync.advance(&store).await.unwrap(), None);
        assert_eq!(store.get_watermark(sync.key()).await.unwrap(), None);
        assert!(logs_contain("reading full source"));
    }

    #[test]
    fn requires_cursor_field() {
        let mut def = SourceDefinition::new("events", "memory");
        def.sync_mode = model::execution::pipeline::SyncMode::Incremental;
        assert!(matches!(
            IncrementalSync::new("p", &def),
            Err(LoadError::InvalidDefinition(_))
        ));
    }
}
