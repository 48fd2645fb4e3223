use crate::error::ConnectorError;
use async_trait::async_trait;
use model::{records::batch::Batch, state::cursor::CursorValue};

/// Reads (and optionally writes) objects of one external system.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    /// Full read of `object_id`.
    async fn read(&self, object_id: &str) -> Result<Batch, ConnectorError>;

    fn supports_incremental(&self) -> bool {
        false
    }

    /// Rows whose `cursor_field` is strictly greater than `after`, in
    /// ascending cursor order, at most `batch_size` of them.
    async fn read_incremental(
        &self,
        _object_id: &str,
        _cursor_field: &str,
        _after: Option<&CursorValue>,
        _batch_size: usize,
    ) -> Result<Batch, ConnectorError> {
        Err(ConnectorError::Unsupported {
            connector: self.name().to_string(),
            operation: "incremental reads",
        })
    }

    /// The cursor position reached by `batch`.
    fn cursor_value(&self, batch: &Batch, cursor_field: &str) -> Option<CursorValue> {
        max_cursor(batch, cursor_field)
    }

    /// Writes `batch` to `object_id`, returning the number of rows written.
    async fn write(&self, _object_id: &str, _batch: Batch) -> Result<u64, ConnectorError> {
        Err(ConnectorError::Unsupported {
            connector: self.name().to_string(),
            operation: "writes",
        })
    }
}

/// Resolves the connector for a source's `connector_type`.
pub trait ConnectorProvider: Send + Sync {
    fn connector(
        &self,
        connector_type: &str,
    ) -> Result<std::sync::Arc<dyn Connector>, ConnectorError>;
}

/// Highest cursor value present in `batch`. Null and non-cursor values are skipped.
pub fn max_cursor(batch: &Batch, cursor_field: &str) -> Option<CursorValue> {
    batch
        .rows
        .iter()
        .filter_map(|row| CursorValue::from_value(&row.get_value(cursor_field)))
        .reduce(CursorValue::max_with)
}
