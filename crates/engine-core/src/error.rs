use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Failed to save watermark: {0}")]
    SaveWatermark(String),

    #[error("Failed to load watermark: {0}")]
    LoadWatermark(String),

    #[error("Failed to clear watermark: {0}")]
    ClearWatermark(String),

    #[error("Failed to decode watermark record: {0}")]
    Codec(String),
}

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("connector '{connector}' does not support {operation}")]
    Unsupported {
        connector: String,
        operation: &'static str,
    },

    #[error("no connector registered for type '{0}'")]
    UnknownConnector(String),

    #[error("object '{0}' not found")]
    ObjectNotFound(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),
}

impl ConnectorError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ConnectorError::Unsupported { .. })
    }
}

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    #[error("statement failed: {0}")]
    Sql(String),

    #[error("warehouse error: {0}")]
    Internal(String),
}
