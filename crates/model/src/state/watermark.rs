use crate::state::cursor::CursorValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a watermark: one per (pipeline, source, cursor field).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatermarkKey {
    pub pipeline: String,
    pub source: String,
    pub cursor_field: String,
}

impl WatermarkKey {
    pub fn new(
        pipeline: impl Into<String>,
        source: impl Into<String>,
        cursor_field: impl Into<String>,
    ) -> Self {
        WatermarkKey {
            pipeline: pipeline.into(),
            source: source.into(),
            cursor_field: cursor_field.into(),
        }
    }
}

impl fmt::Display for WatermarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.pipeline, self.source, self.cursor_field)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WatermarkRecord {
    pub key: WatermarkKey,
    pub value: CursorValue,
    pub updated_at: DateTime<Utc>,
}
