use crate::error::CliError;
use engine_core::connectors::{memory::MemoryConnector, registry::ConnectorRegistry};
use model::{core::value::Value, execution::plan::Variables, records::row::RowData};
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path, sync::Arc};

type JsonRow = serde_json::Map<String, serde_json::Value>;

/// Seed file for `sluice run`: rows per object, grouped by connector type.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct SeedData(BTreeMap<String, BTreeMap<String, Vec<JsonRow>>>);

impl SeedData {
    pub fn read(path: &Path) -> Result<Self, CliError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn into_connectors(self) -> ConnectorRegistry {
        let mut registry = ConnectorRegistry::new();
        for (connector_type, objects) in self.0 {
            let connector = MemoryConnector::new(connector_type.clone());
            for (object_id, rows) in objects {
                connector
                    .put_rows(&object_id, rows.into_iter().map(to_row).collect())
                    .await;
            }
            registry.register(connector_type, Arc::new(connector));
        }
        registry
    }
}

fn to_row(row: JsonRow) -> RowData {
    RowData::from_pairs(row.into_iter().map(|(k, v)| (k, Value::from(v))))
}

pub fn read_variables(path: &Path) -> Result<Variables, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let vars: BTreeMap<String, serde_json::Value> = serde_json::from_str(&raw)?;
    Ok(vars.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::connectors::connector::ConnectorProvider;

    #[tokio::test]
    async fn seeds_memory_connectors() {
        let seed: SeedData = serde_json::from_str(
            r#"{"memory": {"orders": [{"id": 1, "status": "new"}, {"id": 2, "status": "paid"}]}}"#,
        )
        .unwrap();
        let registry = seed.into_connectors().await;

        let connector = registry.connector("memory").unwrap();
        let batch = connector.read("orders").await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows[1].get_value("status"), Value::String("paid".into()));
    }

    #[test]
    fn reads_variables_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.json");
        std::fs::write(&path, r#"{"cutoff": "2024-01-01", "limit": 10}"#).unwrap();

        let vars = read_variables(&path).unwrap();
        assert_eq!(vars["cutoff"], Value::String("2024-01-01".into()));
        assert_eq!(vars["limit"], Value::Int(10));
    }
}
