use crate::execution::errors::DefinitionError;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// One compiled step of a pipeline, read-only to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub id: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Load(LoadStep),
    Transform(TransformStep),
    Export(ExportStep),
    Source(SourceDefinition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Load,
    Transform,
    Export,
    Source,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Load => "load",
            StepType::Transform => "transform",
            StepType::Export => "export",
            StepType::Source => "source",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PipelineStep {
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        PipelineStep {
            id: id.into(),
            depends_on: Vec::new(),
            kind,
        }
    }

    pub fn after<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn step_type(&self) -> StepType {
        match &self.kind {
            StepKind::Load(_) => StepType::Load,
            StepKind::Transform(_) => StepType::Transform,
            StepKind::Export(_) => StepType::Export,
            StepKind::Source(_) => StepType::Source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadMode {
    #[serde(alias = "replace")]
    Replace,
    #[serde(alias = "append")]
    Append,
    #[serde(alias = "merge")]
    Merge,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Replace => f.write_str("REPLACE"),
            LoadMode::Append => f.write_str("APPEND"),
            LoadMode::Merge => f.write_str("MERGE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadStep {
    pub table_name: String,
    pub source_name: String,
    pub mode: LoadMode,
    #[serde(default)]
    pub merge_keys: Vec<String>,
}

impl LoadStep {
    pub fn new(table_name: impl Into<String>, source_name: impl Into<String>, mode: LoadMode) -> Self {
        LoadStep {
            table_name: table_name.into(),
            source_name: source_name.into(),
            mode,
            merge_keys: Vec::new(),
        }
    }

    pub fn with_merge_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merge_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Merge keys with duplicates removed, first occurrence wins.
    pub fn ordered_merge_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.merge_keys.len());
        for key in &self.merge_keys {
            if !keys.iter().any(|k| k.eq_ignore_ascii_case(key)) {
                keys.push(key.clone());
            }
        }
        keys
    }

    pub fn validate(&self, step_id: &str) -> Result<(), DefinitionError> {
        if self.table_name.trim().is_empty() {
            return Err(DefinitionError::EmptyField {
                step: step_id.to_string(),
                field: "table_name",
            });
        }
        match (self.mode, self.merge_keys.is_empty()) {
            (LoadMode::Merge, true) => Err(DefinitionError::MissingMergeKeys {
                step: step_id.to_string(),
            }),
            (LoadMode::Replace | LoadMode::Append, false) => {
                Err(DefinitionError::UnexpectedMergeKeys {
                    step: step_id.to_string(),
                    mode: self.mode.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    #[default]
    Full,
    Incremental,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDefinition {
    pub name: String,
    pub connector_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub sync_mode: SyncMode,
    #[serde(default)]
    pub cursor_field: Option<String>,
}

impl SourceDefinition {
    pub fn new(name: impl Into<String>, connector_type: impl Into<String>) -> Self {
        SourceDefinition {
            name: name.into(),
            connector_type: connector_type.into(),
            params: BTreeMap::new(),
            sync_mode: SyncMode::Full,
            cursor_field: None,
        }
    }

    pub fn incremental(mut self, cursor_field: impl Into<String>) -> Self {
        self.sync_mode = SyncMode::Incremental;
        self.cursor_field = Some(cursor_field.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn is_incremental(&self) -> bool {
        self.sync_mode == SyncMode::Incremental
    }

    /// The object the connector reads: an explicit `object`, `table` or `path`
    /// parameter, falling back to the source name.
    pub fn object_id(&self) -> &str {
        ["object", "table", "path"]
            .iter()
            .find_map(|k| self.params.get(*k))
            .map(String::as_str)
            .unwrap_or(self.name.as_str())
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        match (self.sync_mode, self.cursor_field.as_deref()) {
            (SyncMode::Incremental, None) | (SyncMode::Incremental, Some("")) => {
                Err(DefinitionError::MissingCursorField {
                    source_name: self.name.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStep {
    #[serde(default)]
    pub target_table: Option<String>,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportStep {
    pub source_table: String,
    pub connector_type: String,
    pub object_id: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_requires_keys_and_only_merge_accepts_them() {
        let merge = LoadStep::new("t", "s", LoadMode::Merge);
        assert_eq!(
            merge.validate("load_t"),
            Err(DefinitionError::MissingMergeKeys {
                step: "load_t".into()
            })
        );
        assert!(merge.with_merge_keys(["id"]).validate("load_t").is_ok());

        let append = LoadStep::new("t", "s", LoadMode::Append).with_merge_keys(["id"]);
        assert!(matches!(
            append.validate("load_t"),
            Err(DefinitionError::UnexpectedMergeKeys { .. })
        ));
    }

    #[test]
    fn incremental_source_requires_cursor_field() {
        let mut source = SourceDefinition::new("orders", "memory");
        source.sync_mode = SyncMode::Incremental;
        assert!(source.validate().is_err());
        assert!(source.incremental("updated_at").validate().is_ok());
    }

    #[test]
    fn deserializes_tagged_steps() {
        let json = r#"[
            {"id": "src", "type": "source", "name": "orders", "connector_type": "memory",
             "sync_mode": "incremental", "cursor_field": "id"},
            {"id": "load", "type": "load", "depends_on": ["src"], "table_name": "orders",
             "source_name": "orders", "mode": "merge", "merge_keys": ["id"]}
        ]"#;

        let steps: Vec<PipelineStep> = serde_json::from_str(json).unwrap();
        assert_eq!(steps[0].step_type(), StepType::Source);
        match &steps[1].kind {
            StepKind::Load(load) => {
                assert_eq!(load.mode, LoadMode::Merge);
                assert_eq!(load.merge_keys, vec!["id".to_string()]);
            }
            other => panic!("expected load step, got {other:?}"),
        }
        assert_eq!(steps[1].depends_on, vec!["src".to_string()]);
    }

    #[test]
    fn object_id_prefers_explicit_params() {
        let source = SourceDefinition::new("orders", "memory");
        assert_eq!(source.object_id(), "orders");
        assert_eq!(source.with_param("table", "raw.orders").object_id(), "raw.orders");
    }
}
