#![allow(dead_code)]

use crate::MEMORY;
use model::{
    core::{data_type::DataType, value::Value},
    execution::{
        pipeline::{LoadMode, LoadStep, PipelineStep, SourceDefinition, StepKind, TransformStep},
        plan::ExecutionPlan,
    },
    records::{
        row::RowData,
        schema::{ColumnDef, TableSchema},
    },
};

pub const PIPELINE: &str = "orders_pipeline";

pub fn source(id: &str, name: &str) -> PipelineStep {
    PipelineStep::new(id, StepKind::Source(SourceDefinition::new(name, MEMORY)))
}

pub fn incremental_source(id: &str, name: &str, cursor_field: &str) -> PipelineStep {
    PipelineStep::new(
        id,
        StepKind::Source(SourceDefinition::new(name, MEMORY).incremental(cursor_field)),
    )
}

pub fn load(id: &str, table: &str, source_name: &str, mode: LoadMode) -> PipelineStep {
    PipelineStep::new(id, StepKind::Load(LoadStep::new(table, source_name, mode)))
}

pub fn merge(id: &str, table: &str, source_name: &str, keys: &[&str]) -> PipelineStep {
    PipelineStep::new(
        id,
        StepKind::Load(
            LoadStep::new(table, source_name, LoadMode::Merge).with_merge_keys(keys.iter().copied()),
        ),
    )
}

pub fn transform(id: &str, sql: &str) -> PipelineStep {
    PipelineStep::new(
        id,
        StepKind::Transform(TransformStep {
            target_table: None,
            sql: sql.to_string(),
        }),
    )
}

pub fn plan(steps: Vec<PipelineStep>) -> ExecutionPlan {
    ExecutionPlan::new(PIPELINE, steps)
}

/// Rows of `(id, name)` pairs.
pub fn people(rows: &[(i64, &str)]) -> Vec<RowData> {
    rows.iter()
        .map(|(id, name)| {
            RowData::from_pairs([("id", Value::Int(*id)), ("name", Value::from(*name))])
        })
        .collect()
}

/// Rows carrying an `updated_at` cursor column.
pub fn events(cursors: &[i64]) -> Vec<RowData> {
    cursors
        .iter()
        .map(|c| {
            RowData::from_pairs([
                ("event_id", Value::Int(*c)),
                ("updated_at", Value::Int(*c)),
            ])
        })
        .collect()
}

pub fn people_table(name: &str, extra: &[(&str, DataType)]) -> TableSchema {
    let mut columns = vec![
        ColumnDef::new("id", DataType::Long),
        ColumnDef::new("name", DataType::String),
    ];
    columns.extend(extra.iter().map(|(n, t)| ColumnDef::new(*n, t.clone())));
    TableSchema::new(name, columns)
}

/// Sorted values of `column` across `rows`.
pub fn column_values(rows: &[RowData], column: &str) -> Vec<Value> {
    let mut values: Vec<Value> = rows.iter().map(|r| r.get_value(column)).collect();
    values.sort_by(|a, b| a.compare(b).unwrap_or(std::cmp::Ordering::Equal));
    values
}

pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::Int(*v)).collect()
}
