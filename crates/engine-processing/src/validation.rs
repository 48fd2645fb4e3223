use crate::error::LoadError;
use model::{
    core::data_type::DataType,
    records::{batch::Batch, schema::TableSchema},
};

/// Every source column must exist in the target with a compatible type.
/// Target columns the source lacks are filled with nulls on insert.
pub fn check_append(target: &TableSchema, batch: &Batch) -> Result<(), LoadError> {
    let missing: Vec<String> = batch
        .columns
        .iter()
        .filter(|c| !target.has_column(&c.name))
        .map(|c| c.name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            table: target.name.clone(),
            columns: missing,
        });
    }

    let conflicting = batch.conflicting_columns();
    let mismatched: Vec<String> = batch
        .columns
        .iter()
        .filter(|c| {
            conflicting.contains(&c.name)
                || target
                    .column(&c.name)
                    .is_some_and(|t| !values_fit(batch, &c.name, &t.data_type))
        })
        .map(|c| c.name.clone())
        .collect();
    if !mismatched.is_empty() {
        return Err(LoadError::TypeMismatch {
            table: target.name.clone(),
            columns: mismatched,
        });
    }

    Ok(())
}

fn values_fit(batch: &Batch, column: &str, data_type: &DataType) -> bool {
    batch.column(column).is_none_or(|c| c.data_type.is_compatible(data_type))
        && batch
            .rows
            .iter()
            .all(|row| row.get_value(column).data_type().is_compatible(data_type))
}

/// A replacement table takes the batch's own column types, so every value
/// must fit the type its column was given.
pub fn check_replace(table: &str, batch: &Batch) -> Result<(), LoadError> {
    let conflicting = batch.conflicting_columns();
    if !conflicting.is_empty() {
        return Err(LoadError::TypeMismatch {
            table: table.to_string(),
            columns: conflicting,
        });
    }
    Ok(())
}

/// Merge keys must be present on both sides with compatible types; the
/// remaining columns follow the append rules.
pub fn check_merge(target: &TableSchema, batch: &Batch, keys: &[String]) -> Result<(), LoadError> {
    let bad_keys: Vec<String> = keys
        .iter()
        .filter(|key| match (batch.column(key), target.column(key)) {
            (Some(src), Some(dst)) => !src.data_type.is_compatible(&dst.data_type),
            _ => true,
        })
        .cloned()
        .collect();
    if !bad_keys.is_empty() {
        return Err(LoadError::MergeKeyMismatch {
            table: target.name.clone(),
            columns: bad_keys,
        });
    }

    check_append(target, batch)
}
