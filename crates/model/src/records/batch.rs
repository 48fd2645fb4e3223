use crate::{
    core::data_type::DataType,
    records::{
        row::RowData,
        schema::{ColumnDef, TableSchema},
    },
};
use serde::{Deserialize, Serialize};

/// One complete read result: the columns the connector reported and the rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<RowData>,
}

impl Batch {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<RowData>) -> Self {
        Batch { columns, rows }
    }

    /// Builds a batch whose column types are inferred from the non-null
    /// values of each column. A column widens when a later value needs a
    /// wider type (integers into doubles); values that fit neither way are
    /// left for [`Batch::conflicting_columns`] to report.
    pub fn from_rows(rows: Vec<RowData>) -> Self {
        let mut columns: Vec<ColumnDef> = Vec::new();
        for row in &rows {
            for field in &row.field_values {
                let value_type = field.value.data_type();
                match columns
                    .iter_mut()
                    .find(|c| c.name.eq_ignore_ascii_case(&field.name))
                {
                    Some(col) if col.data_type == DataType::Null => {
                        col.data_type = value_type;
                    }
                    Some(col) => {
                        if !value_type.is_compatible(&col.data_type)
                            && col.data_type.is_compatible(&value_type)
                        {
                            col.data_type = value_type;
                        }
                    }
                    None => columns.push(ColumnDef::new(
                        field.name.clone(),
                        field.value.data_type(),
                    )),
                }
            }
        }
        Batch { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Columns holding at least one non-null value whose type cannot be
    /// written into the column's declared type.
    pub fn conflicting_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|col| {
                self.rows.iter().any(|row| {
                    let value_type = row.get_value(&col.name).data_type();
                    !value_type.is_compatible(&col.data_type)
                })
            })
            .map(|col| col.name.clone())
            .collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn schema(&self, table: &str) -> TableSchema {
        TableSchema::new(table, self.columns.clone())
    }
}
