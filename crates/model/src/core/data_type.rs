use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DataType {
    Short,
    Int,
    Long,
    LongUnsigned,
    Float,
    Double,
    Decimal,
    Boolean,
    Char,
    VarChar,
    String,
    Json,
    Bytes,
    Date,
    Timestamp,
    Null,
    Custom(String),
}

lazy_static! {
    static ref TYPE_NAMES: HashMap<&'static str, DataType> = build_type_map();
}

impl DataType {
    pub fn sql_name(&self) -> &str {
        match self {
            DataType::Short => "SMALLINT",
            DataType::Int => "INTEGER",
            DataType::Long => "BIGINT",
            DataType::LongUnsigned => "UBIGINT",
            DataType::Float => "REAL",
            DataType::Double => "DOUBLE",
            DataType::Decimal => "DECIMAL",
            DataType::Boolean => "BOOLEAN",
            DataType::Char => "CHAR",
            DataType::VarChar => "VARCHAR",
            DataType::String => "TEXT",
            DataType::Json => "JSON",
            DataType::Bytes => "BLOB",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Null => "NULL",
            DataType::Custom(name) => name,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Short | DataType::Int | DataType::Long | DataType::LongUnsigned
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(self, DataType::Float | DataType::Double | DataType::Decimal)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::Char | DataType::VarChar | DataType::String)
    }

    /// Whether values of `self` can be written into a column of type `other`
    /// without a lossy coercion. `Null` is compatible with everything.
    pub fn is_compatible(&self, other: &DataType) -> bool {
        match (self, other) {
            (DataType::Null, _) | (_, DataType::Null) => true,
            (a, b) if a.is_integer() && b.is_integer() => true,
            (a, b) if a.is_integer() && b.is_numeric() => true,
            (DataType::Float, DataType::Double) | (DataType::Double, DataType::Float) => true,
            (DataType::Float | DataType::Double, DataType::Decimal)
            | (DataType::Decimal, DataType::Float | DataType::Double) => true,
            (a, b) if a.is_textual() && b.is_textual() => true,
            (DataType::Date, DataType::Timestamp) | (DataType::Timestamp, DataType::Date) => true,
            _ => self == other,
        }
    }

    fn normalize_type_name(type_name: &str) -> String {
        type_name.trim().to_uppercase()
    }
}

impl TryFrom<&str> for DataType {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let normalized = Self::normalize_type_name(s);
        if normalized.is_empty() {
            return Err(format!("Unknown column type: {s}"));
        }
        Ok(TYPE_NAMES
            .get(normalized.as_str())
            .cloned()
            .unwrap_or(DataType::Custom(normalized)))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

fn build_type_map() -> HashMap<&'static str, DataType> {
    use DataType::*;

    let entries = [
        ("TINYINT", Short),
        ("SMALLINT", Short),
        ("INT2", Short),
        ("INT", Int),
        ("INTEGER", Int),
        ("INT4", Int),
        ("BIGINT", Long),
        ("INT8", Long),
        ("UBIGINT", LongUnsigned),
        ("BIGINT UNSIGNED", LongUnsigned),
        ("REAL", Float),
        ("FLOAT", Float),
        ("FLOAT4", Float),
        ("DOUBLE", Double),
        ("DOUBLE PRECISION", Double),
        ("FLOAT8", Double),
        ("DECIMAL", Decimal),
        ("NUMERIC", Decimal),
        ("BOOLEAN", Boolean),
        ("BOOL", Boolean),
        ("CHAR", Char),
        ("CHARACTER", Char),
        ("VARCHAR", VarChar),
        ("CHARACTER VARYING", VarChar),
        ("TEXT", String),
        ("STRING", String),
        ("JSON", Json),
        ("JSONB", Json),
        ("BLOB", Bytes),
        ("BYTEA", Bytes),
        ("VARBINARY", Bytes),
        ("DATE", Date),
        ("TIMESTAMP", Timestamp),
        ("DATETIME", Timestamp),
        ("TIMESTAMPTZ", Timestamp),
        ("NULL", Null),
    ];

    entries.into_iter().collect()
}
