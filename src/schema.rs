use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Logical column types; the `Display` form is the catalog (Hive DDL) type name.
#[derive(
    Serialize, Deserialize, Debug, PartialEq, Eq, Hash, EnumString, Display, Clone, Copy,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Smallint,
    Int,
    Bigint,
    Float,
    Double,
    String,
    Date,
    Timestamp,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Column {
    pub name: String,
    pub value_type: ValueType,
}

impl Column {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

/// Table schema as supplied by the upstream table registry.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Schema {
    // Logical schema the table belongs to; the catalog database name is derived from it
    pub schema_name: String,
    pub table_name: String,
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        columns: Vec<Column>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            columns,
        }
    }
}
