//! Catalog-side descriptors for databases, tables and partitions.
//!
//! These mirror the shape of a Hive-style metastore: a table carries a storage
//! descriptor (location, columns, input/output format and serde) plus a single
//! `dt` partition key; each partition carries its own storage descriptor whose
//! columns are inherited from the table.
use std::collections::BTreeMap;

pub const PARQUET_INPUT_FORMAT: &str =
    "org.apache.hadoop.hive.ql.io.parquet.MapredParquetInputFormat";
pub const PARQUET_OUTPUT_FORMAT: &str =
    "org.apache.hadoop.hive.ql.io.parquet.MapredParquetOutputFormat";
pub const PARQUET_SERDE: &str =
    "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe";

pub const PARTITION_KEY: &str = "dt";
pub const PARTITION_KEY_TYPE: &str = "date";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseDescriptor {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_name: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SerDeInfo {
    pub serialization_library: Option<String>,
    pub parameters: BTreeMap<String, String>,
}

impl SerDeInfo {
    pub fn parquet() -> Self {
        Self {
            serialization_library: Some(PARQUET_SERDE.to_string()),
            parameters: BTreeMap::from([(
                "serialization.format".to_string(),
                "1".to_string(),
            )]),
        }
    }
}

/// Fields are optional since descriptors read back from a remote catalog may omit them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageDescriptor {
    pub columns: Vec<ColumnDescriptor>,
    pub location: Option<String>,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub serde_info: Option<SerDeInfo>,
}

impl StorageDescriptor {
    pub fn parquet(location: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            location: Some(location.into()),
            input_format: Some(PARQUET_INPUT_FORMAT.to_string()),
            output_format: Some(PARQUET_OUTPUT_FORMAT.to_string()),
            serde_info: Some(SerDeInfo::parquet()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub partition_keys: Vec<ColumnDescriptor>,
    pub storage_descriptor: StorageDescriptor,
    pub parameters: BTreeMap<String, String>,
}

impl TableDescriptor {
    /// Whether an existing catalog table already satisfies the desired descriptor.
    ///
    /// Only the columns, location, input format and serde info are compared. Table
    /// parameters, the output format and partition keys are ignored.
    pub fn matches(&self, desired: &TableDescriptor) -> bool {
        let actual = &self.storage_descriptor;
        let expected = &desired.storage_descriptor;

        actual.columns == expected.columns
            && actual.location == expected.location
            && actual.input_format == expected.input_format
            && actual.serde_info == expected.serde_info
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDescriptor {
    pub values: Vec<String>,
    pub storage_descriptor: StorageDescriptor,
}
