use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::catalog::descriptor::{
    ColumnDescriptor, DatabaseDescriptor, PartitionDescriptor, StorageDescriptor,
    TableDescriptor, PARTITION_KEY, PARTITION_KEY_TYPE,
};
use crate::catalog::locator::{TableLocator, TableLocatorFactory};
use crate::catalog::naming::DatabaseNameResolver;
use crate::catalog::CatalogResult;
use crate::schema::Schema;

/// Consolidation state of one date partition, as recorded by the merge job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Live,
    Merged { manifest_version: i64 },
}

impl LifecycleState {
    /// A partition only reads from its merged manifest once the merge job has both
    /// produced a manifest and switched the partition over to it.
    pub fn from_flags(is_switched: bool, manifest_version: i64) -> Self {
        if manifest_version > 0 && is_switched {
            LifecycleState::Merged { manifest_version }
        } else {
            LifecycleState::Live
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertPartitionRequest {
    pub database_name: String,
    pub table_name: String,
    pub partition: PartitionDescriptor,
}

/// A table as it should appear in the catalog.
///
/// Builds the database, table and partition descriptors for a single table; holds no
/// state beyond its inputs.
#[derive(Debug, Clone)]
pub struct CatalogTable {
    schema: Arc<Schema>,
    database_name: String,
    locator: Arc<dyn TableLocator>,
}

impl CatalogTable {
    pub fn new(
        schema: Arc<Schema>,
        database_name: impl Into<String>,
        locator: Arc<dyn TableLocator>,
    ) -> Self {
        Self {
            schema,
            database_name: database_name.into(),
            locator,
        }
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn table_name(&self) -> &str {
        &self.schema.table_name
    }

    pub fn build_database_descriptor(&self) -> DatabaseDescriptor {
        DatabaseDescriptor {
            name: self.database_name.clone(),
        }
    }

    pub fn build_table_descriptor(&self) -> TableDescriptor {
        let columns = self
            .schema
            .columns
            .iter()
            .map(|col| ColumnDescriptor::new(&col.name, col.value_type.to_string()))
            .collect();

        TableDescriptor {
            name: self.schema.table_name.clone(),
            partition_keys: vec![ColumnDescriptor::new(PARTITION_KEY, PARTITION_KEY_TYPE)],
            storage_descriptor: StorageDescriptor::parquet(
                self.locator.table_location(),
                columns,
            ),
            parameters: BTreeMap::from([(
                "classification".to_string(),
                "parquet".to_string(),
            )]),
        }
    }

    // Partition columns are inherited from the table, so none are declared here
    pub fn build_partition_descriptor(
        &self,
        dt: NaiveDate,
        is_switched: bool,
        manifest_version: i64,
    ) -> PartitionDescriptor {
        let state = LifecycleState::from_flags(is_switched, manifest_version);

        PartitionDescriptor {
            values: vec![self.locator.format_dt(dt)],
            storage_descriptor: StorageDescriptor::parquet(
                self.locator.partition_location(dt, state),
                vec![],
            ),
        }
    }

    pub fn build_upsert_partition_request(
        &self,
        dt: NaiveDate,
        is_switched: bool,
        manifest_version: i64,
    ) -> UpsertPartitionRequest {
        UpsertPartitionRequest {
            database_name: self.database_name.clone(),
            table_name: self.schema.table_name.clone(),
            partition: self.build_partition_descriptor(dt, is_switched, manifest_version),
        }
    }
}

/// Binds schemas to their catalog database and storage layout.
#[derive(Clone)]
pub struct CatalogTableFactory {
    database_names: Arc<dyn DatabaseNameResolver>,
    locators: TableLocatorFactory,
}

impl CatalogTableFactory {
    pub fn new(
        database_names: Arc<dyn DatabaseNameResolver>,
        locators: TableLocatorFactory,
    ) -> Self {
        Self {
            database_names,
            locators,
        }
    }

    pub fn build(&self, schema: Arc<Schema>) -> CatalogResult<CatalogTable> {
        let database_name = self.database_names.database_name(&schema.schema_name);
        let locator = Arc::new(self.locators.build(&schema)?);

        Ok(CatalogTable::new(schema, database_name, locator))
    }
}
