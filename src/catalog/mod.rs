use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

pub mod descriptor;
pub mod locator;
pub mod memory;
pub mod naming;
pub mod pagination;
pub mod reconciler;
pub mod table;

use crate::catalog::descriptor::{DatabaseDescriptor, PartitionDescriptor, TableDescriptor};
use crate::catalog::pagination::{Page, PageRequest};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{reason}")]
    Generic { reason: String },

    // Database errors
    #[error("Database {name:?} doesn't exist")]
    DatabaseDoesNotExist { name: String },

    #[error("Database {name:?} already exists")]
    DatabaseAlreadyExists { name: String },

    // Table errors
    #[error("Table {name:?} doesn't exist")]
    TableDoesNotExist { name: String },

    #[error("Table {name:?} already exists")]
    TableAlreadyExists { name: String },

    // Partition errors
    #[error("Partition {values:?} of table {table:?} doesn't exist")]
    PartitionDoesNotExist { table: String, values: Vec<String> },

    #[error("Partition {values:?} of table {table:?} already exists")]
    PartitionAlreadyExists { table: String, values: Vec<String> },

    #[error("Catalog method not implemented: {reason}")]
    NotImplemented { reason: String },

    #[error("Failed parsing URL: {0}")]
    UrlParseError(#[from] url::ParseError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

fn not_impl<T>() -> CatalogResult<T> {
    Err(CatalogError::NotImplemented {
        reason: "Catalog store method not supported".to_string(),
    })
}

/// The remote metadata catalog. Implementations wrap a single remote service; all
/// calls are awaited one at a time and no client-side locking is performed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogStore: Sync + Send {
    /// List a single page of database names.
    async fn list_databases(&self, page: PageRequest) -> CatalogResult<Page<String>>;

    /// List a single page of the tables in a database.
    async fn list_tables(
        &self,
        database_name: &str,
        page: PageRequest,
    ) -> CatalogResult<Page<TableDescriptor>>;

    async fn create_database(&self, database: &DatabaseDescriptor) -> CatalogResult<()>;

    async fn create_table(
        &self,
        database_name: &str,
        table: &TableDescriptor,
    ) -> CatalogResult<()>;

    async fn update_table(
        &self,
        database_name: &str,
        table: &TableDescriptor,
    ) -> CatalogResult<()>;

    async fn delete_table(
        &self,
        _database_name: &str,
        _table_name: &str,
    ) -> CatalogResult<()> {
        not_impl()
    }

    /// Fetch a partition; `Ok(None)` means the catalog has no such partition.
    async fn get_partition(
        &self,
        database_name: &str,
        table_name: &str,
        values: &[String],
    ) -> CatalogResult<Option<PartitionDescriptor>>;

    async fn create_partition(
        &self,
        database_name: &str,
        table_name: &str,
        partition: &PartitionDescriptor,
    ) -> CatalogResult<()>;

    async fn update_partition(
        &self,
        database_name: &str,
        table_name: &str,
        values: &[String],
        partition: &PartitionDescriptor,
    ) -> CatalogResult<()>;
}
