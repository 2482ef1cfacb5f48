use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use itertools::Itertools;
use strum_macros::Display;
use tracing::{debug, info};

use crate::catalog::descriptor::{DatabaseDescriptor, TableDescriptor};
use crate::catalog::pagination::{PageRequest, Paginated, MAX_PAGE_SIZE};
use crate::catalog::table::{CatalogTable, UpsertPartitionRequest};
use crate::catalog::{CatalogError, CatalogResult, CatalogStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CatalogOperation {
    CreateDatabase,
    CreateTable,
    UpdateTable,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Failed to {operation} {target}: {source}")]
    CatalogOperation {
        operation: CatalogOperation,
        target: String,
        source: CatalogError,
    },

    #[error("Failed listing {target}: {source}")]
    Listing { target: String, source: CatalogError },
}

pub type ReconcileResult<T, E = ReconcileError> = Result<T, E>;

/// What a single reconciliation run changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub databases_created: usize,
    pub tables_created: usize,
    pub tables_updated: usize,
    pub tables_unchanged: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionUpsert {
    Created,
    Updated,
}

/// Brings the remote catalog in line with a set of desired tables.
///
/// Databases are only ever created. Tables are created when absent and updated when
/// their columns, location, input format or serde info differ from the desired ones.
/// All calls are issued one at a time, and the first failing create or update aborts
/// the rest of the run without undoing what was already applied.
pub struct CatalogReconciler {
    store: Arc<dyn CatalogStore>,
    page_size: usize,
}

impl CatalogReconciler {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            page_size: MAX_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub async fn upsert_tables(
        &self,
        desired: &[CatalogTable],
    ) -> ReconcileResult<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        let databases: Vec<DatabaseDescriptor> = desired
            .iter()
            .map(CatalogTable::build_database_descriptor)
            .unique()
            .sorted()
            .collect();
        summary.databases_created = self.sync_databases(&databases).await?;

        let tables_by_database = desired
            .iter()
            .map(|table| {
                (
                    table.database_name().to_string(),
                    table.build_table_descriptor(),
                )
            })
            .into_group_map();

        for (database_name, tables) in tables_by_database
            .into_iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
        {
            self.sync_tables(&database_name, &tables, &mut summary)
                .await?;
        }

        info!(
            "Reconciled {} table(s): {} database(s) created, {} table(s) created, {} updated, {} unchanged",
            desired.len(),
            summary.databases_created,
            summary.tables_created,
            summary.tables_updated,
            summary.tables_unchanged,
        );

        Ok(summary)
    }

    async fn sync_databases(
        &self,
        databases: &[DatabaseDescriptor],
    ) -> ReconcileResult<usize> {
        let store = self.store.as_ref();

        let existing: HashSet<String> =
            Paginated::new(self.page_size, move |page: PageRequest| {
                store.list_databases(page)
            })
            .collect_all()
            .await
            .map_err(|source| ReconcileError::Listing {
                target: "databases".to_string(),
                source,
            })?
            .into_iter()
            .collect();
        debug!("Found {} database(s) in the catalog", existing.len());

        let mut created = 0;
        for database in databases
            .iter()
            .filter(|database| !existing.contains(&database.name))
        {
            info!("Creating database {}", database.name);
            store.create_database(database).await.map_err(|source| {
                ReconcileError::CatalogOperation {
                    operation: CatalogOperation::CreateDatabase,
                    target: database.name.clone(),
                    source,
                }
            })?;
            created += 1;
        }

        Ok(created)
    }

    async fn sync_tables(
        &self,
        database_name: &str,
        tables: &[TableDescriptor],
        summary: &mut ReconcileSummary,
    ) -> ReconcileResult<()> {
        let store = self.store.as_ref();

        let existing: HashMap<String, TableDescriptor> =
            Paginated::new(self.page_size, move |page: PageRequest| {
                store.list_tables(database_name, page)
            })
            .collect_all()
            .await
            .map_err(|source| ReconcileError::Listing {
                target: format!("tables of {database_name}"),
                source,
            })?
            .into_iter()
            .map(|table| (table.name.clone(), table))
            .collect();
        debug!(
            "Found {} table(s) in database {database_name}",
            existing.len()
        );

        let mut creates = vec![];
        let mut updates = vec![];
        for table in tables {
            match existing.get(&table.name) {
                None => creates.push(table),
                Some(current) if current.matches(table) => {
                    debug!("Table {database_name}.{} is up to date", table.name);
                    summary.tables_unchanged += 1;
                }
                Some(_) => updates.push(table),
            }
        }

        for table in updates {
            info!("Updating table {database_name}.{}", table.name);
            store
                .update_table(database_name, table)
                .await
                .map_err(|source| ReconcileError::CatalogOperation {
                    operation: CatalogOperation::UpdateTable,
                    target: format!("{database_name}.{}", table.name),
                    source,
                })?;
            summary.tables_updated += 1;
        }

        for table in creates {
            info!("Creating table {database_name}.{}", table.name);
            store
                .create_table(database_name, table)
                .await
                .map_err(|source| ReconcileError::CatalogOperation {
                    operation: CatalogOperation::CreateTable,
                    target: format!("{database_name}.{}", table.name),
                    source,
                })?;
            summary.tables_created += 1;
        }

        Ok(())
    }

    /// Create the partition if the catalog doesn't have it, otherwise overwrite it
    /// with the requested descriptor. Assumes a single writer per table.
    pub async fn upsert_partition(
        &self,
        request: &UpsertPartitionRequest,
    ) -> CatalogResult<PartitionUpsert> {
        let UpsertPartitionRequest {
            database_name,
            table_name,
            partition,
        } = request;

        let existing = self
            .store
            .get_partition(database_name, table_name, &partition.values)
            .await?;

        match existing {
            Some(_) => {
                info!(
                    "Updating partition {:?} of {database_name}.{table_name}",
                    partition.values
                );
                self.store
                    .update_partition(
                        database_name,
                        table_name,
                        &partition.values,
                        partition,
                    )
                    .await?;
                Ok(PartitionUpsert::Updated)
            }
            None => {
                info!(
                    "Creating partition {:?} of {database_name}.{table_name}",
                    partition.values
                );
                self.store
                    .create_partition(database_name, table_name, partition)
                    .await?;
                Ok(PartitionUpsert::Created)
            }
        }
    }

    /// Remove a table from the catalog. The data it points at is left in place.
    pub async fn unlink_table(
        &self,
        database_name: &str,
        table_name: &str,
    ) -> CatalogResult<()> {
        info!("Unlinking table {database_name}.{table_name}");
        self.store.delete_table(database_name, table_name).await
    }
}
