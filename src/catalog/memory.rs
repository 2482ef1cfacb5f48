//! An in-process catalog store.
//!
//! Keeps databases, tables and partitions in memory, serves listings in pages and
//! counts every call it receives, which makes it suitable for local runs and for
//! asserting on the traffic a reconciliation generates.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::catalog::descriptor::{DatabaseDescriptor, PartitionDescriptor, TableDescriptor};
use crate::catalog::pagination::{Page, PageRequest, MAX_PAGE_SIZE};
use crate::catalog::{CatalogError, CatalogResult, CatalogStore};

#[derive(Debug, Default)]
struct MemoryTable {
    descriptor: Option<TableDescriptor>,
    partitions: BTreeMap<Vec<String>, PartitionDescriptor>,
}

type MemoryDatabase = BTreeMap<String, MemoryTable>;

/// Number of calls made against a [`MemoryCatalog`], per method.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallCounts {
    pub list_databases: usize,
    pub list_tables: usize,
    pub create_database: usize,
    pub create_table: usize,
    pub update_table: usize,
    pub delete_table: usize,
    pub get_partition: usize,
    pub create_partition: usize,
    pub update_partition: usize,
}

impl CallCounts {
    /// Calls that changed the catalog.
    pub fn writes(&self) -> usize {
        self.create_database
            + self.create_table
            + self.update_table
            + self.delete_table
            + self.create_partition
            + self.update_partition
    }
}

#[derive(Debug, Default)]
struct CallCounters {
    list_databases: AtomicUsize,
    list_tables: AtomicUsize,
    create_database: AtomicUsize,
    create_table: AtomicUsize,
    update_table: AtomicUsize,
    delete_table: AtomicUsize,
    get_partition: AtomicUsize,
    create_partition: AtomicUsize,
    update_partition: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[derive(Debug)]
pub struct MemoryCatalog {
    databases: RwLock<BTreeMap<String, MemoryDatabase>>,
    // The service may hand out smaller pages than were asked for
    page_limit: usize,
    calls: CallCounters,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            databases: Default::default(),
            page_limit: MAX_PAGE_SIZE,
            calls: Default::default(),
        }
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    pub fn calls(&self) -> CallCounts {
        let load = |counter: &AtomicUsize| counter.load(Ordering::SeqCst);
        CallCounts {
            list_databases: load(&self.calls.list_databases),
            list_tables: load(&self.calls.list_tables),
            create_database: load(&self.calls.create_database),
            create_table: load(&self.calls.create_table),
            update_table: load(&self.calls.update_table),
            delete_table: load(&self.calls.delete_table),
            get_partition: load(&self.calls.get_partition),
            create_partition: load(&self.calls.create_partition),
            update_partition: load(&self.calls.update_partition),
        }
    }

    /// Seed a database without going through (or counting) the catalog API.
    pub fn insert_database(&self, name: &str) {
        self.databases.write().entry(name.to_string()).or_default();
    }

    /// Seed a table, creating its database if needed.
    pub fn insert_table(&self, database_name: &str, table: TableDescriptor) {
        let mut databases = self.databases.write();
        let database = databases.entry(database_name.to_string()).or_default();
        let name = table.name.clone();
        database.entry(name).or_default().descriptor = Some(table);
    }

    pub fn database_names(&self) -> Vec<String> {
        self.databases.read().keys().cloned().collect()
    }

    pub fn table(&self, database_name: &str, table_name: &str) -> Option<TableDescriptor> {
        self.databases
            .read()
            .get(database_name)?
            .get(table_name)?
            .descriptor
            .clone()
    }

    pub fn partition(
        &self,
        database_name: &str,
        table_name: &str,
        values: &[String],
    ) -> Option<PartitionDescriptor> {
        self.databases
            .read()
            .get(database_name)?
            .get(table_name)?
            .partitions
            .get(values)
            .cloned()
    }

    fn page<T: Clone>(&self, items: &[T], request: &PageRequest) -> CatalogResult<Page<T>> {
        let offset = match &request.next_token {
            Some(token) => token.parse::<usize>().map_err(|_| CatalogError::Generic {
                reason: format!("Invalid continuation token {token:?}"),
            })?,
            None => 0,
        };
        let size = request.max_results.clamp(1, self.page_limit);
        let end = offset.saturating_add(size).min(items.len());

        Ok(Page {
            items: items.get(offset..end).unwrap_or_default().to_vec(),
            next_token: (end < items.len()).then(|| end.to_string()),
        })
    }

    fn with_table<T>(
        &self,
        database_name: &str,
        table_name: &str,
        f: impl FnOnce(&mut MemoryTable) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let mut databases = self.databases.write();
        let table = databases
            .get_mut(database_name)
            .and_then(|database| database.get_mut(table_name))
            .filter(|table| table.descriptor.is_some())
            .ok_or_else(|| CatalogError::TableDoesNotExist {
                name: format!("{database_name}.{table_name}"),
            })?;

        f(table)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn list_databases(&self, page: PageRequest) -> CatalogResult<Page<String>> {
        bump(&self.calls.list_databases);

        self.page(&self.database_names(), &page)
    }

    async fn list_tables(
        &self,
        database_name: &str,
        page: PageRequest,
    ) -> CatalogResult<Page<TableDescriptor>> {
        bump(&self.calls.list_tables);

        let tables: Vec<TableDescriptor> = self
            .databases
            .read()
            .get(database_name)
            .ok_or_else(|| CatalogError::DatabaseDoesNotExist {
                name: database_name.to_string(),
            })?
            .values()
            .filter_map(|table| table.descriptor.clone())
            .collect();

        self.page(&tables, &page)
    }

    async fn create_database(&self, database: &DatabaseDescriptor) -> CatalogResult<()> {
        bump(&self.calls.create_database);

        let mut databases = self.databases.write();
        if databases.contains_key(&database.name) {
            return Err(CatalogError::DatabaseAlreadyExists {
                name: database.name.clone(),
            });
        }
        databases.insert(database.name.clone(), Default::default());
        Ok(())
    }

    async fn create_table(
        &self,
        database_name: &str,
        table: &TableDescriptor,
    ) -> CatalogResult<()> {
        bump(&self.calls.create_table);

        let mut databases = self.databases.write();
        let database = databases.get_mut(database_name).ok_or_else(|| {
            CatalogError::DatabaseDoesNotExist {
                name: database_name.to_string(),
            }
        })?;

        let entry = database.entry(table.name.clone()).or_default();
        if entry.descriptor.is_some() {
            return Err(CatalogError::TableAlreadyExists {
                name: format!("{database_name}.{}", table.name),
            });
        }
        entry.descriptor = Some(table.clone());
        Ok(())
    }

    async fn update_table(
        &self,
        database_name: &str,
        table: &TableDescriptor,
    ) -> CatalogResult<()> {
        bump(&self.calls.update_table);

        self.with_table(database_name, &table.name, |existing| {
            existing.descriptor = Some(table.clone());
            Ok(())
        })
    }

    async fn delete_table(
        &self,
        database_name: &str,
        table_name: &str,
    ) -> CatalogResult<()> {
        bump(&self.calls.delete_table);

        let mut databases = self.databases.write();
        match databases
            .get_mut(database_name)
            .and_then(|database| database.remove(table_name))
        {
            Some(MemoryTable {
                descriptor: Some(_),
                ..
            }) => Ok(()),
            _ => Err(CatalogError::TableDoesNotExist {
                name: format!("{database_name}.{table_name}"),
            }),
        }
    }

    async fn get_partition(
        &self,
        database_name: &str,
        table_name: &str,
        values: &[String],
    ) -> CatalogResult<Option<PartitionDescriptor>> {
        bump(&self.calls.get_partition);

        self.with_table(database_name, table_name, |table| {
            Ok(table.partitions.get(values).cloned())
        })
    }

    async fn create_partition(
        &self,
        database_name: &str,
        table_name: &str,
        partition: &PartitionDescriptor,
    ) -> CatalogResult<()> {
        bump(&self.calls.create_partition);

        self.with_table(database_name, table_name, |table| {
            if table.partitions.contains_key(&partition.values) {
                return Err(CatalogError::PartitionAlreadyExists {
                    table: table_name.to_string(),
                    values: partition.values.clone(),
                });
            }
            table
                .partitions
                .insert(partition.values.clone(), partition.clone());
            Ok(())
        })
    }

    async fn update_partition(
        &self,
        database_name: &str,
        table_name: &str,
        values: &[String],
        partition: &PartitionDescriptor,
    ) -> CatalogResult<()> {
        bump(&self.calls.update_partition);

        self.with_table(database_name, table_name, |table| {
            if table.partitions.remove(values).is_none() {
                return Err(CatalogError::PartitionDoesNotExist {
                    table: table_name.to_string(),
                    values: values.to_vec(),
                });
            }
            table
                .partitions
                .insert(partition.values.clone(), partition.clone());
            Ok(())
        })
    }
}
