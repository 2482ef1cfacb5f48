use std::fmt::Debug;

use chrono::NaiveDate;
use url::Url;

use crate::catalog::table::LifecycleState;
use crate::catalog::{CatalogError, CatalogResult};
use crate::schema::Schema;

pub const PARTITION_DATE_FORMAT: &str = "%Y-%m-%d";

/// Resolves the storage locations of a single table.
pub trait TableLocator: Send + Sync + Debug {
    /// Root prefix holding all of the table's data.
    fn table_location(&self) -> String;

    /// Prefix holding the freshly landed objects of one date partition.
    fn live_partition_location(&self, dt: NaiveDate) -> String;

    /// Manifest listing the consolidated objects of one date partition.
    fn merged_manifest_location(&self, dt: NaiveDate, manifest_version: i64) -> String;

    /// Partition value representation used by the catalog.
    fn format_dt(&self, dt: NaiveDate) -> String {
        dt.format(PARTITION_DATE_FORMAT).to_string()
    }

    fn partition_location(&self, dt: NaiveDate, state: LifecycleState) -> String {
        match state {
            LifecycleState::Live => self.live_partition_location(dt),
            LifecycleState::Merged { manifest_version } => {
                self.merged_manifest_location(dt, manifest_version)
            }
        }
    }
}

/// Lays tables out as `s3://{bucket}/{prefix}{schema}.{table}/`, with live objects
/// under `live/dt=YYYY-MM-DD/` and merged manifests under `merged/dt=YYYY-MM-DD/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixTableLocator {
    table_root: Url,
}

impl PrefixTableLocator {
    fn dt_prefix(&self, section: &str, dt: NaiveDate) -> String {
        format!(
            "{}{section}/dt={}/",
            self.table_root,
            dt.format(PARTITION_DATE_FORMAT)
        )
    }
}

impl TableLocator for PrefixTableLocator {
    fn table_location(&self) -> String {
        self.table_root.to_string()
    }

    fn live_partition_location(&self, dt: NaiveDate) -> String {
        self.dt_prefix("live", dt)
    }

    fn merged_manifest_location(&self, dt: NaiveDate, manifest_version: i64) -> String {
        format!(
            "{}manifest-{manifest_version:010}.json",
            self.dt_prefix("merged", dt)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLocatorFactory {
    root: Url,
}

impl TableLocatorFactory {
    pub fn try_new(bucket: &str, prefix: &str) -> CatalogResult<Self> {
        if bucket.is_empty() {
            return Err(CatalogError::Generic {
                reason: "Table locations need a non-empty bucket name".to_string(),
            });
        }

        let mut root = Url::parse(&format!("s3://{bucket}/"))?;

        let prefix = prefix.trim_matches('/');
        if !prefix.is_empty() {
            root = root.join(&format!("./{prefix}/"))?;
        }

        Ok(Self { root })
    }

    pub fn build(&self, schema: &Schema) -> CatalogResult<PrefixTableLocator> {
        // The leading "./" stops a colon in the name from being read as a URL scheme
        let table_root = self
            .root
            .join(&format!("./{}.{}/", schema.schema_name, schema.table_name))?;

        Ok(PrefixTableLocator { table_root })
    }
}
