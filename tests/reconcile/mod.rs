use std::sync::Arc;

use assert_unordered::assert_eq_unordered_sort;
use chrono::NaiveDate;
use rstest::rstest;

use strata::catalog::descriptor::ColumnDescriptor;
use strata::catalog::memory::MemoryCatalog;
use strata::catalog::reconciler::{PartitionUpsert, ReconcileSummary};
use strata::catalog::table::CatalogTable;
use strata::catalog::CatalogError;
use strata::config::context::{build_reconciler, build_table_factory};
use strata::config::schema::StrataConfig;
use strata::schema::{Column, ValueType};

use crate::fixtures::{config, pv_log, schemas};

fn desired_tables(config: &StrataConfig) -> Vec<CatalogTable> {
    let factory = build_table_factory(config).unwrap();
    schemas()
        .into_iter()
        .map(|schema| factory.build(schema).unwrap())
        .collect()
}

#[rstest]
#[tokio::test]
async fn test_reconcile_from_scratch_then_idempotent(config: StrataConfig) {
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.insert_database("default");
    catalog.insert_database("scratch");
    let reconciler = build_reconciler(&config, catalog.clone());
    let desired = desired_tables(&config);

    let first = reconciler.upsert_tables(&desired).await.unwrap();
    assert_eq!(
        first,
        ReconcileSummary {
            databases_created: 2,
            tables_created: 3,
            tables_updated: 0,
            tables_unchanged: 0,
        }
    );
    assert_eq_unordered_sort!(
        catalog.database_names(),
        vec![
            "default".to_string(),
            "scratch".to_string(),
            "lake_logs".to_string(),
            "lake_metrics".to_string(),
        ]
    );

    let cpu = catalog.table("lake_metrics", "cpu").unwrap();
    assert_eq!(
        cpu.storage_descriptor.location.as_deref(),
        Some("s3://lake-bucket/warehouse/metrics.cpu/")
    );
    assert_eq!(
        cpu.storage_descriptor.columns,
        vec![
            ColumnDescriptor::new("host", "string"),
            ColumnDescriptor::new("usage", "double"),
            ColumnDescriptor::new("dt", "date"),
        ]
    );

    let writes = catalog.calls().writes();
    let second = reconciler.upsert_tables(&desired).await.unwrap();
    assert_eq!(
        second,
        ReconcileSummary {
            tables_unchanged: 3,
            ..Default::default()
        }
    );
    assert_eq!(catalog.calls().writes(), writes);
}

#[rstest]
#[tokio::test]
async fn test_added_column_updates_one_table(config: StrataConfig) {
    let catalog = Arc::new(MemoryCatalog::new());
    let reconciler = build_reconciler(&config, catalog.clone());
    reconciler
        .upsert_tables(&desired_tables(&config))
        .await
        .unwrap();

    let evolved = build_table_factory(&config)
        .unwrap()
        .build(pv_log(vec![
            Column::new("user_id", ValueType::Bigint),
            Column::new("path", ValueType::String),
            Column::new("requested_at", ValueType::Timestamp),
            Column::new("referrer", ValueType::String),
        ]))
        .unwrap();
    let calls = catalog.calls();

    let summary = reconciler.upsert_tables(&[evolved]).await.unwrap();

    assert_eq!(summary.tables_updated, 1);
    assert_eq!(summary.tables_created, 0);
    assert_eq!(catalog.calls().update_table, calls.update_table + 1);
    assert_eq!(catalog.calls().create_table, calls.create_table);
    assert_eq!(
        catalog
            .table("lake_logs", "pv_log")
            .unwrap()
            .storage_descriptor
            .columns
            .len(),
        4
    );
}

#[rstest]
#[tokio::test]
async fn test_partition_lifecycle(config: StrataConfig) {
    let catalog = Arc::new(MemoryCatalog::new());
    let reconciler = build_reconciler(&config, catalog.clone());
    let desired = desired_tables(&config);
    reconciler.upsert_tables(&desired).await.unwrap();

    let pv_log = &desired[0];
    let dt = NaiveDate::from_ymd_opt(2018, 6, 27).unwrap();
    let values = vec!["2018-06-27".to_string()];
    let location = || {
        catalog
            .partition("lake_logs", "pv_log", &values)
            .and_then(|partition| partition.storage_descriptor.location)
    };

    // Freshly landed
    let live = pv_log.build_upsert_partition_request(dt, false, 0);
    assert_eq!(
        reconciler.upsert_partition(&live).await.unwrap(),
        PartitionUpsert::Created
    );
    assert_eq!(
        location().as_deref(),
        Some("s3://lake-bucket/warehouse/logs.pv_log/live/dt=2018-06-27/")
    );

    // Merged, but readers haven't been switched over yet
    let merged = pv_log.build_upsert_partition_request(dt, false, 7);
    assert_eq!(
        reconciler.upsert_partition(&merged).await.unwrap(),
        PartitionUpsert::Updated
    );
    assert_eq!(
        location().as_deref(),
        Some("s3://lake-bucket/warehouse/logs.pv_log/live/dt=2018-06-27/")
    );

    let switched = pv_log.build_upsert_partition_request(dt, true, 7);
    assert_eq!(
        reconciler.upsert_partition(&switched).await.unwrap(),
        PartitionUpsert::Updated
    );
    assert_eq!(
        location().as_deref(),
        Some(
            "s3://lake-bucket/warehouse/logs.pv_log/merged/dt=2018-06-27/manifest-0000000007.json"
        )
    );

    let calls = catalog.calls();
    assert_eq!(calls.create_partition, 1);
    assert_eq!(calls.update_partition, 2);
    assert_eq!(calls.get_partition, 3);
}

#[rstest]
#[tokio::test]
async fn test_unlink_table(config: StrataConfig) {
    let catalog = Arc::new(MemoryCatalog::new());
    let reconciler = build_reconciler(&config, catalog.clone());
    let desired = desired_tables(&config);
    reconciler.upsert_tables(&desired).await.unwrap();

    reconciler.unlink_table("lake_logs", "pv_log").await.unwrap();
    assert!(catalog.table("lake_logs", "pv_log").is_none());
    assert!(matches!(
        reconciler.unlink_table("lake_logs", "pv_log").await,
        Err(CatalogError::TableDoesNotExist { .. })
    ));

    // The next run puts it back
    let summary = reconciler.upsert_tables(&desired).await.unwrap();
    assert_eq!(summary.tables_created, 1);
    assert_eq!(summary.tables_unchanged, 2);
}
