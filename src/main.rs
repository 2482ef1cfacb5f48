use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::debug;

use strata::catalog::CatalogResult;
use strata::config::context::build_table_factory;
use strata::config::schema::{load_config, StrataConfig};
use strata::schema::Schema;
use strata::telemetry::prepare_tracing;

#[derive(Debug, Parser)]
#[clap(name = "strata", about = "Catalog and event tooling for the staging data lake")]
struct Args {
    #[clap(short, long, default_value = "strata.toml")]
    config_path: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the catalog database and storage locations of a table partition
    Locate {
        #[clap(long)]
        schema: String,

        #[clap(long)]
        table: String,

        /// Partition date, formatted YYYY-MM-DD
        #[clap(long)]
        dt: NaiveDate,

        #[clap(long, default_value = "0")]
        manifest_version: i64,

        /// Whether the partition has been switched over to its merged manifest
        #[clap(long)]
        switched: bool,
    },
}

fn locate(
    config: &StrataConfig,
    schema: String,
    table: String,
    dt: NaiveDate,
    manifest_version: i64,
    switched: bool,
) -> CatalogResult<()> {
    let table = build_table_factory(config)?
        .build(Arc::new(Schema::new(schema, table, vec![])))?;
    let partition = table.build_upsert_partition_request(dt, switched, manifest_version);
    debug!("Resolved partition {:?}", partition.partition.values);

    println!("database:  {}", partition.database_name);
    println!("table:     {}", partition.table_name);
    println!(
        "location:  {}",
        table
            .build_table_descriptor()
            .storage_descriptor
            .location
            .unwrap_or_default()
    );
    println!("partition: {}", partition.partition.values.join("/"));
    println!(
        "data:      {}",
        partition
            .partition
            .storage_descriptor
            .location
            .unwrap_or_default()
    );

    Ok(())
}

fn load(config_path: &Path) -> Result<StrataConfig, String> {
    let config = load_config(config_path)
        .map_err(|e| format!("Failed to load config from {config_path:?}: {e}"))?;
    prepare_tracing(config.misc.json_logs).map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Command::Locate {
            schema,
            table,
            dt,
            manifest_version,
            switched,
        } => locate(&config, schema, table, dt, manifest_version, switched),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
