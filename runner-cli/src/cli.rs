use clap::Parser;
use ingest_core::config::{IngestConfig, load_config};
use ingest_core::errors::ConfigError;
use std::path::PathBuf;

/// Ingest a taxi trip dataset into a Postgres table in batches
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ingest-pipeline",
    version,
    about = "Ingest a CSV/Parquet dataset into Postgres in batches",
    after_help = "EXAMPLES:\n    \
        ingest-pipeline --user root --password root --host localhost --port 5432 \\\n        \
        --db_name ny_taxi --pg_table_name yellow_taxi_data --chunksize 100000 \\\n        \
        --url https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_2021-01.parquet\n    \
        ingest-pipeline --config ingest.yaml --n_rows_read 50000"
)]
pub struct Cli {
    /// YAML config file; command line values override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// User name for Postgres DB
    #[arg(long)]
    pub user: Option<String>,

    /// Password for Postgres DB
    #[arg(long)]
    pub password: Option<String>,

    /// Host for Postgres DB
    #[arg(long)]
    pub host: Option<String>,

    /// Port for Postgres DB
    #[arg(long)]
    pub port: Option<u16>,

    /// Database name for Postgres DB
    #[arg(long = "db_name", alias = "db-name")]
    pub db_name: Option<String>,

    /// Table name for Postgres DB
    #[arg(long = "pg_table_name", alias = "pg-table-name")]
    pub pg_table_name: Option<String>,

    /// Url of the dataset
    #[arg(long)]
    pub url: Option<String>,

    /// How many rows to read from the dataset
    #[arg(long = "n_rows_read", alias = "n-rows-read", value_name = "NUM")]
    pub n_rows_read: Option<usize>,

    /// Rows per chunk/batch
    #[arg(long, value_name = "NUM")]
    pub chunksize: Option<usize>,

    /// Directory for downloaded and converted files
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Columns converted to timestamps before each append
    #[arg(long, value_delimiter = ',', value_name = "COLUMNS")]
    pub timestamp_columns: Option<Vec<String>>,

    /// Rows read to lay out the destination table
    #[arg(long, value_name = "NUM")]
    pub sample_rows: Option<usize>,

    /// Load into memory instead of Postgres
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Builds the run configuration: the config file (or `INGEST_CONFIG`)
    /// as a base, overridden by whatever was given on the command line.
    pub fn into_config(self) -> Result<IngestConfig, ConfigError> {
        let mut config = load_config(self.config.as_deref())?;

        let db = &mut config.database;
        override_with(&mut db.user, self.user);
        override_with(&mut db.password, self.password);
        override_with(&mut db.host, self.host);
        override_with(&mut db.port, self.port);
        override_with(&mut db.db_name, self.db_name);
        override_with(&mut db.table_name, self.pg_table_name);

        override_with(&mut config.source.url, self.url);
        override_with(&mut config.source.data_dir, self.data_dir);

        let processing = &mut config.processing;
        override_with(&mut processing.batch_size, self.chunksize);
        override_with(&mut processing.sample_rows, self.sample_rows);
        override_with(&mut processing.timestamp_columns, self.timestamp_columns);
        if self.n_rows_read.is_some() {
            processing.row_limit = self.n_rows_read;
        }

        if config.database.table_name.is_empty() {
            return Err(ConfigError::MissingField {
                field: "pg_table_name".to_string(),
            });
        }
        if config.source.url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "url".to_string(),
            });
        }
        config.validate()?;
        Ok(config)
    }
}

fn override_with<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}
