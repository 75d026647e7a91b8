mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use ingest_core::config::IngestConfig;
use ingest_core::fetch::prepare_source;
use ingest_core::ingestor::Ingestor;
use ingest_core::sink::{MemorySink, PostgresSink};
use ingest_core::source::CsvSource;
use ingest_core::telemetry::{IngestMetrics, init_tracing};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};

use crate::cli::Cli;

/// Entry point for a one-shot ingestion run.
///
/// What it does at a high-level:
///     Build the run config from the command line (and optional config file).
///     Make sure the dataset is on disk as CSV, downloading and converting it if needed.
///     Recreate the destination table and load the CSV into it batch by batch.
#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dry_run = cli.dry_run;
    let config = cli.into_config().context("Invalid configuration")?;

    let start = Instant::now();
    let client = reqwest::Client::new();
    let prepared = prepare_source(&client, &config.source)
        .await
        .with_context(|| format!("Failed to prepare dataset from {}", config.source.url))?;
    info!(
        status = ?prepared.status,
        path = %prepared.csv_path.display(),
        "Dataset ready. Time took: {:.2} seconds",
        start.elapsed().as_secs_f64()
    );

    let source = CsvSource::open(&prepared.csv_path, &config.processing)
        .with_context(|| format!("Failed to open {}", prepared.csv_path.display()))?;

    let table = &config.database.table_name;
    let metrics = if dry_run {
        info!("DRY RUN: loading into memory instead of postgres");
        let mut ingestor = Ingestor::new(table, &config.processing, source, MemorySink::new());
        ingestor.run().await.context("Ingestion failed")?
    } else {
        let sink = PostgresSink::connect(&config.database)
            .await
            .context("Failed to connect to postgres")?;
        let mut ingestor = Ingestor::new(table, &config.processing, source, sink);
        let metrics = ingestor.run().await.context("Ingestion failed")?;

        let (_, sink) = ingestor.into_parts();
        let rows = sink.row_count(table).await?;
        info!("Table {} now holds {} rows", table, rows);
        metrics
    };

    report(&config, &metrics)?;
    Ok(())
}

fn report(config: &IngestConfig, metrics: &IngestMetrics) -> Result<()> {
    info!(
        "Successfully ingested {} rows to {} table",
        metrics.total_rows, config.database.table_name
    );
    info!("Final metrics: {}", serde_json::to_string(metrics)?);
    Ok(())
}
