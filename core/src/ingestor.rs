use std::time::Instant;
use tracing::{debug, info};

use crate::config::ProcessingConfig;
use crate::errors::{self, IngestionError};
use crate::sink::Sink;
use crate::source::Source;
use crate::telemetry::IngestMetrics;
use crate::transform::normalize_timestamps;

/// The ingestor orchestrates the data flow from source -> sink.
pub struct Ingestor<S, K> {
    table: String,
    timestamp_columns: Vec<String>,
    source: S,
    sink: K,
    metrics: IngestMetrics,
}

impl<S: Source, K: Sink> Ingestor<S, K> {
    pub fn new(table: impl Into<String>, config: &ProcessingConfig, source: S, sink: K) -> Self {
        Self {
            table: table.into(),
            timestamp_columns: config.timestamp_columns.clone(),
            source,
            sink,
            metrics: IngestMetrics::default(),
        }
    }

    /// Loads the whole source into the destination table.
    ///
    /// High-level logic:
    /// 1. Lay out the table from the source sample, replacing any existing table.
    /// 2. Pull batches until the source is exhausted.
    /// 3. Convert the timestamp columns of each batch, then append it.
    ///
    /// The first batch that cannot be read, converted or written stops the
    /// run with [`IngestionError::BatchFailed`]. Batches appended before it
    /// stay in the table.
    pub async fn run(&mut self) -> errors::Result<IngestMetrics> {
        let started = Instant::now();

        // checked before the table is dropped, so a bad layout leaves it untouched
        let sample = normalize_timestamps(self.source.sample(), &self.timestamp_columns)?;
        self.sink.create_table(&self.table, &sample.schema()).await?;

        let mut batch_id = 1;
        while self.ingest_next(batch_id).await?.is_some() {
            batch_id += 1;
        }

        self.metrics.elapsed_secs = started.elapsed().as_secs_f64();
        info!(
            "There is no further batch. Ingested {} rows into {} in {} batches ({:.3} seconds)",
            self.metrics.total_rows,
            self.table,
            self.metrics.batches_processed,
            self.metrics.elapsed_secs
        );
        Ok(self.metrics.clone())
    }

    /// Moves one batch from source to sink. `Ok(None)` once the source is exhausted.
    async fn ingest_next(&mut self, batch_id: usize) -> errors::Result<Option<u64>> {
        let start = Instant::now();

        let Some(batch) = self
            .source
            .next_batch()
            .await
            .map_err(|e| IngestionError::at_batch(batch_id, e))?
        else {
            return Ok(None);
        };

        let batch = normalize_timestamps(&batch, &self.timestamp_columns)
            .map_err(|e| IngestionError::at_batch(batch_id, e))?;

        let rows = self
            .sink
            .append(&self.table, &batch)
            .await
            .map_err(|e| IngestionError::at_batch(batch_id, e))?;

        let elapsed = start.elapsed();
        self.metrics.record_batch(rows, elapsed);
        debug!(batch = batch_id, rows, "batch appended");
        info!(
            "Batch {} successfully ingested! Time took: {:.3} seconds",
            batch_id,
            elapsed.as_secs_f64()
        );
        Ok(Some(rows))
    }

    pub fn get_metrics(&self) -> &IngestMetrics {
        &self.metrics
    }

    /// Hands back the source and sink once the run is over.
    pub fn into_parts(self) -> (S, K) {
        (self.source, self.sink)
    }
}
