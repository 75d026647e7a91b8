use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::errors::FetchError;
use crate::fetch::{io_error, part_path};

const CONVERT_BATCH_ROWS: usize = 64 * 1024;
// fractional seconds are only written when present
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Rewrites a Parquet file as CSV with a header row. Returns the row count.
pub fn parquet_to_csv(parquet_path: &Path, csv_path: &Path) -> Result<usize, FetchError> {
    let start = Instant::now();
    info!("Start parquet conversion of {}", parquet_path.display());

    let conversion_error = |reason: String| FetchError::Conversion {
        path: parquet_path.display().to_string(),
        reason,
    };

    let file = File::open(parquet_path).map_err(io_error(parquet_path))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| conversion_error(e.to_string()))?
        .with_batch_size(CONVERT_BATCH_ROWS);
    let schema = builder.schema().clone();
    let reader = builder.build().map_err(|e| conversion_error(e.to_string()))?;

    let part = part_path(csv_path);
    let out = BufWriter::new(File::create(&part).map_err(io_error(&part))?);
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_timestamp_format(TIMESTAMP_FORMAT.to_string())
        .build(out);

    // the header goes out with the first write, even for a file without rows
    writer
        .write(&RecordBatch::new_empty(schema))
        .map_err(|e| conversion_error(e.to_string()))?;

    let mut rows = 0;
    for batch in reader {
        let batch = batch.map_err(|e| conversion_error(e.to_string()))?;
        writer
            .write(&batch)
            .map_err(|e| conversion_error(e.to_string()))?;
        rows += batch.num_rows();
    }

    let mut out = writer.into_inner();
    out.flush().map_err(io_error(&part))?;
    drop(out);
    std::fs::rename(&part, csv_path).map_err(io_error(csv_path))?;

    info!(
        rows,
        elapsed = ?start.elapsed(),
        "Successfully converted to csv: {}",
        csv_path.display()
    );
    Ok(rows)
}

/// [`parquet_to_csv`] on the blocking thread pool.
pub async fn convert_parquet_to_csv(parquet_path: PathBuf, csv_path: PathBuf) -> Result<usize, FetchError> {
    let path = parquet_path.display().to_string();
    tokio::task::spawn_blocking(move || parquet_to_csv(&parquet_path, &csv_path))
        .await
        .map_err(|e| FetchError::Conversion {
            path,
            reason: e.to_string(),
        })?
}
