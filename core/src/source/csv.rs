use arrow::csv::reader::Format;
use arrow::csv::{Reader, ReaderBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ProcessingConfig;
use crate::errors::SourceError;
use crate::source::Source;

/// Reads a CSV file with a header row in batches of `batch_size` rows,
/// stopping after `row_limit` rows when one is set.
pub struct CsvSource {
    schema: SchemaRef,
    sample: RecordBatch,
    reader: Reader<File>,
    row_limit: Option<usize>,
    rows_read: usize,
}

impl CsvSource {
    pub fn open(path: impl AsRef<Path>, config: &ProcessingConfig) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();

        // types come from every row so later values parse under them;
        // the sample only lays out the table
        let inferred = Format::default()
            .with_header(true)
            .infer_schema(BufReader::new(open_file(&path)?), None)
            .map_err(|e| SourceError::SchemaInference {
                path: path.display().to_string(),
                source: e,
            })?
            .0;

        if inferred.fields().is_empty() {
            return Err(SourceError::NoColumns {
                path: path.display().to_string(),
            });
        }

        let schema = Arc::new(read_schema(&inferred, &config.timestamp_columns));
        debug!(path = %path.display(), ?schema, "inferred csv schema");

        let sample = build_reader(&path, schema.clone(), config.sample_rows)?
            .next()
            .transpose()
            .map_err(SourceError::Read)?
            .unwrap_or_else(|| RecordBatch::new_empty(schema.clone()));

        let reader = build_reader(&path, schema.clone(), config.batch_size)?;

        info!(
            path = %path.display(),
            columns = schema.fields().len(),
            batch_size = config.batch_size,
            row_limit = ?config.row_limit,
            "opened csv source"
        );

        Ok(Self {
            schema,
            sample,
            reader,
            row_limit: config.row_limit,
            rows_read: 0,
        })
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}

impl Source for CsvSource {
    fn sample(&self) -> &RecordBatch {
        &self.sample
    }

    async fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        let remaining = match self.row_limit {
            Some(limit) => limit.saturating_sub(self.rows_read),
            None => usize::MAX,
        };
        if remaining == 0 {
            return Ok(None);
        }

        let Some(batch) = self.reader.next().transpose().map_err(SourceError::Read)? else {
            return Ok(None);
        };

        let batch = if batch.num_rows() > remaining {
            batch.slice(0, remaining)
        } else {
            batch
        };
        self.rows_read += batch.num_rows();
        Ok(Some(batch))
    }
}

/// The schema rows are parsed with. Timestamp columns stay text until they
/// are normalized, and columns that were empty throughout the file are
/// read as text so later values are not dropped.
fn read_schema(inferred: &Schema, timestamp_columns: &[String]) -> Schema {
    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|field| {
            let as_text = field.data_type() == &DataType::Null
                || timestamp_columns.iter().any(|c| c == field.name());
            if as_text {
                Field::new(field.name(), DataType::Utf8, true)
            } else {
                field.as_ref().clone()
            }
        })
        .collect();
    Schema::new(fields)
}

fn open_file(path: &Path) -> Result<File, SourceError> {
    File::open(path).map_err(|e| SourceError::Open {
        path: path.display().to_string(),
        source: e,
    })
}

fn build_reader(path: &Path, schema: SchemaRef, batch_size: usize) -> Result<Reader<File>, SourceError> {
    ReaderBuilder::new(schema)
        .with_header(true)
        .with_batch_size(batch_size)
        .build(open_file(path)?)
        .map_err(SourceError::Read)
}
