use arrow::array::ArrayRef;
use arrow::compute::kernels::cast::{CastOptions, cast_with_options};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::errors::TransformError;

pub const TIMESTAMP_TYPE: DataType = DataType::Timestamp(TimeUnit::Microsecond, None);

/// Converts the named columns of `batch` from text to timestamps.
///
/// Casting is strict: a non-null value that does not parse fails the whole
/// batch. Every named column must be present.
pub fn normalize_timestamps(
    batch: &RecordBatch,
    columns: &[String],
) -> Result<RecordBatch, TransformError> {
    let schema = batch.schema();
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut arrays: Vec<ArrayRef> = batch.columns().to_vec();

    let options = CastOptions {
        safe: false,
        ..Default::default()
    };

    for column in columns {
        let idx = schema
            .index_of(column)
            .map_err(|_| TransformError::MissingColumn {
                column: column.clone(),
            })?;

        if arrays[idx].data_type() == &TIMESTAMP_TYPE {
            continue;
        }

        arrays[idx] = cast_with_options(&arrays[idx], &TIMESTAMP_TYPE, &options).map_err(|e| {
            TransformError::TimestampCast {
                column: column.clone(),
                source: e,
            }
        })?;
        fields[idx] = fields[idx].clone().with_data_type(TIMESTAMP_TYPE);
    }

    let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
    RecordBatch::try_new(schema, arrays).map_err(TransformError::Rebuild)
}
