pub mod memory;
pub mod postgres;

use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tokio_postgres::types::Type;

use crate::errors::SinkError;

pub use self::memory::MemorySink;
pub use self::postgres::PostgresSink;

/// The `Sink` trait defines the contract for any destination system.
/// It lays out a table from a schema and then appends batches of rows to it.
#[allow(async_fn_in_trait)]
pub trait Sink {
    /// Creates `table` with the columns of `schema` and no rows. An existing
    /// table with the same name is dropped first.
    async fn create_table(&mut self, table: &str, schema: &Schema) -> Result<(), SinkError>;

    /// Appends every row of `batch` to `table`, returning the number of rows written.
    async fn append(&mut self, table: &str, batch: &RecordBatch) -> Result<u64, SinkError>;
}

/// Postgres column type for an Arrow field.
pub fn pg_type(field: &Field) -> Result<Type, SinkError> {
    let pg = match field.data_type() {
        DataType::Boolean => Type::BOOL,
        DataType::Int8 | DataType::Int16 => Type::INT2,
        DataType::Int32 | DataType::UInt8 | DataType::UInt16 => Type::INT4,
        DataType::Int64 | DataType::UInt32 | DataType::UInt64 => Type::INT8,
        DataType::Float32 => Type::FLOAT4,
        DataType::Float64 => Type::FLOAT8,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Null => Type::TEXT,
        DataType::Date32 => Type::DATE,
        DataType::Timestamp(_, None) => Type::TIMESTAMP,
        other => {
            return Err(SinkError::UnsupportedType {
                column: field.name().clone(),
                data_type: other.to_string(),
            });
        }
    };
    Ok(pg)
}

pub fn pg_types(schema: &Schema) -> Result<Vec<Type>, SinkError> {
    schema.fields().iter().map(|f| pg_type(f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::TimeUnit;

    #[test]
    fn test_pg_type_mapping() {
        let cases = vec![
            (DataType::Boolean, Type::BOOL),
            (DataType::Int8, Type::INT2),
            (DataType::Int32, Type::INT4),
            (DataType::UInt16, Type::INT4),
            (DataType::Int64, Type::INT8),
            (DataType::UInt64, Type::INT8),
            (DataType::Float32, Type::FLOAT4),
            (DataType::Float64, Type::FLOAT8),
            (DataType::Utf8, Type::TEXT),
            (DataType::Null, Type::TEXT),
            (DataType::Date32, Type::DATE),
            (DataType::Timestamp(TimeUnit::Second, None), Type::TIMESTAMP),
            (DataType::Timestamp(TimeUnit::Microsecond, None), Type::TIMESTAMP),
        ];

        for (data_type, expected) in cases {
            let field = Field::new("c", data_type.clone(), true);
            assert_eq!(pg_type(&field).unwrap(), expected, "mapping for {data_type}");
        }
    }

    #[test]
    fn test_unsupported_types() {
        let field = Field::new("payload", DataType::Binary, true);
        assert!(matches!(
            pg_type(&field),
            Err(SinkError::UnsupportedType { column, .. }) if column == "payload"
        ));

        let zoned = Field::new("ts", DataType::Timestamp(TimeUnit::Second, Some("UTC".into())), true);
        assert!(pg_type(&zoned).is_err());
    }
}
