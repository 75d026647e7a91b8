use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type,
    Schema, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::errors::SinkError;
use crate::sink::{Sink, pg_types};

type Cell = Box<dyn ToSql + Sync + Send>;

/// Writes batches into PostgreSQL over a single connection using binary COPY.
pub struct PostgresSink {
    client: Client,
}

impl PostgresSink {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, SinkError> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .user(&config.user)
            .password(&config.password)
            .host(&config.host)
            .port(config.port)
            .dbname(&config.db_name)
            .application_name("ingest-pipeline");

        let (client, connection) =
            pg_config
                .connect(NoTls)
                .await
                .map_err(|e| SinkError::Connection {
                    reason: e.to_string(),
                })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Postgres connection error: {}", e);
            }
        });

        info!(
            "Connected to postgres at {}:{}/{}",
            config.host, config.port, config.db_name
        );
        Ok(Self { client })
    }

    pub async fn row_count(&self, table: &str) -> Result<i64, SinkError> {
        let sql = format!("SELECT count(*) FROM {}", quote_ident(table));
        let row = self
            .client
            .query_one(sql.as_str(), &[])
            .await
            .map_err(|e| SinkError::Query {
                reason: e.to_string(),
            })?;
        Ok(row.get(0))
    }
}

impl Sink for PostgresSink {
    async fn create_table(&mut self, table: &str, schema: &Schema) -> Result<(), SinkError> {
        let create = create_table_sql(table, schema)?;
        // multiple statements in one simple query run as a single implicit transaction
        let sql = format!("DROP TABLE IF EXISTS {}; {}", quote_ident(table), create);
        debug!(%sql, "creating table");

        self.client
            .batch_execute(&sql)
            .await
            .map_err(|e| SinkError::TableCreation {
                table: table.to_string(),
                reason: e.to_string(),
            })?;

        info!("Created table {} with {} columns", table, schema.fields().len());
        Ok(())
    }

    async fn append(&mut self, table: &str, batch: &RecordBatch) -> Result<u64, SinkError> {
        if batch.num_rows() == 0 {
            return Ok(0);
        }

        let schema = batch.schema();
        let types = pg_types(&schema)?;
        let write_err = |e: tokio_postgres::Error| SinkError::Write {
            table: table.to_string(),
            reason: e.to_string(),
        };

        let copy = self
            .client
            .copy_in(copy_sql(table, &schema).as_str())
            .await
            .map_err(write_err)?;
        let writer = BinaryCopyInWriter::new(copy, &types);
        futures::pin_mut!(writer);

        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .zip(schema.fields())
                .map(|(array, field)| cell(field.name(), array.as_ref(), row))
                .collect::<Result<Vec<Cell>, SinkError>>()?;
            let values: Vec<&(dyn ToSql + Sync)> = cells
                .iter()
                .map(|c| c.as_ref() as &(dyn ToSql + Sync))
                .collect();
            writer.as_mut().write(&values).await.map_err(write_err)?;
        }

        writer.as_mut().finish().await.map_err(write_err)
    }
}

/// Double-quotes an identifier so mixed case and reserved words survive.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn create_table_sql(table: &str, schema: &Schema) -> Result<String, SinkError> {
    let types = pg_types(schema)?;
    let columns = schema
        .fields()
        .iter()
        .zip(types)
        .map(|(field, pg)| format!("{} {}", quote_ident(field.name()), pg.name()))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("CREATE TABLE {} ({})", quote_ident(table), columns))
}

pub fn copy_sql(table: &str, schema: &Schema) -> String {
    let columns = schema
        .fields()
        .iter()
        .map(|f| quote_ident(f.name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("COPY {} ({}) FROM STDIN BINARY", quote_ident(table), columns)
}

fn cell(column: &str, array: &dyn Array, row: usize) -> Result<Cell, SinkError> {
    // NullArray carries no validity buffer, so is_null alone misses it
    if array.is_null(row) || array.data_type() == &DataType::Null {
        return null_cell(column, array.data_type());
    }

    let cell: Cell = match array.data_type() {
        DataType::Boolean => Box::new(Some(array.as_boolean().value(row))),
        DataType::Int8 => Box::new(Some(i16::from(array.as_primitive::<Int8Type>().value(row)))),
        DataType::Int16 => Box::new(Some(array.as_primitive::<Int16Type>().value(row))),
        DataType::Int32 => Box::new(Some(array.as_primitive::<Int32Type>().value(row))),
        DataType::Int64 => Box::new(Some(array.as_primitive::<Int64Type>().value(row))),
        DataType::UInt8 => Box::new(Some(i32::from(array.as_primitive::<UInt8Type>().value(row)))),
        DataType::UInt16 => Box::new(Some(i32::from(array.as_primitive::<UInt16Type>().value(row)))),
        DataType::UInt32 => Box::new(Some(i64::from(array.as_primitive::<UInt32Type>().value(row)))),
        DataType::UInt64 => {
            let value = array.as_primitive::<UInt64Type>().value(row);
            let value = i64::try_from(value).map_err(|_| SinkError::Value {
                column: column.to_string(),
                reason: format!("{value} overflows int8"),
            })?;
            Box::new(Some(value))
        }
        DataType::Float32 => Box::new(Some(array.as_primitive::<Float32Type>().value(row))),
        DataType::Float64 => Box::new(Some(array.as_primitive::<Float64Type>().value(row))),
        DataType::Utf8 => Box::new(Some(array.as_string::<i32>().value(row).to_string())),
        DataType::LargeUtf8 => Box::new(Some(array.as_string::<i64>().value(row).to_string())),
        DataType::Date32 => Box::new(array.as_primitive::<Date32Type>().value_as_date(row)),
        DataType::Timestamp(unit, None) => Box::new(timestamp_value(array, unit, row)),
        other => return Err(unsupported(column, other)),
    };
    Ok(cell)
}

fn timestamp_value(array: &dyn Array, unit: &TimeUnit, row: usize) -> Option<NaiveDateTime> {
    match unit {
        TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value_as_datetime(row),
        TimeUnit::Millisecond => array
            .as_primitive::<TimestampMillisecondType>()
            .value_as_datetime(row),
        TimeUnit::Microsecond => array
            .as_primitive::<TimestampMicrosecondType>()
            .value_as_datetime(row),
        TimeUnit::Nanosecond => array
            .as_primitive::<TimestampNanosecondType>()
            .value_as_datetime(row),
    }
}

/// A typed NULL; binary COPY checks each value against the column type.
fn null_cell(column: &str, data_type: &DataType) -> Result<Cell, SinkError> {
    let cell: Cell = match data_type {
        DataType::Boolean => Box::new(None::<bool>),
        DataType::Int8 | DataType::Int16 => Box::new(None::<i16>),
        DataType::Int32 | DataType::UInt8 | DataType::UInt16 => Box::new(None::<i32>),
        DataType::Int64 | DataType::UInt32 | DataType::UInt64 => Box::new(None::<i64>),
        DataType::Float32 => Box::new(None::<f32>),
        DataType::Float64 => Box::new(None::<f64>),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Null => Box::new(None::<String>),
        DataType::Date32 => Box::new(None::<NaiveDate>),
        DataType::Timestamp(_, None) => Box::new(None::<NaiveDateTime>),
        other => return Err(unsupported(column, other)),
    };
    Ok(cell)
}

fn unsupported(column: &str, data_type: &DataType) -> SinkError {
    SinkError::UnsupportedType {
        column: column.to_string(),
        data_type: data_type.to_string(),
    }
}
