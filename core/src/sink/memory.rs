use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::errors::SinkError;
use crate::sink::{Sink, pg_types};

/// A table kept in memory by [`MemorySink`].
#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl MemoryTable {
    pub fn row_count(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn column_names(&self) -> Vec<String> {
        column_names(&self.schema)
    }
}

/// Holds tables in memory with the same replace-then-append semantics as
/// [`PostgresSink`](crate::sink::PostgresSink). Used for dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: HashMap<String, MemoryTable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }
}

impl Sink for MemorySink {
    async fn create_table(&mut self, table: &str, schema: &Schema) -> Result<(), SinkError> {
        // reject what postgres would reject
        pg_types(schema)?;

        let replaced = self
            .tables
            .insert(
                table.to_string(),
                MemoryTable {
                    schema: Arc::new(schema.clone()),
                    batches: Vec::new(),
                },
            )
            .is_some();
        info!(table, replaced, "Created in-memory table");
        Ok(())
    }

    async fn append(&mut self, table: &str, batch: &RecordBatch) -> Result<u64, SinkError> {
        let target = self
            .tables
            .get_mut(table)
            .ok_or_else(|| SinkError::UnknownTable {
                table: table.to_string(),
            })?;

        let expected = target.column_names();
        let actual = column_names(&batch.schema());
        if expected != actual {
            return Err(SinkError::SchemaMismatch {
                table: table.to_string(),
                expected,
                actual,
            });
        }

        target.batches.push(batch.clone());
        Ok(batch.num_rows() as u64)
    }
}

fn column_names(schema: &Schema) -> Vec<String> {
    schema.fields().iter().map(|f| f.name().clone()).collect()
}
