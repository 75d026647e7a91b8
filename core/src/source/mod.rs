pub mod csv;
pub mod memory;

use arrow::record_batch::RecordBatch;

use crate::errors::SourceError;

pub use self::csv::CsvSource;
pub use self::memory::MemorySource;

/// A finite, non-restartable sequence of row batches.
#[allow(async_fn_in_trait)]
pub trait Source {
    /// Leading rows of the source, used to lay out the destination table.
    /// Reading the sample does not advance the batch sequence.
    fn sample(&self) -> &RecordBatch;

    /// Receives the next batch of rows.
    ///
    /// `Ok(None)` means the source is exhausted. Errors are real failures and
    /// never stand in for end of data.
    async fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError>;
}
