use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use std::collections::VecDeque;

use crate::errors::SourceError;
use crate::source::Source;

/// Replays a fixed list of batches.
pub struct MemorySource {
    sample: RecordBatch,
    batches: VecDeque<RecordBatch>,
}

impl MemorySource {
    /// The sample is the first `sample_rows` rows of the first batch, or an
    /// empty batch of `schema` when there are no batches.
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>, sample_rows: usize) -> Self {
        let sample = match batches.first() {
            Some(first) => first.slice(0, sample_rows.min(first.num_rows())),
            None => RecordBatch::new_empty(schema),
        };
        Self {
            sample,
            batches: batches.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

impl Source for MemorySource {
    fn sample(&self) -> &RecordBatch {
        &self.sample
    }

    async fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        Ok(self.batches.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array};
    use std::sync::Arc;

    fn ids(values: Vec<i64>) -> RecordBatch {
        RecordBatch::try_from_iter(vec![("id", Arc::new(Int64Array::from(values)) as ArrayRef)]).unwrap()
    }

    #[tokio::test]
    async fn test_replays_batches_in_order() {
        let first = ids(vec![1, 2, 3, 4, 5, 6, 7]);
        let second = ids(vec![8]);
        let mut source = MemorySource::new(first.schema(), vec![first.clone(), second.clone()], 5);

        assert_eq!(source.sample().num_rows(), 5);
        assert_eq!(source.next_batch().await.unwrap(), Some(first));
        assert_eq!(source.next_batch().await.unwrap(), Some(second));
        assert_eq!(source.next_batch().await.unwrap(), None);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_empty_source_keeps_schema() {
        let schema = ids(vec![]).schema();
        let source = MemorySource::new(schema.clone(), vec![], 5);
        assert_eq!(source.sample().schema(), schema);
        assert_eq!(source.sample().num_rows(), 0);
    }
}
