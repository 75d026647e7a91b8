use serde::Serialize;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ingest_core=info,ingest_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestMetrics {
    pub total_rows: u64,
    pub batches_processed: usize,
    pub avg_batch_size: f64,
    pub slowest_batch_secs: f64,
    pub elapsed_secs: f64,
}

impl IngestMetrics {
    pub fn record_batch(&mut self, rows: u64, elapsed: Duration) {
        self.total_rows += rows;
        self.batches_processed += 1;
        self.avg_batch_size = self.total_rows as f64 / self.batches_processed as f64;
        self.slowest_batch_secs = self.slowest_batch_secs.max(elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_batch() {
        let mut metrics = IngestMetrics::default();
        metrics.record_batch(30, Duration::from_millis(200));
        metrics.record_batch(10, Duration::from_millis(50));

        assert_eq!(metrics.total_rows, 40);
        assert_eq!(metrics.batches_processed, 2);
        assert_eq!(metrics.avg_batch_size, 20.0);
        assert_eq!(metrics.slowest_batch_secs, 0.2);
    }
}
