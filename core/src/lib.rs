//! Batch ingestion of a tabular dataset into PostgreSQL.
//!
//! The pipeline prepares a local CSV file ([`fetch`]), reads it in bounded
//! batches ([`source`]), converts the timestamp columns ([`transform`]) and
//! appends each batch to a table ([`sink`]). [`ingestor::Ingestor`] drives the
//! loop.

pub mod config;
pub mod errors;
pub mod fetch;
pub mod ingestor;
pub mod sink;
pub mod source;
pub mod telemetry;
pub mod transform;

pub use config::IngestConfig;
pub use errors::{IngestionError, Result};
pub use ingestor::Ingestor;
