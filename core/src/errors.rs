use arrow::error::ArrowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Configuration error")]
    Config(#[from] ConfigError),

    #[error("Fetch error")]
    Fetch(#[from] FetchError),

    #[error("Data source error")]
    Source(#[from] SourceError),

    #[error("Transform error")]
    Transform(#[from] TransformError),

    #[error("Sink error")]
    Sink(#[from] SinkError),

    #[error("Batch {batch} failed")]
    BatchFailed {
        batch: usize,
        #[source]
        source: Box<IngestionError>,
    },

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Generic(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Failed to load configuration from {origin}")]
    LoadFailed {
        origin: String,
        #[source]
        error: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid dataset url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Download of {url} failed")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to convert {path} to csv: {reason}")]
    Conversion { path: String, reason: String },

    #[error("IO error on {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open source file {path}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Source {path} has no columns")]
    NoColumns { path: String },

    #[error("Failed to infer schema of {path}")]
    SchemaInference {
        path: String,
        #[source]
        source: ArrowError,
    },

    #[error("Failed to read batch from source")]
    Read(#[source] ArrowError),
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Batch is missing timestamp column {column}")]
    MissingColumn { column: String },

    #[error("Failed to convert column {column} to timestamp")]
    TimestampCast {
        column: String,
        #[source]
        source: ArrowError,
    },

    #[error("Failed to rebuild record batch")]
    Rebuild(#[source] ArrowError),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to connect to database: {reason}")]
    Connection { reason: String },

    #[error("Failed to create table {table}: {reason}")]
    TableCreation { table: String, reason: String },

    #[error("Failed to write to table {table}: {reason}")]
    Write { table: String, reason: String },

    #[error("Query failed: {reason}")]
    Query { reason: String },

    #[error("Table {table} does not exist")]
    UnknownTable { table: String },

    #[error("Value of column {column} cannot be written: {reason}")]
    Value { column: String, reason: String },

    #[error("Column {column} has unsupported type {data_type}")]
    UnsupportedType { column: String, data_type: String },

    #[error("Batch columns do not match table {table}: expected {expected:?}, got {actual:?}")]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, IngestionError>;

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Invalid {
            message: err.to_string(),
        }
    }
}

impl IngestionError {
    pub(crate) fn at_batch(batch: usize, err: impl Into<IngestionError>) -> Self {
        IngestionError::BatchFailed {
            batch,
            source: Box::new(err.into()),
        }
    }

    /// The batch number a failure happened at, if it happened inside the loop.
    pub fn failed_batch(&self) -> Option<usize> {
        match self {
            IngestionError::BatchFailed { batch, .. } => Some(*batch),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Renders the error and its sources the way the runner prints them.
    fn chain(error: IngestionError) -> String {
        format!("{:#}", anyhow::Error::from(error))
    }

    #[test]
    fn test_error_chain_display() {
        let inner_error = ConfigError::MissingField {
            field: "user".to_string(),
        };
        let outer_error = IngestionError::Config(inner_error);

        assert_eq!(outer_error.to_string(), "Configuration error");
        assert_eq!(
            chain(outer_error),
            "Configuration error: Missing required field: user"
        );
    }

    #[test]
    fn test_batch_failed_keeps_batch_number() {
        let error = IngestionError::at_batch(
            3,
            TransformError::MissingColumn {
                column: "tpep_pickup_datetime".to_string(),
            },
        );

        assert_eq!(error.failed_batch(), Some(3));
        assert_eq!(error.to_string(), "Batch 3 failed");
        // each message shows up once in the rendered chain
        assert_eq!(
            chain(error),
            "Batch 3 failed: Transform error: Batch is missing timestamp column tpep_pickup_datetime"
        );
    }

    #[test]
    fn test_load_failure_names_cause_once() {
        let error = IngestionError::Config(ConfigError::LoadFailed {
            origin: "ingest.yaml".to_string(),
            error: Box::new(std::io::Error::new(std::io::ErrorKind::NotFound, "no such file")),
        });

        let rendered = chain(error);
        assert_eq!(rendered.matches("no such file").count(), 1);
        assert!(rendered.starts_with("Configuration error: Failed to load configuration from ingest.yaml"));
    }

    #[test]
    fn test_failed_batch_is_none_outside_loop() {
        let error = IngestionError::Sink(SinkError::Connection {
            reason: "refused".to_string(),
        });
        assert_eq!(error.failed_batch(), None);
    }

    #[test]
    fn test_sink_error_display() {
        let error = SinkError::UnsupportedType {
            column: "payload".to_string(),
            data_type: "Binary".to_string(),
        };

        assert_eq!(error.to_string(), "Column payload has unsupported type Binary");
    }
}
