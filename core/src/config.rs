use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::ConfigError;

/// PostgreSQL identifiers longer than this are silently truncated by the server.
const MAX_IDENTIFIER_BYTES: usize = 63;

pub const DEFAULT_TIMESTAMP_COLUMNS: [&str; 2] = ["tpep_pickup_datetime", "tpep_dropoff_datetime"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IngestConfig {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub db_name: String,
    pub table_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub url: String,
    /// Directory holding the downloaded and converted files between runs.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub batch_size: usize,
    pub row_limit: Option<usize>,
    pub sample_rows: usize,
    pub timestamp_columns: Vec<String>,
}

fn default_port() -> u16 {
    5432
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            host: "localhost".to_string(),
            port: default_port(),
            db_name: String::new(),
            table_name: String::new(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: 100_000,
            row_limit: None,
            sample_rows: 5,
            timestamp_columns: DEFAULT_TIMESTAMP_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

/// Loads the base configuration: the given YAML file, else `INGEST_CONFIG`
/// when set, else defaults.
pub fn load_config(config_path: Option<&str>) -> Result<IngestConfig, ConfigError> {
    match config_path {
        Some(path) => IngestConfig::from_file(path),
        None if std::env::var_os("INGEST_CONFIG").is_some() => IngestConfig::from_env(),
        None => Ok(IngestConfig::default()),
    }
}

impl IngestConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            origin: path.to_string(),
            error: Box::new(e),
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let config_str = std::env::var("INGEST_CONFIG").map_err(|_| ConfigError::MissingField {
            field: "INGEST_CONFIG".to_string(),
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: IngestConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;
        if db.user.is_empty() {
            return Err(invalid("Database user cannot be empty"));
        }
        if db.host.is_empty() {
            return Err(invalid("Database host cannot be empty"));
        }
        if db.port == 0 {
            return Err(invalid("Database port cannot be 0"));
        }
        if db.db_name.is_empty() {
            return Err(invalid("Database name cannot be empty"));
        }
        validate_table_name(&db.table_name)?;

        if self.source.url.is_empty() {
            return Err(invalid("Dataset url cannot be empty"));
        }

        let processing = &self.processing;
        if processing.batch_size == 0 {
            return Err(invalid("Batch size must be positive"));
        }
        if processing.sample_rows == 0 {
            return Err(invalid("Sample rows must be positive"));
        }
        if processing.timestamp_columns.iter().any(|c| c.is_empty()) {
            return Err(invalid("Timestamp column names cannot be empty"));
        }
        Ok(())
    }
}

fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(invalid("Table name cannot be empty"));
    }
    if name.len() > MAX_IDENTIFIER_BYTES {
        return Err(invalid(&format!(
            "Table name {name} is longer than {MAX_IDENTIFIER_BYTES} bytes"
        )));
    }
    if name.contains('\0') {
        return Err(invalid("Table name cannot contain NUL"));
    }
    Ok(())
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_CONFIG: &str = r#"
database:
  user: root
  password: root
  host: localhost
  port: 5433
  db_name: ny_taxi
  table_name: yellow_taxi_data
source:
  url: https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_2021-01.parquet
processing:
  batch_size: 100000
  row_limit: 500000
"#;

    fn create_test_config() -> IngestConfig {
        IngestConfig::from_yaml(SAMPLE_CONFIG).unwrap()
    }

    #[test]
    fn test_parse_yaml_config() {
        let config = create_test_config();

        assert_eq!(config.database.port, 5433);
        assert_eq!(config.database.table_name, "yellow_taxi_data");
        assert_eq!(config.source.data_dir, PathBuf::from("data"));
        assert_eq!(config.processing.row_limit, Some(500_000));
        // fields absent from the file fall back to defaults
        assert_eq!(config.processing.sample_rows, 5);
        assert_eq!(
            config.processing.timestamp_columns,
            vec!["tpep_pickup_datetime", "tpep_dropoff_datetime"]
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_CONFIG.as_bytes()).unwrap();

        let config = IngestConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.database.db_name, "ny_taxi");
    }

    #[test]
    fn test_from_missing_file() {
        let err = IngestConfig::from_file("/nonexistent/ingest.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = create_test_config();
        config.processing.batch_size = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Batch size must be positive"));
    }

    #[test]
    fn test_validate_rejects_bad_table_names() {
        let mut config = create_test_config();

        config.database.table_name = String::new();
        assert!(config.validate().is_err());

        config.database.table_name = "t".repeat(64);
        assert!(config.validate().is_err());

        config.database.table_name = "t".repeat(63);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let mut config = create_test_config();
        config.source.url.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_is_incomplete() {
        assert!(IngestConfig::default().validate().is_err());
    }
}
