//! Prepares the local CSV file the pipeline reads from.
//!
//! Files are cached in the data directory: a CSV that already exists is used
//! as is, a Parquet file that already exists is converted without being
//! downloaded again.

pub mod convert;
pub mod download;

use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

use crate::config::SourceConfig;
use crate::errors::FetchError;

pub use self::convert::{convert_parquet_to_csv, parquet_to_csv};
pub use self::download::download_file;

/// Where a dataset url lands on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFiles {
    pub download: PathBuf,
    pub csv: PathBuf,
}

impl LocalFiles {
    pub fn is_parquet(&self) -> bool {
        self.download != self.csv
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// The CSV was already on disk.
    Cached,
    /// A local Parquet file was converted.
    Converted,
    /// The dataset was downloaded (and converted when it is Parquet).
    Downloaded,
}

#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub csv_path: PathBuf,
    pub status: SourceStatus,
}

/// Local file names derive from the last path segment of the url; a
/// `.parquet` file gets a `.csv` sibling.
pub fn local_paths(url: &str, data_dir: &Path) -> Result<LocalFiles, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "url has no file name".to_string(),
        })?;

    let download = data_dir.join(name);
    let csv = match name.strip_suffix(".parquet") {
        Some(stem) => data_dir.join(format!("{stem}.csv")),
        None => download.clone(),
    };
    Ok(LocalFiles { download, csv })
}

pub async fn prepare_source(client: &Client, config: &SourceConfig) -> Result<PreparedSource, FetchError> {
    let files = local_paths(&config.url, &config.data_dir)?;

    if files.csv.exists() {
        info!("{} already exists!", files.csv.display());
        return Ok(PreparedSource {
            csv_path: files.csv,
            status: SourceStatus::Cached,
        });
    }

    let mut status = SourceStatus::Converted;
    if !files.download.exists() {
        download_file(client, &config.url, &files.download).await?;
        status = SourceStatus::Downloaded;
    }

    if files.is_parquet() {
        convert_parquet_to_csv(files.download.clone(), files.csv.clone()).await?;
    }

    Ok(PreparedSource {
        csv_path: files.csv,
        status,
    })
}

/// Sibling path written to before the final rename, so an interrupted run
/// never leaves a partial file under the cached name.
pub(crate) fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> FetchError + '_ {
    move |source| FetchError::Io {
        path: path.display().to_string(),
        source,
    }
}
