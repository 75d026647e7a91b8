use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::errors::FetchError;
use crate::fetch::{io_error, part_path};

/// Streams `url` into `dest`, creating parent directories as needed.
/// Returns the number of bytes written.
pub async fn download_file(client: &Client, url: &str, dest: &Path) -> Result<u64, FetchError> {
    let start = Instant::now();
    let download_error = |source| FetchError::Download {
        url: url.to_string(),
        source,
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await.map_err(io_error(parent))?;
    }

    let resp = client
        .get(url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(download_error)?;

    let part = part_path(dest);
    let mut file = fs::File::create(&part).await.map_err(io_error(&part))?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(download_error)?;
        file.write_all(&chunk).await.map_err(io_error(&part))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_error(&part))?;
    drop(file);

    fs::rename(&part, dest).await.map_err(io_error(dest))?;

    info!(
        bytes = written,
        elapsed = ?start.elapsed(),
        "Successfully downloaded: {}",
        dest.display()
    );
    Ok(written)
}
