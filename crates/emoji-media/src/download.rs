//! Streaming HTTP download of provider output.

use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Stream `url` into `dest`, returning the number of bytes written.
///
/// Any non-2xx response is a download failure; the partial file is left
/// for the caller's scratch directory to clean up.
pub async fn download_to_file(client: &Client, url: &str, dest: &Path) -> MediaResult<u64> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::download_failed(format!(
            "server returned {}",
            status
        )));
    }

    let mut file = File::create(dest).await.map_err(|e| {
        MediaError::download_failed(format!("cannot create {}: {}", dest.display(), e))
    })?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| MediaError::download_failed(e.to_string()))?;
        file.write_all(&chunk).await.map_err(write_failed)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(write_failed)?;

    debug!(bytes = written, dest = %dest.display(), "Download complete");
    Ok(written)
}

fn write_failed(err: std::io::Error) -> MediaError {
    MediaError::download_failed(format!("write failed: {}", err))
}
