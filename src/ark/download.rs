//! Streaming download of generated assets.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use super::client::ArkError;

/// Generated videos can take a while to fetch; this overrides the client's
/// short request timeout for downloads only.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Stream `url` to `dest`, creating parent directories as needed.
///
/// The body is written chunk by chunk and never held in memory as a whole.
/// A partially written file is left in place when the transfer fails.
///
/// # Returns
///
/// The number of bytes written.
///
/// # Errors
///
/// Returns `ArkError::Api` for a non-2xx response, `ArkError::Http` when the
/// transfer fails, or `ArkError::Io` when writing to disk fails.
pub async fn download_to(http: &reqwest::Client, url: &str, dest: &Path) -> Result<u64, ArkError> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let response = http.get(url).timeout(DOWNLOAD_TIMEOUT).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ArkError::Api {
            status: status.as_u16(),
            message: format!("Video download failed: {}", error_text),
        });
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    log::debug!("Downloaded {} bytes to {}", written, dest.display());

    Ok(written)
}
