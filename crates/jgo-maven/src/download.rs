//! Artifact downloading from Maven repositories.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;

use jgo_util::errors::JgoError;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build a shared reqwest client for Maven downloads.
pub fn build_client() -> miette::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("jgo/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            JgoError::Network {
                message: format!("failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// Download raw bytes from a URL with bounded retries.
///
/// Returns `Ok(None)` for 404. Unexpected statuses are logged and also
/// treated as a miss: they are not definitive absence, and another
/// repository may still carry the artifact. 5xx, timeouts, and connection
/// failures are retried before giving up with a `Network` error.
pub async fn download_bytes(client: &Client, url: &str) -> miette::Result<Option<Vec<u8>>> {
    let mut last_err = String::new();

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }

        match client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if status.is_server_error() {
                    last_err = format!("HTTP {status} from {url}");
                    continue;
                }
                if !status.is_success() {
                    tracing::warn!("unexpected HTTP {status} fetching {url}; skipping repository");
                    return Ok(None);
                }

                let bytes = resp.bytes().await.map_err(|e| JgoError::Network {
                    message: format!("failed to read response from {url}: {e}"),
                })?;
                return Ok(Some(bytes.to_vec()));
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_err = format!("{e}");
                continue;
            }
            Err(e) => {
                return Err(JgoError::Network {
                    message: format!("request to {url} failed: {e}"),
                }
                .into());
            }
        }
    }

    Err(JgoError::Network {
        message: format!("failed after {MAX_RETRIES} retries for {url}: {last_err}"),
    }
    .into())
}

/// Download a text file (POM, metadata, checksum sidecar).
pub async fn download_text(client: &Client, url: &str) -> miette::Result<Option<String>> {
    match download_bytes(client, url).await? {
        Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).to_string())),
        None => Ok(None),
    }
}

/// Stream a (possibly large) artifact to `dest` with a progress bar.
///
/// The body is written to a unique temp file beside `dest` and atomically
/// renamed on success, so readers never observe a partial artifact.
/// Returns `Ok(None)` when no repository response carried the artifact.
pub async fn download_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
) -> miette::Result<Option<()>> {
    let resp = client.get(url).send().await.map_err(|e| JgoError::Network {
        message: format!("request to {url} failed: {e}"),
    })?;

    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        tracing::warn!("unexpected HTTP {status} fetching {url}; skipping repository");
        return Ok(None);
    }

    let total = resp.content_length().unwrap_or(0);
    let pb = if total > 100_000 {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::with_template("  {msg} {bar:30.cyan/dim} {bytes}/{total_bytes}")
                .expect("valid template")
                .progress_chars("##-"),
        );
        pb.set_message(label.to_string());
        Some(pb)
    } else {
        None
    };

    let mut tmp = jgo_util::fs::temp_sibling(dest).map_err(JgoError::Io)?;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| JgoError::Network {
            message: format!("failed to read {url}: {e}"),
        })?;
        tmp.write_all(&chunk).map_err(JgoError::Io)?;
        if let Some(ref pb) = pb {
            pb.inc(chunk.len() as u64);
        }
    }
    tmp.flush().map_err(JgoError::Io)?;
    jgo_util::fs::commit_temp(tmp, dest).map_err(JgoError::Io)?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    Ok(Some(()))
}
