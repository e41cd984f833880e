//! Blocking archive download for JDK provisioning.
//!
//! Provisioning runs on a blocking worker thread (it happens at most once
//! per JDK version), so the simple blocking client is the right tool here.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use jgo_util::errors::JgoError;

/// Download a file from `url` to `dest`, showing a progress bar.
/// Returns the path written.
pub fn download_file(url: &str, dest: &Path) -> miette::Result<PathBuf> {
    tracing::info!("downloading {}", url);

    let resp = reqwest::blocking::Client::builder()
        .user_agent(concat!("jgo/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| JgoError::Network {
            message: format!("failed to build HTTP client: {e}"),
        })?
        .get(url)
        .send()
        .map_err(|e| JgoError::Network {
            message: format!("failed to download {url}: {e}"),
        })?;

    if !resp.status().is_success() {
        return Err(JgoError::Network {
            message: format!("HTTP {} for {url}", resp.status()),
        }
        .into());
    }

    let total = resp.content_length().unwrap_or(0);
    let pb = if total > 0 {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::with_template("  {bar:40.cyan/dim} {bytes}/{total_bytes} ({eta})")
                .expect("valid template")
                .progress_chars("##-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut out = std::fs::File::create(dest).map_err(JgoError::Io)?;
    let mut reader = resp;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).map_err(|e| JgoError::Network {
            message: format!("read error: {e}"),
        })?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).map_err(JgoError::Io)?;
        if let Some(ref pb) = pb {
            pb.inc(n as u64);
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    Ok(dest.to_path_buf())
}
