//! Artifact checksum verification against repository sidecar files
//! (SHA-256, SHA-1, MD5).

use std::io::Read;
use std::path::Path;

use md5::Md5;
use reqwest::Client;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use jgo_util::errors::JgoError;

use crate::download;

/// Verify a downloaded file against checksum sidecars from the repository.
///
/// Tries `.sha256` first, then `.sha1`, then `.md5`. A missing sidecar is
/// logged and accepted; a mismatching one is an error.
pub async fn verify_file(client: &Client, file_url: &str, path: &Path) -> miette::Result<()> {
    let sha256_url = format!("{file_url}.sha256");
    if let Some(expected) = download::download_text(client, &sha256_url).await? {
        let actual = jgo_util::hash::sha256_file(path).map_err(JgoError::Io)?;
        return check(&actual, &extract_hash(&expected), "SHA-256", file_url);
    }

    let sha1_url = format!("{file_url}.sha1");
    if let Some(expected) = download::download_text(client, &sha1_url).await? {
        let actual = digest_file::<Sha1>(path)?;
        return check(&actual, &extract_hash(&expected), "SHA-1", file_url);
    }

    let md5_url = format!("{file_url}.md5");
    if let Some(expected) = download::download_text(client, &md5_url).await? {
        let actual = digest_file::<Md5>(path)?;
        return check(&actual, &extract_hash(&expected), "MD5", file_url);
    }

    tracing::warn!("no checksum sidecar found for {file_url}");
    Ok(())
}

fn check(actual: &str, expected: &str, algo: &str, url: &str) -> miette::Result<()> {
    if actual.eq_ignore_ascii_case(expected) {
        tracing::debug!("{algo} ok for {url}");
        Ok(())
    } else {
        Err(JgoError::Network {
            message: format!("{algo} mismatch for {url}: expected {expected}, got {actual}"),
        }
        .into())
    }
}

/// Extract the hex hash from a checksum file.
///
/// Maven checksum files may contain just the hash, or `hash  filename`.
fn extract_hash(content: &str) -> String {
    content.split_whitespace().next().unwrap_or("").to_string()
}

fn digest_file<D: Digest>(path: &Path) -> miette::Result<String> {
    let file = std::fs::File::open(path).map_err(JgoError::Io)?;
    let mut reader = std::io::BufReader::with_capacity(64 * 1024, file);
    let mut hasher = D::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(JgoError::Io)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    Ok(out)
}
