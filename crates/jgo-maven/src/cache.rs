//! The local Maven repository (`~/.m2/repository` or `M2_REPO`) used as the
//! artifact cache, mirroring the remote repository layout.
//!
//! Writers commit files by atomic rename only, so concurrent processes
//! sharing the cache either see an absent entry or a complete one. A present
//! file is always treated as complete.

use std::path::{Path, PathBuf};

use reqwest::Client;

use jgo_util::errors::JgoError;

use crate::download;
use crate::pom::{self, Pom};
use crate::repository::MavenRepository;

/// The on-disk local repository.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The root directory of this cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory within the cache for a given Maven coordinate.
    pub fn artifact_dir(&self, group: &str, artifact: &str, version: &str) -> PathBuf {
        self.root
            .join(group.replace('.', "/"))
            .join(artifact)
            .join(version)
    }

    /// Path to a specific file in the cache.
    pub fn file_path(&self, group: &str, artifact: &str, version: &str, filename: &str) -> PathBuf {
        self.artifact_dir(group, artifact, version).join(filename)
    }

    /// Fetch a text file (POM, metadata), consulting the cache first.
    ///
    /// `force` re-fetches from the remotes even on a cache hit (used by
    /// `--update` for metadata revalidation). Returns `None` when no
    /// configured repository carries the file or `offline` blocks the fetch.
    #[allow(clippy::too_many_arguments)]
    pub async fn fetch_text(
        &self,
        client: &Client,
        repos: &[MavenRepository],
        offline: bool,
        force: bool,
        group: &str,
        artifact: &str,
        version: &str,
        filename: &str,
    ) -> miette::Result<Option<String>> {
        let path = self.file_path(group, artifact, version, filename);
        if path.is_file() && !force {
            let content = std::fs::read_to_string(&path).map_err(JgoError::Io)?;
            return Ok(Some(content));
        }
        if offline {
            return Ok(path
                .is_file()
                .then(|| std::fs::read_to_string(&path).ok())
                .flatten());
        }

        for repo in repos {
            let url = repo.file_url(group, artifact, version, filename);
            if let Some(content) = download::download_text(client, &url).await? {
                jgo_util::fs::write_atomic(&path, content.as_bytes()).map_err(JgoError::Io)?;
                return Ok(Some(content));
            }
        }

        Ok(None)
    }

    /// Fetch and parse a POM, consulting the cache first.
    pub async fn fetch_pom(
        &self,
        client: &Client,
        repos: &[MavenRepository],
        offline: bool,
        group: &str,
        artifact: &str,
        version: &str,
    ) -> miette::Result<Option<Pom>> {
        let filename = format!("{artifact}-{version}.pom");
        match self
            .fetch_text(client, repos, offline, false, group, artifact, version, &filename)
            .await?
        {
            Some(xml) => Ok(Some(pom::parse_pom(&xml)?)),
            None => Ok(None),
        }
    }

    /// Fetch artifact-level `maven-metadata.xml` for version resolution.
    ///
    /// Metadata lives above the version directories, so the cache path uses
    /// the artifact directory directly.
    #[allow(clippy::too_many_arguments)]
    pub async fn fetch_metadata(
        &self,
        client: &Client,
        repos: &[MavenRepository],
        offline: bool,
        force: bool,
        group: &str,
        artifact: &str,
    ) -> miette::Result<Option<String>> {
        let path = self
            .root
            .join(group.replace('.', "/"))
            .join(artifact)
            .join("maven-metadata.xml");
        if path.is_file() && !force {
            return Ok(Some(std::fs::read_to_string(&path).map_err(JgoError::Io)?));
        }
        if offline {
            return Ok(path
                .is_file()
                .then(|| std::fs::read_to_string(&path).ok())
                .flatten());
        }

        for repo in repos {
            let url = repo.metadata_url(group, artifact);
            if let Some(content) = download::download_text(client, &url).await? {
                jgo_util::fs::write_atomic(&path, content.as_bytes()).map_err(JgoError::Io)?;
                return Ok(Some(content));
            }
        }

        Ok(None)
    }

    /// Fetch a binary artifact into the cache, returning its local path and
    /// SHA-256. Large bodies are streamed; the rename is the commit point.
    ///
    /// Downloads are verified against checksum sidecars when the repository
    /// publishes them.
    #[allow(clippy::too_many_arguments)]
    pub async fn fetch_artifact(
        &self,
        client: &Client,
        repos: &[MavenRepository],
        offline: bool,
        group: &str,
        artifact: &str,
        version: &str,
        filename: &str,
        remote_filename: &str,
    ) -> miette::Result<Option<(PathBuf, String)>> {
        let path = self.file_path(group, artifact, version, filename);
        if path.is_file() {
            let sha256 = jgo_util::hash::sha256_file(&path).map_err(JgoError::Io)?;
            return Ok(Some((path, sha256)));
        }
        if offline {
            return Ok(None);
        }

        for repo in repos {
            let url = repo.file_url(group, artifact, version, remote_filename);
            let label = filename.to_string();
            if download::download_to_file(client, &url, &path, &label)
                .await?
                .is_some()
            {
                crate::checksum::verify_file(client, &url, &path).await?;
                let sha256 = jgo_util::hash::sha256_file(&path).map_err(JgoError::Io)?;
                return Ok(Some((path, sha256)));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_layout_mirrors_maven() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = LocalRepository::new(tmp.path().to_path_buf());
        let path = cache.file_path(
            "org.python",
            "jython-standalone",
            "2.7.3",
            "jython-standalone-2.7.3.jar",
        );
        assert_eq!(
            path,
            tmp.path()
                .join("org/python/jython-standalone/2.7.3/jython-standalone-2.7.3.jar")
        );
    }

    #[tokio::test]
    async fn offline_cache_hit_and_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = LocalRepository::new(tmp.path().to_path_buf());
        let client = download::build_client().unwrap();
        let repos = vec![MavenRepository::maven_central()];

        // Miss: offline with an empty cache resolves to None without touching
        // the network.
        let miss = cache
            .fetch_text(&client, &repos, true, false, "g", "a", "1", "a-1.pom")
            .await
            .unwrap();
        assert!(miss.is_none());

        // Hit: a present file is returned as-is.
        let path = cache.file_path("g", "a", "1", "a-1.pom");
        jgo_util::fs::write_atomic(&path, b"<project/>").unwrap();
        let hit = cache
            .fetch_text(&client, &repos, true, false, "g", "a", "1", "a-1.pom")
            .await
            .unwrap();
        assert_eq!(hit.as_deref(), Some("<project/>"));
    }

    #[tokio::test]
    async fn offline_artifact_hit_returns_hash() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = LocalRepository::new(tmp.path().to_path_buf());
        let client = download::build_client().unwrap();

        let path = cache.file_path("g", "a", "1.0", "a-1.0.jar");
        jgo_util::fs::write_atomic(&path, b"jar bytes").unwrap();

        let (found, sha256) = cache
            .fetch_artifact(&client, &[], true, "g", "a", "1.0", "a-1.0.jar", "a-1.0.jar")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, path);
        assert_eq!(sha256, jgo_util::hash::sha256_bytes(b"jar bytes"));
    }
}
