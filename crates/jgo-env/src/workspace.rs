//! Environment workspace layout and validity.
//!
//! Ad-hoc environments live under
//! `<cache_root>/envs/<group-as-dirs>/<artifact>/<hex16>`; project
//! environments live in `.jgo/` beside the `jgo.toml` that defines them.
//! A workspace is valid iff its lockfile exists and, in project mode, its
//! recorded spec hash still matches the spec file.

use std::path::{Path, PathBuf};

use jgo_core::context::RunContext;
use jgo_core::coordinate::Coordinate;
use jgo_core::lockfile::{Lockfile, LOCK_FILE};
use jgo_util::errors::JgoError;

/// Directory name for project-mode workspaces.
pub const PROJECT_WORKSPACE_DIR: &str = ".jgo";

/// Subdirectory holding non-modular JARs.
pub const JARS_DIR: &str = "jars";

/// Subdirectory holding modular JARs.
pub const MODULES_DIR: &str = "modules";

/// A resolved workspace location.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub dir: PathBuf,
    /// Expected spec hash (project mode only).
    pub spec_hash: Option<String>,
}

impl Workspace {
    /// Ad-hoc workspace for a cache key, named after the primary coordinate.
    pub fn adhoc(ctx: &RunContext, primary: &Coordinate, key: &str) -> Self {
        let dir = ctx
            .envs_dir()
            .join(primary.group_id.replace('.', "/"))
            .join(&primary.artifact_id)
            .join(&key[..16.min(key.len())]);
        Self {
            dir,
            spec_hash: None,
        }
    }

    /// Project workspace beside a `jgo.toml`, keyed by the spec file's hash.
    pub fn project(spec_path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(spec_path).map_err(JgoError::Io)?;
        let spec_hash = jgo_util::hash::sha256_hex_prefix(&content, 16);
        let dir = spec_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(PROJECT_WORKSPACE_DIR);
        Ok(Self {
            dir,
            spec_hash: Some(spec_hash),
        })
    }

    pub fn jars_dir(&self) -> PathBuf {
        self.dir.join(JARS_DIR)
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.dir.join(MODULES_DIR)
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    /// Whether this workspace has a committed build that is still current.
    ///
    /// The lockfile's presence is the success marker; a half-built
    /// workspace never has one and is rebuilt on the next run.
    pub fn is_valid(&self) -> bool {
        let path = self.lockfile_path();
        if !path.is_file() {
            return false;
        }
        match &self.spec_hash {
            None => true,
            Some(expected) => Lockfile::from_path(&path)
                .ok()
                .and_then(|lock| lock.metadata.spec_hash)
                .is_some_and(|actual| actual == *expected),
        }
    }

    /// Remove any previously materialized JARs ahead of a rebuild, leaving
    /// the workspace unmarked until the new lockfile lands.
    pub fn clear(&self) -> miette::Result<()> {
        let _ = std::fs::remove_file(self.lockfile_path());
        for dir in [self.jars_dir(), self.modules_dir()] {
            if dir.is_dir() {
                std::fs::remove_dir_all(&dir).map_err(JgoError::Io)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jgo_core::lockfile::{LockMetadata, LockedEnvironment};

    #[test]
    fn adhoc_layout_groups_by_coordinate() {
        let ctx = RunContext {
            cache_dir: PathBuf::from("/cache"),
            ..RunContext::default()
        };
        let primary = Coordinate::new("org.python", "jython-standalone", "2.7.3");
        let ws = Workspace::adhoc(&ctx, &primary, "0123456789abcdef0123456789abcdef");
        assert_eq!(
            ws.dir,
            PathBuf::from("/cache/envs/org/python/jython-standalone/0123456789abcdef")
        );
    }

    #[test]
    fn missing_lockfile_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace {
            dir: tmp.path().to_path_buf(),
            spec_hash: None,
        };
        assert!(!ws.is_valid());
    }

    #[test]
    fn lockfile_presence_marks_validity() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace {
            dir: tmp.path().to_path_buf(),
            spec_hash: None,
        };
        let lock = Lockfile {
            environment: LockedEnvironment {
                name: None,
                min_java_version: 8,
            },
            ..Default::default()
        };
        lock.write(&ws.lockfile_path()).unwrap();
        assert!(ws.is_valid());
    }

    #[test]
    fn spec_hash_mismatch_invalidates() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace {
            dir: tmp.path().to_path_buf(),
            spec_hash: Some("expected_hash_16".to_string()),
        };
        let lock = Lockfile {
            metadata: LockMetadata {
                spec_hash: Some("different_hash00".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        lock.write(&ws.lockfile_path()).unwrap();
        assert!(!ws.is_valid());

        let lock = Lockfile {
            metadata: LockMetadata {
                spec_hash: Some("expected_hash_16".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        lock.write(&ws.lockfile_path()).unwrap();
        assert!(ws.is_valid());
    }

    #[test]
    fn clear_unmarks_the_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace {
            dir: tmp.path().to_path_buf(),
            spec_hash: None,
        };
        std::fs::create_dir_all(ws.jars_dir()).unwrap();
        std::fs::write(ws.jars_dir().join("a.jar"), b"x").unwrap();
        Lockfile::default().write(&ws.lockfile_path()).unwrap();

        ws.clear().unwrap();
        assert!(!ws.is_valid());
        assert!(!ws.jars_dir().exists());
    }
}
