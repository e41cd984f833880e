//! The `jgo.lock.toml` lockfile: the concrete outcome of a resolution.
//!
//! The lockfile doubles as the environment's success marker: a workspace
//! without one is treated as unbuilt and rebuilt from scratch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use jgo_util::errors::JgoError;

use crate::project::JavaSection;

/// File name of the lockfile inside an environment directory.
pub const LOCK_FILE: &str = "jgo.lock.toml";

/// Deterministic record of a resolved environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lockfile {
    pub metadata: LockMetadata,

    pub environment: LockedEnvironment,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java: Option<JavaSection>,

    /// Concretized entrypoints: every value is a fully-qualified class name.
    #[serde(default)]
    pub entrypoints: BTreeMap<String, String>,

    #[serde(default)]
    pub dependencies: Vec<LockedDependency>,
}

/// `[metadata]`: provenance and staleness detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Seconds since the Unix epoch at generation time.
    #[serde(default)]
    pub generated: u64,
    #[serde(default)]
    pub tool_version: String,
    /// First 16 hex chars of the SHA-256 of the spec file (project mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_hash: Option<String>,
}

/// `[environment]`: identity and computed requirements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockedEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub min_java_version: u32,
}

/// One `[[dependencies]]` entry with exact coordinates and placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedDependency {
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
    /// Exact version; SNAPSHOT timestamps are crystallized here.
    pub version: String,
    pub packaging: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub is_modular: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    /// `"class-path"` or `"module-path"`.
    pub placement: String,
}

impl LockedDependency {
    /// Sort key producing the lockfile's canonical order.
    fn sort_key(&self) -> (String, String, String, String) {
        (
            self.group_id.clone(),
            self.artifact_id.clone(),
            self.classifier.clone().unwrap_or_default(),
            self.packaging.clone(),
        )
    }
}

impl Lockfile {
    /// Load and parse a lockfile from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(JgoError::Io)?;
        toml::from_str(&content).map_err(|e| {
            JgoError::Parse {
                message: format!("invalid {LOCK_FILE}: {e}"),
            }
            .into()
        })
    }

    /// Serialize to pretty TOML after sorting dependencies canonically.
    ///
    /// Two runs with identical inputs therefore produce byte-identical
    /// lockfiles.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        let mut sorted = self.clone();
        sorted.dependencies.sort_by_key(|d| d.sort_key());
        toml::to_string_pretty(&sorted)
    }

    /// Atomically write the lockfile; this is the environment commit point.
    pub fn write(&self, path: &Path) -> miette::Result<()> {
        let rendered = self.to_string_pretty().map_err(|e| JgoError::Generic {
            message: format!("failed to serialize lockfile: {e}"),
        })?;
        jgo_util::fs::write_atomic(path, rendered.as_bytes()).map_err(JgoError::Io)?;
        Ok(())
    }

    /// Exact version locked for a `groupId:artifactId`, if present.
    pub fn locked_version(&self, group_id: &str, artifact_id: &str) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|d| d.group_id == group_id && d.artifact_id == artifact_id)
            .map(|d| d.version.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dep(group: &str, artifact: &str, version: &str) -> LockedDependency {
        LockedDependency {
            group_id: group.to_string(),
            artifact_id: artifact.to_string(),
            version: version.to_string(),
            packaging: "jar".to_string(),
            classifier: None,
            sha256: Some("ab".repeat(32)),
            is_modular: false,
            module_name: None,
            placement: "class-path".to_string(),
        }
    }

    #[test]
    fn serialization_is_sorted_and_stable() {
        let mut lock = Lockfile {
            environment: LockedEnvironment {
                name: Some("test".to_string()),
                min_java_version: 8,
            },
            ..Default::default()
        };
        lock.dependencies.push(sample_dep("org.z", "last", "1.0"));
        lock.dependencies.push(sample_dep("org.a", "first", "2.0"));

        let one = lock.to_string_pretty().unwrap();
        lock.dependencies.reverse();
        let two = lock.to_string_pretty().unwrap();
        assert_eq!(one, two);

        let a = one.find("org.a").unwrap();
        let z = one.find("org.z").unwrap();
        assert!(a < z);
    }

    #[test]
    fn round_trip_preserves_fields() {
        let mut lock = Lockfile {
            environment: LockedEnvironment {
                name: None,
                min_java_version: 17,
            },
            ..Default::default()
        };
        lock.metadata.spec_hash = Some("0011223344556677".to_string());
        let mut dep = sample_dep("org.slf4j", "slf4j-api", "2.0.9");
        dep.is_modular = true;
        dep.module_name = Some("org.slf4j".to_string());
        dep.placement = "module-path".to_string();
        lock.dependencies.push(dep);
        lock.entrypoints
            .insert("default".to_string(), "org.example.Main".to_string());

        let text = lock.to_string_pretty().unwrap();
        let parsed: Lockfile = toml::from_str(&text).unwrap();
        assert_eq!(parsed.environment.min_java_version, 17);
        assert_eq!(parsed.dependencies.len(), 1);
        assert!(parsed.dependencies[0].is_modular);
        assert_eq!(
            parsed.dependencies[0].module_name.as_deref(),
            Some("org.slf4j")
        );
        assert_eq!(
            parsed.entrypoints.get("default").map(String::as_str),
            Some("org.example.Main")
        );
        assert_eq!(parsed.locked_version("org.slf4j", "slf4j-api"), Some("2.0.9"));
    }

    #[test]
    fn camel_case_keys_in_toml() {
        let lock = Lockfile {
            dependencies: vec![sample_dep("g", "a", "1")],
            ..Default::default()
        };
        let text = lock.to_string_pretty().unwrap();
        assert!(text.contains("groupId"));
        assert!(text.contains("artifactId"));
        assert!(text.contains("is_modular"));
    }
}
