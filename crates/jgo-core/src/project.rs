//! The `jgo.toml` project spec: user intent for a reproducible environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use jgo_util::errors::JgoError;

/// File name of the project spec.
pub const SPEC_FILE: &str = "jgo.toml";

/// Entrypoint key used when none is named on the command line.
pub const DEFAULT_ENTRYPOINT: &str = "default";

/// The parsed representation of a `jgo.toml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSpec {
    #[serde(default)]
    pub environment: EnvironmentMeta,

    #[serde(default)]
    pub java: Option<JavaSection>,

    /// Remote repositories by name, in declaration order of the TOML table.
    #[serde(default)]
    pub repositories: BTreeMap<String, String>,

    #[serde(default)]
    pub dependencies: DependencySection,

    /// Named entrypoints. A value containing `:` is a coordinate reference
    /// whose main class is re-inferred on update; otherwise it is a class name.
    #[serde(default)]
    pub entrypoints: BTreeMap<String, String>,

    #[serde(default)]
    pub settings: Option<SettingsSection>,
}

/// `[environment]` metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `[java]` runtime preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JavaSection {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub vendor: Option<String>,
    /// `"auto"` (managed download) or `"system"`.
    #[serde(default)]
    pub source: Option<String>,
}

/// `[dependencies]`: coordinates plus per-dependency exclusions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencySection {
    #[serde(default)]
    pub coordinates: Vec<String>,

    /// Maps `"G:A"` to the `"G:A"` patterns excluded beneath it.
    #[serde(default)]
    pub exclusions: BTreeMap<String, Vec<String>>,
}

/// `[settings]` overrides for this project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsSection {
    #[serde(default)]
    pub links: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
}

impl ProjectSpec {
    /// Parse a `jgo.toml` document.
    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            JgoError::Parse {
                message: format!("invalid {SPEC_FILE}: {e}"),
            }
            .into()
        })
    }

    /// Load a project spec from a file path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(JgoError::Io)?;
        Self::parse_toml(&content)
    }

    /// Find the nearest `jgo.toml` at or above `start`.
    pub fn find(start: &Path) -> Option<PathBuf> {
        jgo_util::fs::find_ancestor_with(start, SPEC_FILE).map(|dir| dir.join(SPEC_FILE))
    }

    /// Look up an entrypoint by name, falling back to `default`.
    pub fn entrypoint(&self, name: Option<&str>) -> Option<&str> {
        self.entrypoints
            .get(name.unwrap_or(DEFAULT_ENTRYPOINT))
            .map(String::as_str)
    }
}

/// Whether an entrypoint value is a coordinate reference (`G:A[...]`) as
/// opposed to a class name. Coordinate references contain a `:`.
pub fn is_coordinate_ref(entrypoint: &str) -> bool {
    entrypoint.contains(':')
}
