//! The run context: every flag that influences resolution and
//! materialization, threaded explicitly through the pipeline.
//!
//! No process-global mutable configuration exists; callers build one
//! `RunContext` per invocation and pass it down.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use jgo_util::errors::JgoError;

/// How artifacts are materialized into an environment directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStrategy {
    Hard,
    Soft,
    Copy,
    /// Hard link, falling back to symlink, falling back to copy.
    #[default]
    Auto,
}

impl FromStr for LinkStrategy {
    type Err = JgoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hard" => Ok(Self::Hard),
            "soft" | "symlink" => Ok(Self::Soft),
            "copy" => Ok(Self::Copy),
            "auto" => Ok(Self::Auto),
            other => Err(JgoError::Parse {
                message: format!("unknown link strategy '{other}' (hard|soft|copy|auto)"),
            }),
        }
    }
}

impl std::fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
            Self::Copy => "copy",
            Self::Auto => "auto",
        })
    }
}

/// Where the JVM comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JavaSource {
    /// Probe `JAVA_HOME` and `PATH` only; never download.
    System,
    /// Use a managed JDK, provisioning one on demand.
    #[default]
    Auto,
}

/// JVM preferences for an invocation.
#[derive(Debug, Clone, Default)]
pub struct JavaPrefs {
    pub version: Option<u32>,
    pub vendor: Option<String>,
    pub source: JavaSource,
}

/// Configuration for one resolution-to-materialization run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Forbid all network access; cache misses become `NotFound`.
    pub offline: bool,
    /// Rebuild environments and revalidate SNAPSHOT metadata.
    pub update: bool,
    /// Rebuild environments without revalidating SNAPSHOT metadata.
    pub no_cache: bool,
    /// Downgrade missing POMs and unresolved properties to warnings.
    pub lenient: bool,
    /// Import endpoint coordinates' dependency management (BOM semantics).
    pub managed: bool,
    /// Depth up to which `optional` dependencies are followed. 0 disables.
    pub optional_depth: usize,
    pub links: LinkStrategy,
    /// jgo data directory (environments, managed JDKs).
    pub cache_dir: PathBuf,
    /// Local Maven repository used as the artifact cache.
    pub repo_cache: PathBuf,
    /// Remote repositories `(name, url)` in probe order.
    pub repositories: Vec<(String, String)>,
    /// Extra class-path entries appended at launch.
    pub add_classpath: Vec<String>,
    /// `G:A` patterns excluded from the entire resolution.
    pub global_exclusions: Vec<String>,
    pub class_path_only: bool,
    pub module_path_only: bool,
    pub java: JavaPrefs,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            offline: false,
            update: false,
            no_cache: false,
            lenient: false,
            managed: true,
            optional_depth: 0,
            links: LinkStrategy::Auto,
            cache_dir: jgo_util::dirs_path(),
            repo_cache: default_repo_cache(),
            repositories: Vec::new(),
            add_classpath: Vec::new(),
            global_exclusions: Vec::new(),
            class_path_only: false,
            module_path_only: false,
            java: JavaPrefs::default(),
        }
    }
}

impl RunContext {
    /// Root directory for ad-hoc environments.
    pub fn envs_dir(&self) -> PathBuf {
        self.cache_dir.join("envs")
    }

    /// Root directory for managed JDKs.
    pub fn jdks_dir(&self) -> PathBuf {
        self.cache_dir.join("jdks")
    }
}

/// The local Maven repository: `M2_REPO` if set, else `~/.m2/repository`.
pub fn default_repo_cache() -> PathBuf {
    if let Ok(dir) = std::env::var("M2_REPO") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".m2").join("repository")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_strategy_from_str() {
        assert_eq!(LinkStrategy::from_str("hard").unwrap(), LinkStrategy::Hard);
        assert_eq!(LinkStrategy::from_str("SOFT").unwrap(), LinkStrategy::Soft);
        assert_eq!(LinkStrategy::from_str("auto").unwrap(), LinkStrategy::Auto);
        assert!(LinkStrategy::from_str("bogus").is_err());
    }

    #[test]
    fn defaults_are_managed_auto() {
        let ctx = RunContext::default();
        assert!(ctx.managed);
        assert!(!ctx.offline);
        assert_eq!(ctx.optional_depth, 0);
        assert_eq!(ctx.links, LinkStrategy::Auto);
        assert_eq!(ctx.java.source, JavaSource::Auto);
    }
}
