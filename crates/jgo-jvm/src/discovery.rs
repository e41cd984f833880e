//! JVM discovery: probe `JAVA_HOME` and `PATH`, parse `java -version`
//! output, and enforce the environment's minimum release.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use jgo_util::errors::JgoError;

/// A usable Java runtime.
#[derive(Debug, Clone)]
pub struct Jvm {
    pub java_bin: PathBuf,
    /// Major release (8, 11, 17, ...).
    pub version: u32,
}

/// Name of the `java` launcher binary on this platform.
pub fn java_binary_name() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// Locate a system JVM satisfying `min_version`.
///
/// Probe order: `JAVA_HOME`, then every `PATH` entry. An incompatible JVM
/// is an error that names both versions so the user knows what to fix.
pub fn locate_system(min_version: u32) -> miette::Result<Jvm> {
    let mut best: Option<Jvm> = None;

    for candidate in system_candidates() {
        if let Some(jvm) = validate(&candidate) {
            if jvm.version >= min_version {
                return Ok(jvm);
            }
            if best.as_ref().map_or(true, |b| jvm.version > b.version) {
                best = Some(jvm);
            }
        }
    }

    match best {
        Some(jvm) => Err(JgoError::JvmCompatibility {
            message: format!(
                "system Java {} at {} is older than the required Java {min_version}",
                jvm.version,
                jvm.java_bin.display()
            ),
        }
        .into()),
        None => Err(JgoError::JvmCompatibility {
            message: format!(
                "no java executable found on JAVA_HOME or PATH (need Java {min_version})"
            ),
        }
        .into()),
    }
}

fn system_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(home) = std::env::var("JAVA_HOME") {
        if !home.is_empty() {
            candidates.push(Path::new(&home).join("bin").join(java_binary_name()));
        }
    }
    if let Ok(path) = std::env::var("PATH") {
        for dir in std::env::split_paths(&path) {
            candidates.push(dir.join(java_binary_name()));
        }
    }
    candidates
}

/// Validate a JDK home directory by running its `java -version`.
pub fn validate_home(home: &Path) -> Option<Jvm> {
    validate(&home.join("bin").join(java_binary_name()))
}

fn validate(java_bin: &Path) -> Option<Jvm> {
    if !java_bin.is_file() {
        return None;
    }
    let output = Command::new(java_bin).arg("-version").output().ok()?;
    // `java -version` historically prints to stderr.
    let stderr = String::from_utf8_lossy(&output.stderr);
    let version = parse_java_version(&stderr)?;
    Some(Jvm {
        java_bin: java_bin.to_path_buf(),
        version,
    })
}

/// Parse the major release from `java -version` output.
///
/// Handles the old scheme (`"1.8.0_292"` is Java 8) and the new one
/// (`"11.0.2"` is Java 11).
pub fn parse_java_version(output: &str) -> Option<u32> {
    for line in output.lines() {
        let Some(start) = line.find('"') else { continue };
        let Some(end) = line[start + 1..].find('"') else {
            continue;
        };
        let full = &line[start + 1..start + 1 + end];
        let major = if let Some(rest) = full.strip_prefix("1.") {
            rest.split(['.', '_']).next().unwrap_or(rest)
        } else {
            full.split('.').next().unwrap_or(full)
        };
        if let Ok(v) = major.parse() {
            return Some(v);
        }
    }
    None
}

/// Managed JDKs under `jdks_dir`, preferring the highest version that
/// satisfies `min_version`.
pub fn discover_managed(jdks_dir: &Path, min_version: u32) -> Option<Jvm> {
    let mut found: Vec<Jvm> = fs::read_dir(jdks_dir)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .filter_map(|entry| validate_home(&entry.path()))
        .filter(|jvm| jvm.version >= min_version)
        .collect();
    found.sort_by(|a, b| b.version.cmp(&a.version));
    found.into_iter().next()
}
