//! Managed JDK provisioning: download a matching JDK into the jgo cache
//! when no local one suffices.
//!
//! Provisioning is idempotent and safe under concurrent invocation: a
//! per-version lock file serializes downloads, and an already-valid
//! installation short-circuits before any network access.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use dialoguer::Select;

use jgo_util::errors::JgoError;

use crate::discovery::{self, Jvm};
use crate::download;

const LOCK_WAIT: Duration = Duration::from_secs(300);
const LOCK_POLL: Duration = Duration::from_millis(500);

/// JDK distributions jgo can provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JdkDistribution {
    Temurin,
    Corretto,
    Zulu,
}

impl JdkDistribution {
    /// Parse a `--java-vendor` value.
    pub fn from_vendor(vendor: &str) -> Result<Self, JgoError> {
        match vendor.to_ascii_lowercase().as_str() {
            "temurin" | "adoptium" | "eclipse" => Ok(Self::Temurin),
            "corretto" | "amazon" => Ok(Self::Corretto),
            "zulu" | "azul" => Ok(Self::Zulu),
            other => Err(JgoError::Parse {
                message: format!("unknown JDK vendor '{other}' (temurin|corretto|zulu)"),
            }),
        }
    }

    fn dir_prefix(&self) -> &'static str {
        match self {
            Self::Temurin => "temurin",
            Self::Corretto => "corretto",
            Self::Zulu => "zulu",
        }
    }
}

impl std::fmt::Display for JdkDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temurin => write!(f, "Eclipse Temurin"),
            Self::Corretto => write!(f, "Amazon Corretto"),
            Self::Zulu => write!(f, "Azul Zulu"),
        }
    }
}

/// Obtain a JDK of `version`, reusing a cached installation when present.
pub fn get(jdks_dir: &Path, version: u32, vendor: Option<&str>) -> miette::Result<Jvm> {
    let dist = match vendor {
        Some(v) => JdkDistribution::from_vendor(v)?,
        None => prompt_distribution(version)?,
    };
    install_jdk(jdks_dir, version, dist)
}

/// Pick a distribution: interactive terminals get a menu, everything else
/// defaults to Temurin.
fn prompt_distribution(version: u32) -> miette::Result<JdkDistribution> {
    let distributions = [
        JdkDistribution::Temurin,
        JdkDistribution::Corretto,
        JdkDistribution::Zulu,
    ];

    if !atty::is(atty::Stream::Stdin) {
        return Ok(JdkDistribution::Temurin);
    }

    let labels = [
        "Eclipse Temurin (recommended)",
        "Amazon Corretto",
        "Azul Zulu",
    ];
    let selection = Select::new()
        .with_prompt(format!(
            "No suitable JDK found. Which distribution should jgo install? (JDK {version})"
        ))
        .items(&labels)
        .default(0)
        .interact()
        .map_err(|e| JgoError::Generic {
            message: format!("prompt error: {e}"),
        })?;
    Ok(distributions[selection])
}

/// Download and install a JDK into `<jdks_dir>/<dist>-<version>/`.
pub fn install_jdk(
    jdks_dir: &Path,
    version: u32,
    distribution: JdkDistribution,
) -> miette::Result<Jvm> {
    let dir_name = format!("{}-{version}", distribution.dir_prefix());
    let dest = jdks_dir.join(&dir_name);

    if let Some(jvm) = discovery::validate_home(&dest) {
        return Ok(jvm);
    }

    jgo_util::fs::ensure_dir(jdks_dir).map_err(JgoError::Io)?;
    let _lock = VersionLock::acquire(&jdks_dir.join(format!(".{dir_name}.lock")))?;

    // Another process may have finished the install while we waited.
    if let Some(jvm) = discovery::validate_home(&dest) {
        return Ok(jvm);
    }

    let url = jdk_download_url(version, distribution)?;
    jgo_util::progress::status("Installing", &format!("{distribution} JDK {version}"));

    let tmp_dir = tempfile::tempdir().map_err(JgoError::Io)?;
    let archive_name = if url.ends_with(".zip") {
        "jdk.zip"
    } else {
        "jdk.tar.gz"
    };
    let archive_path = tmp_dir.path().join(archive_name);
    download::download_file(&url, &archive_path)?;

    if archive_name.ends_with(".zip") {
        extract_zip_to(&archive_path, &dest)?;
    } else {
        extract_tarball_to(&archive_path, &dest)?;
    }
    flatten_jdk_dir(&dest)?;

    match discovery::validate_home(&dest) {
        Some(jvm) => {
            jgo_util::progress::status(
                "Installed",
                &format!("JDK {} at {}", jvm.version, dest.display()),
            );
            Ok(jvm)
        }
        None => Err(JgoError::Generic {
            message: format!(
                "JDK installation at {} does not contain a working java binary",
                dest.display()
            ),
        }
        .into()),
    }
}

/// Download URL for `(version, distribution)` on the current OS and arch.
pub fn jdk_download_url(version: u32, dist: JdkDistribution) -> miette::Result<String> {
    let os = if cfg!(target_os = "macos") {
        "mac"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        return Err(JgoError::Generic {
            message: "unsupported OS for JDK download".to_string(),
        }
        .into());
    };

    let arch = if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else if cfg!(target_arch = "x86_64") {
        "x64"
    } else {
        return Err(JgoError::Generic {
            message: "unsupported architecture for JDK download".to_string(),
        }
        .into());
    };

    let ext = if cfg!(target_os = "windows") {
        "zip"
    } else {
        "tar.gz"
    };

    match dist {
        JdkDistribution::Temurin => Ok(format!(
            "https://api.adoptium.net/v3/binary/latest/{version}/ga/{os}/{arch}/jdk/hotspot/normal/eclipse?project=jdk",
        )),
        JdkDistribution::Corretto => {
            let corretto_os = match os {
                "mac" => "macosx",
                _ => os,
            };
            Ok(format!(
                "https://corretto.aws/downloads/latest/amazon-corretto-{version}-{arch}-{corretto_os}-jdk.{ext}"
            ))
        }
        JdkDistribution::Zulu => {
            let zulu_os = match os {
                "mac" => "macosx",
                _ => os,
            };
            Ok(format!(
                "https://cdn.azul.com/zulu/bin/zulu{version}.0.0-ca-jdk{version}.0.0-{zulu_os}_{arch}.{ext}"
            ))
        }
    }
}

/// A coarse cross-process lock held while one provisioner downloads.
struct VersionLock {
    path: PathBuf,
}

impl VersionLock {
    fn acquire(path: &Path) -> miette::Result<Self> {
        let deadline = Instant::now() + LOCK_WAIT;
        loop {
            match fs::OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        // Stale lock from a crashed provisioner; take it over.
                        tracing::warn!("breaking stale JDK lock at {}", path.display());
                        let _ = fs::remove_file(path);
                        continue;
                    }
                    std::thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(JgoError::Io(e).into()),
            }
        }
    }
}

impl Drop for VersionLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn extract_zip_to(zip_path: &Path, dest: &Path) -> miette::Result<()> {
    let file = fs::File::open(zip_path).map_err(JgoError::Io)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| JgoError::Generic {
        message: format!("failed to open zip: {e}"),
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| JgoError::Generic {
            message: format!("zip entry error: {e}"),
        })?;
        let out_path = dest.join(entry.mangled_name());
        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(JgoError::Io)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(JgoError::Io)?;
            }
            let mut out = fs::File::create(&out_path).map_err(JgoError::Io)?;
            std::io::copy(&mut entry, &mut out).map_err(|e| JgoError::Generic {
                message: format!("extract error: {e}"),
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    if let Err(e) = fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                    {
                        tracing::warn!("failed to set permissions on {}: {e}", out_path.display());
                    }
                }
            }
        }
    }
    Ok(())
}

fn extract_tarball_to(tar_gz_path: &Path, dest: &Path) -> miette::Result<()> {
    fs::create_dir_all(dest).map_err(JgoError::Io)?;

    let status = Command::new("tar")
        .args(["xzf", &tar_gz_path.to_string_lossy(), "-C"])
        .arg(dest)
        .status()
        .map_err(|e| JgoError::Generic {
            message: format!("failed to run tar: {e}"),
        })?;

    if !status.success() {
        return Err(JgoError::Generic {
            message: format!("tar extraction failed for {}", tar_gz_path.display()),
        }
        .into());
    }
    Ok(())
}

/// If extraction produced a single wrapper directory, promote its contents.
fn flatten_jdk_dir(dir: &Path) -> miette::Result<()> {
    let entries: Vec<_> = fs::read_dir(dir)
        .map_err(JgoError::Io)?
        .filter_map(|e| e.ok())
        .collect();

    if entries.len() != 1 || !entries[0].path().is_dir() {
        return Ok(());
    }
    let child = entries[0].path();

    let jdk_home = if child.join("Contents/Home/bin").is_dir() {
        child.join("Contents/Home")
    } else if child.join("bin").is_dir() {
        child.clone()
    } else {
        return Ok(());
    };

    let staging = dir.with_extension("unpack");
    let _ = fs::remove_dir_all(&staging);
    fs::rename(&jdk_home, &staging).map_err(JgoError::Io)?;
    fs::remove_dir_all(dir).map_err(JgoError::Io)?;
    fs::rename(&staging, dir).map_err(JgoError::Io)?;
    Ok(())
}
