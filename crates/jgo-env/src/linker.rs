//! Artifact materialization: hard link, symlink, or copy into the
//! environment, with `auto` falling through the chain.
//!
//! Links are created at a temp name and renamed into place, so a destination
//! path either does not exist or is complete.

use std::path::Path;

use jgo_core::context::LinkStrategy;
use jgo_util::errors::JgoError;

/// Materialize `src` at `dest` using the given strategy.
///
/// `auto` attempts a hard link first (fails across filesystems or when the
/// link count is exhausted), then a symlink, then a full copy.
pub fn link(src: &Path, dest: &Path, strategy: LinkStrategy) -> miette::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(JgoError::Io)?;
    }
    if dest.exists() {
        return Ok(());
    }

    match strategy {
        LinkStrategy::Hard => hard_link(src, dest).map_err(JgoError::Io)?,
        LinkStrategy::Soft => symlink(src, dest).map_err(JgoError::Io)?,
        LinkStrategy::Copy => copy(src, dest).map_err(JgoError::Io)?,
        LinkStrategy::Auto => {
            if let Err(hard_err) = hard_link(src, dest) {
                tracing::debug!("hard link failed ({hard_err}); trying symlink");
                if let Err(soft_err) = symlink(src, dest) {
                    tracing::debug!("symlink failed ({soft_err}); copying");
                    copy(src, dest).map_err(JgoError::Io)?;
                }
            }
        }
    }
    Ok(())
}

fn temp_dest(dest: &Path) -> std::path::PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "link".to_string());
    dest.with_file_name(format!(".{name}.tmp-{}", std::process::id()))
}

fn hard_link(src: &Path, dest: &Path) -> std::io::Result<()> {
    let tmp = temp_dest(dest);
    let _ = std::fs::remove_file(&tmp);
    std::fs::hard_link(src, &tmp)?;
    std::fs::rename(&tmp, dest)
}

#[cfg(unix)]
fn symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    let tmp = temp_dest(dest);
    let _ = std::fs::remove_file(&tmp);
    std::os::unix::fs::symlink(src, &tmp)?;
    std::fs::rename(&tmp, dest)
}

#[cfg(windows)]
fn symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    let tmp = temp_dest(dest);
    let _ = std::fs::remove_file(&tmp);
    std::os::windows::fs::symlink_file(src, &tmp)?;
    std::fs::rename(&tmp, dest)
}

fn copy(src: &Path, dest: &Path) -> std::io::Result<()> {
    let tmp = temp_dest(dest);
    let _ = std::fs::remove_file(&tmp);
    std::fs::copy(src, &tmp)?;
    std::fs::rename(&tmp, dest)
}
