//! Operation: cache maintenance.

use std::path::Path;

use jgo_core::context::RunContext;
use jgo_util::errors::JgoError;

/// `jgo cache clean`: delete materialized environments, and managed JDKs
/// when `jdks` is set. The local Maven repository is shared with other
/// tools and is never touched.
pub fn clean(ctx: &RunContext, jdks: bool) -> miette::Result<()> {
    let envs = ctx.envs_dir();
    let freed = dir_size(&envs);
    if envs.is_dir() {
        std::fs::remove_dir_all(&envs).map_err(JgoError::Io)?;
    }
    jgo_util::progress::status(
        "Removed",
        &format!("{} ({} MiB)", envs.display(), freed / (1024 * 1024)),
    );

    if jdks {
        let jdks_dir = ctx.jdks_dir();
        if jdks_dir.is_dir() {
            std::fs::remove_dir_all(&jdks_dir).map_err(JgoError::Io)?;
            jgo_util::progress::status("Removed", &jdks_dir.display().to_string());
        }
    }
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    let mut total = 0u64;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(meta) = entry.metadata() {
                if meta.is_dir() {
                    total += dir_size(&entry.path());
                } else {
                    total += meta.len();
                }
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_removes_envs_but_not_repo_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = RunContext {
            cache_dir: tmp.path().join("jgo"),
            repo_cache: tmp.path().join("m2"),
            ..RunContext::default()
        };
        std::fs::create_dir_all(ctx.envs_dir().join("org/x")).unwrap();
        std::fs::write(ctx.envs_dir().join("org/x/f.jar"), b"data").unwrap();
        std::fs::create_dir_all(&ctx.repo_cache).unwrap();

        clean(&ctx, false).unwrap();
        assert!(!ctx.envs_dir().exists());
        assert!(ctx.repo_cache.exists());
    }

    #[test]
    fn clean_with_jdks_removes_managed_jdks() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = RunContext {
            cache_dir: tmp.path().join("jgo"),
            ..RunContext::default()
        };
        std::fs::create_dir_all(ctx.jdks_dir().join("temurin-21")).unwrap();

        clean(&ctx, true).unwrap();
        assert!(!ctx.jdks_dir().exists());
    }
}
