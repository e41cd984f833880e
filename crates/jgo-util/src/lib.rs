//! Shared utilities for jgo.
//!
//! This crate provides cross-cutting concerns used by all other jgo crates:
//! error types, filesystem helpers, cryptographic hashing, process spawning,
//! and terminal progress indicators.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;
pub mod progress;

use std::path::{Path, PathBuf};

/// Returns the jgo data directory (`~/.jgo/` unless `JGO_CACHE_DIR` is set).
pub fn dirs_path() -> PathBuf {
    if let Ok(dir) = std::env::var("JGO_CACHE_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".jgo")
}
