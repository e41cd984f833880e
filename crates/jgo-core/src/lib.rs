//! Core data types for jgo.
//!
//! This crate defines the fundamental types of a jgo invocation: Maven
//! coordinates and endpoints, the `jgo.toml` project spec, the
//! `jgo.lock.toml` lockfile, global INI settings, and the run context that
//! threads configuration through the pipeline.
//!
//! This crate is intentionally free of async code and network I/O.

/// Version string reported in lockfile metadata and `--version` output.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod context;
pub mod coordinate;
pub mod endpoint;
pub mod lockfile;
pub mod project;
pub mod settings;
