//! High-level jgo operations, one module per command.

pub mod ops_cache;
pub mod ops_env;
pub mod ops_run;
pub mod ops_tree;
