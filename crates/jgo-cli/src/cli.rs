//! CLI argument definitions for jgo.
//!
//! Uses `clap` derive macros to define the full command surface. Each
//! command corresponds to a handler in the [`super::commands`] module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "jgo",
    version,
    about = "Launch Java applications directly from Maven coordinates",
    long_about = "jgo resolves an endpoint such as org.python:jython-standalone:2.7.3, \
                  materializes the JARs into a cached environment, finds or downloads a \
                  matching JDK, and runs the program."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve an endpoint and run it
    Run {
        /// Endpoint: G:A[:V][:C][:P](mods)!+...@MainClass (omit to use jgo.toml)
        endpoint: Option<String>,

        #[command(flatten)]
        shared: SharedFlags,

        /// Main class (fully-qualified, or a suffix completed by scanning)
        #[arg(long)]
        main_class: Option<String>,

        /// Named entrypoint from jgo.toml (defaults to "default")
        #[arg(long)]
        entrypoint: Option<String>,

        /// Initial heap, e.g. 512m
        #[arg(long, value_name = "SIZE")]
        min_heap: Option<String>,

        /// Max heap, e.g. 4g (default: half of RAM, capped at 8 GiB)
        #[arg(long, value_name = "SIZE")]
        max_heap: Option<String>,

        /// Garbage collector: g1, zgc, parallel, serial
        #[arg(long)]
        gc: Option<String>,

        /// System property, repeatable: -D key=value
        #[arg(short = 'D', value_name = "KEY=VALUE")]
        properties: Vec<String>,

        /// Raw JVM argument, repeatable
        #[arg(long = "jvm-arg", value_name = "ARG")]
        jvm_args: Vec<String>,

        /// Arguments passed to the program
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Materialize an endpoint's environment without running it
    Env {
        /// Endpoint (omit to use jgo.toml)
        endpoint: Option<String>,

        #[command(flatten)]
        shared: SharedFlags,
    },

    /// Print the resolved dependency tree
    Tree {
        /// Endpoint (omit to use jgo.toml)
        endpoint: Option<String>,

        #[command(flatten)]
        shared: SharedFlags,

        /// Limit the printed depth
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Remove materialized environments
    Clean {
        /// Also remove managed JDKs
        #[arg(long)]
        jdks: bool,

        #[command(flatten)]
        shared: SharedFlags,
    },
}

/// Flags shared by every resolving command.
#[derive(Args, Debug, Default)]
pub struct SharedFlags {
    /// Never touch the network; rely on local caches only
    #[arg(long, env = "JGO_OFFLINE")]
    pub offline: bool,

    /// Rebuild the environment and revalidate SNAPSHOT metadata
    #[arg(short = 'U', long, env = "JGO_UPDATE")]
    pub update: bool,

    /// Rebuild the environment without revalidating SNAPSHOT metadata
    #[arg(long = "no-cache", env = "JGO_NO_CACHE")]
    pub no_cache: bool,

    /// Downgrade missing POMs and unresolved properties to warnings
    #[arg(long, env = "JGO_LENIENT")]
    pub lenient: bool,

    /// Constrain transitive versions by the endpoint's dependency management (default)
    #[arg(long, overrides_with = "no_managed")]
    pub managed: bool,

    /// Disable the dependency-management import
    #[arg(long = "no-managed")]
    pub no_managed: bool,

    /// Follow optional dependencies of the endpoint artifacts
    #[arg(long, env = "JGO_INCLUDE_OPTIONAL")]
    pub include_optional: bool,

    /// Resolver backend; only the built-in engine is supported
    #[arg(long, default_value = "auto", value_name = "ENGINE")]
    pub resolver: String,

    /// Link strategy: hard, soft, copy, auto
    #[arg(long, value_name = "STRATEGY")]
    pub links: Option<String>,

    /// jgo data directory (environments, managed JDKs)
    #[arg(long, env = "JGO_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Local Maven repository used as the artifact cache
    #[arg(long, env = "M2_REPO", value_name = "DIR")]
    pub repo_cache: Option<PathBuf>,

    /// Extra remote repository, repeatable: -r name=url
    #[arg(short = 'r', long = "repository", value_name = "NAME=URL")]
    pub repositories: Vec<String>,

    /// Extra class-path entry appended at launch, repeatable
    #[arg(long = "add-classpath", value_name = "PATH")]
    pub add_classpath: Vec<String>,

    /// Exclude G:A from the whole resolution, repeatable
    #[arg(long = "exclude", value_name = "G:A")]
    pub exclusions: Vec<String>,

    /// Force every artifact onto the class path
    #[arg(long, conflicts_with = "module_path_only")]
    pub class_path_only: bool,

    /// Force every artifact onto the module path
    #[arg(long)]
    pub module_path_only: bool,

    /// Preferred Java release for AUTO provisioning
    #[arg(long, env = "JAVA_VERSION")]
    pub java_version: Option<u32>,

    /// Preferred JDK vendor: temurin, corretto, zulu
    #[arg(long, value_name = "VENDOR")]
    pub java_vendor: Option<String>,

    /// Only use the system Java (JAVA_HOME / PATH); never download a JDK
    #[arg(long)]
    pub system_java: bool,
}

/// Parse the process arguments.
pub fn parse() -> Cli {
    Cli::parse()
}
