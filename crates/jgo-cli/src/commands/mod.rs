//! Command dispatch and handler modules.

mod cache;
mod env;
mod run;
mod tree;

use std::collections::HashMap;

use jgo_core::context::{JavaSource, RunContext};
use jgo_core::settings::GlobalSettings;
use jgo_util::errors::JgoError;

use crate::cli::{CacheAction, Cli, Command, SharedFlags};

/// Route a parsed CLI invocation to the appropriate command handler.
/// Returns the process exit code.
pub async fn dispatch(cli: Cli) -> miette::Result<i32> {
    match cli.command {
        Command::Run {
            endpoint,
            shared,
            main_class,
            entrypoint,
            min_heap,
            max_heap,
            gc,
            properties,
            jvm_args,
            args,
        } => {
            run::exec(
                endpoint.as_deref(),
                &shared,
                run::JvmFlags {
                    main_class,
                    entrypoint,
                    min_heap,
                    max_heap,
                    gc,
                    properties,
                    jvm_args,
                },
                args,
                cli.verbose,
            )
            .await
        }
        Command::Env { endpoint, shared } => env::exec(endpoint.as_deref(), &shared).await,
        Command::Tree {
            endpoint,
            shared,
            depth,
        } => tree::exec(endpoint.as_deref(), &shared, depth).await,
        Command::Cache { action } => match action {
            CacheAction::Clean { jdks, shared } => cache::clean(&shared, jdks),
        },
    }
}

/// Assemble the run context from global settings and command-line flags.
///
/// Settings provide defaults; flags override. Also returns the shortcut
/// table for endpoint expansion.
pub fn build_context(
    shared: &SharedFlags,
) -> miette::Result<(RunContext, HashMap<String, String>)> {
    match shared.resolver.as_str() {
        "auto" | "native" => {}
        other => {
            return Err(JgoError::Parse {
                message: format!(
                    "unsupported resolver '{other}'; only the built-in engine is available"
                ),
            }
            .into());
        }
    }

    let settings = GlobalSettings::load()?;
    let mut ctx = RunContext::default();

    if let Some(links) = settings.get("links") {
        ctx.links = links.parse()?;
    }
    if let Some(dir) = settings.get("cache-dir") {
        ctx.cache_dir = dir.into();
    }
    if let Some(dir) = settings.get("repo-cache") {
        ctx.repo_cache = dir.into();
    }
    ctx.repositories = settings.repositories.clone();

    ctx.offline = shared.offline;
    ctx.update = shared.update;
    ctx.no_cache = shared.no_cache;
    ctx.lenient = shared.lenient;
    ctx.managed = shared.managed || !shared.no_managed;
    if shared.include_optional {
        ctx.optional_depth = 1;
    }
    if let Some(ref links) = shared.links {
        ctx.links = links.parse()?;
    }
    if let Some(ref dir) = shared.cache_dir {
        ctx.cache_dir = dir.clone();
    }
    if let Some(ref dir) = shared.repo_cache {
        ctx.repo_cache = dir.clone();
    }
    for spec in &shared.repositories {
        ctx.repositories.push(parse_repository_flag(spec)?);
    }
    ctx.add_classpath = shared.add_classpath.clone();
    ctx.global_exclusions = shared.exclusions.clone();
    ctx.class_path_only = shared.class_path_only;
    ctx.module_path_only = shared.module_path_only;
    ctx.java.version = shared.java_version;
    ctx.java.vendor = shared.java_vendor.clone();
    ctx.java.source = if shared.system_java {
        JavaSource::System
    } else {
        JavaSource::Auto
    };

    Ok((ctx, settings.shortcuts))
}

/// Parse a `-r name=url` flag; a bare URL gets a generated name.
fn parse_repository_flag(spec: &str) -> miette::Result<(String, String)> {
    match spec.split_once('=') {
        Some((name, url)) if !name.is_empty() && !url.is_empty() => {
            Ok((name.to_string(), url.to_string()))
        }
        None if spec.starts_with("http") => Ok((format!("cli-{}", spec.len()), spec.to_string())),
        _ => Err(JgoError::Parse {
            message: format!("bad repository '{spec}'; expected name=url"),
        }
        .into()),
    }
}

/// Parse a `-D key=value` property.
pub fn parse_property(spec: &str) -> miette::Result<(String, String)> {
    match spec.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(JgoError::Parse {
            message: format!("bad system property '{spec}'; expected key=value"),
        }
        .into()),
    }
}
