//! Operation: resolve, materialize, locate a JVM, and run.

use std::collections::HashMap;

use jgo_core::context::RunContext;
use jgo_core::endpoint::Endpoint;
use jgo_env::builder::BuiltEnvironment;
use jgo_env::mainclass;
use jgo_jvm::launch::{self, LaunchOptions};
use jgo_util::errors::JgoError;

use crate::ops_env;

/// Everything `jgo run` needs beyond the shared resolution context.
#[derive(Default)]
pub struct RunOptions {
    /// `--main-class` override (a FQCN or a bare suffix).
    pub main_class: Option<String>,
    /// Entrypoint name from the project spec (`default` when omitted).
    pub entrypoint: Option<String>,
    pub launch: LaunchOptions,
    pub app_args: Vec<String>,
    pub verbose: bool,
}

/// Build (or reuse) the environment and exec the program.
///
/// Returns the child's exit code so the CLI can propagate it verbatim.
pub async fn exec(
    endpoint_arg: Option<&str>,
    shortcuts: &HashMap<String, String>,
    mut ctx: RunContext,
    opts: RunOptions,
) -> miette::Result<i32> {
    let client = jgo_maven::download::build_client()?;
    let request = ops_env::prepare_request(endpoint_arg, shortcuts, &mut ctx)?;
    let (endpoint, env) = ops_env::materialize(request, &ctx, &client).await?;

    let main_class = pick_main_class(&endpoint, &env, &opts)?;

    let min_java = env.min_java_version();
    let jvm = {
        let ctx = ctx.clone();
        // Provisioning downloads with a blocking client and may prompt;
        // keep it off the async runtime.
        tokio::task::spawn_blocking(move || launch::locate_jvm(&ctx, min_java))
            .await
            .map_err(|e| JgoError::Generic {
                message: format!("JVM location task failed: {e}"),
            })??
    };

    jgo_util::progress::status("Running", &main_class);
    let cmd = launch::build_command(
        &env,
        &jvm,
        &main_class,
        &opts.launch,
        &ctx.add_classpath,
        &opts.app_args,
    );
    launch::launch(&cmd, opts.verbose)
}

/// Main-class resolution order: explicit flag or `@suffix`, then the named
/// (or `default`) entrypoint from the lockfile, then the primary artifact's
/// manifest `Main-Class`.
fn pick_main_class(
    endpoint: &Endpoint,
    env: &BuiltEnvironment,
    opts: &RunOptions,
) -> miette::Result<String> {
    if let Some(request) = opts
        .main_class
        .as_deref()
        .or(endpoint.main_class.as_deref())
    {
        return mainclass::resolve_main_class(request, &env.all_jars());
    }

    let entry_name = opts.entrypoint.as_deref().unwrap_or("default");
    if let Some(class) = env.lockfile.entrypoints.get(entry_name) {
        return Ok(class.clone());
    }
    if opts.entrypoint.is_some() {
        return Err(JgoError::NotFound {
            what: format!("entrypoint '{entry_name}' in the environment lockfile"),
        }
        .into());
    }

    if let Some(primary) = endpoint.primary() {
        if let Some(jar) = find_primary_jar(primary, env) {
            if let Some(class) = mainclass::manifest_main_class(&jar)? {
                return Ok(class);
            }
        }
    }

    Err(JgoError::Parse {
        message: "no main class: pass @MainClass on the endpoint, --main-class, or an \
                  entrypoint in jgo.toml"
            .to_string(),
    }
    .into())
}

/// The materialized JAR belonging to the endpoint's primary coordinate.
fn find_primary_jar(
    primary: &jgo_core::coordinate::Coordinate,
    env: &BuiltEnvironment,
) -> Option<std::path::PathBuf> {
    let dep = env
        .lockfile
        .dependencies
        .iter()
        .find(|d| d.group_id == primary.group_id && d.artifact_id == primary.artifact_id)?;
    let prefix = format!("{}-", dep.artifact_id);
    env.all_jars().into_iter().find(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().starts_with(&prefix))
            .unwrap_or(false)
    })
}
