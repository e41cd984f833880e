//! Operation: resolve an endpoint and materialize its environment.
//!
//! This is the shared front half of `run`, `env`, and `tree`: figure out
//! the request (ad-hoc endpoint or ambient `jgo.toml`), resolve it, and
//! build or reuse the cache-keyed workspace.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use jgo_core::context::RunContext;
use jgo_core::endpoint::Endpoint;
use jgo_core::project::{JavaSection, ProjectSpec};
use jgo_env::builder::{self, BuildRequest, BuiltEnvironment};
use jgo_env::cache_key::{self, CacheKeyInputs};
use jgo_env::workspace::Workspace;
use jgo_resolver::resolver::{self, Resolution};
use jgo_util::errors::JgoError;

/// A request prepared for materialization.
pub struct PreparedRequest {
    pub endpoint: Endpoint,
    pub workspace: Workspace,
    pub env_name: Option<String>,
    pub java: Option<JavaSection>,
    pub entrypoints: BTreeMap<String, String>,
    pub spec_toml: Option<String>,
}

/// Interpret the command line: an explicit endpoint wins; otherwise the
/// nearest ambient `jgo.toml` defines the request.
///
/// Project repositories and Java preferences are folded into `ctx` so the
/// rest of the pipeline sees one consistent configuration.
pub fn prepare_request(
    endpoint_arg: Option<&str>,
    shortcuts: &HashMap<String, String>,
    ctx: &mut RunContext,
) -> miette::Result<PreparedRequest> {
    match endpoint_arg {
        Some(input) => prepare_adhoc(input, shortcuts, ctx),
        None => {
            let cwd = std::env::current_dir().map_err(JgoError::Io)?;
            let spec_path = ProjectSpec::find(&cwd).ok_or_else(|| JgoError::Parse {
                message: "no endpoint given and no jgo.toml found in this directory or above"
                    .to_string(),
            })?;
            prepare_project(&spec_path, shortcuts, ctx)
        }
    }
}

fn prepare_adhoc(
    input: &str,
    shortcuts: &HashMap<String, String>,
    ctx: &mut RunContext,
) -> miette::Result<PreparedRequest> {
    let endpoint = Endpoint::parse(input, shortcuts)?;
    let primary = endpoint.primary().ok_or_else(|| JgoError::Parse {
        message: format!("endpoint '{input}' has no participating coordinates"),
    })?;

    let key = cache_key::cache_key(&CacheKeyInputs {
        coordinates: endpoint
            .dependency_coordinates()
            .map(|c| c.to_string())
            .collect(),
        optional_depth: ctx.optional_depth,
        managed: ctx.managed,
        exclusions: ctx
            .global_exclusions
            .iter()
            .cloned()
            .chain(endpoint.global_exclusions())
            .collect(),
        add_classpath: ctx.add_classpath.clone(),
    });
    let workspace = Workspace::adhoc(ctx, primary, &key);

    let mut entrypoints = BTreeMap::new();
    if let Some(ref main) = endpoint.main_class {
        entrypoints.insert("default".to_string(), main.clone());
    }

    Ok(PreparedRequest {
        env_name: Some(primary.artifact_id.clone()),
        endpoint,
        workspace,
        java: None,
        entrypoints,
        spec_toml: None,
    })
}

fn prepare_project(
    spec_path: &Path,
    shortcuts: &HashMap<String, String>,
    ctx: &mut RunContext,
) -> miette::Result<PreparedRequest> {
    let spec_toml = std::fs::read_to_string(spec_path).map_err(JgoError::Io)?;
    let spec = ProjectSpec::parse_toml(&spec_toml)?;

    if spec.dependencies.coordinates.is_empty() {
        return Err(JgoError::Parse {
            message: format!("{} declares no dependencies", spec_path.display()),
        }
        .into());
    }

    let joined = spec.dependencies.coordinates.join("+");
    let mut endpoint = Endpoint::parse(&joined, shortcuts)?;

    // Per-dependency exclusions from [dependencies.exclusions].
    for (ga, patterns) in &spec.dependencies.exclusions {
        if let Some(coord) = endpoint
            .coordinates
            .iter_mut()
            .find(|c| c.ga_key() == *ga)
        {
            for pattern in patterns {
                coord
                    .exclusions
                    .push(jgo_core::coordinate::ExclusionPattern::parse(pattern)?);
            }
        }
    }

    for (name, url) in &spec.repositories {
        if !ctx.repositories.iter().any(|(n, _)| n == name) {
            ctx.repositories.push((name.clone(), url.clone()));
        }
    }
    if let Some(ref java) = spec.java {
        if ctx.java.version.is_none() {
            ctx.java.version = java.version;
        }
        if ctx.java.vendor.is_none() {
            ctx.java.vendor = java.vendor.clone();
        }
        if java.source.as_deref() == Some("system") {
            ctx.java.source = jgo_core::context::JavaSource::System;
        }
    }
    if let Some(ref settings) = spec.settings {
        if let Some(ref links) = settings.links {
            ctx.links = links.parse()?;
        }
        if let Some(ref dir) = settings.cache_dir {
            ctx.cache_dir = dir.into();
        }
    }

    Ok(PreparedRequest {
        endpoint,
        workspace: Workspace::project(spec_path)?,
        env_name: spec.environment.name.clone(),
        java: spec.java.clone(),
        entrypoints: spec.entrypoints.clone(),
        spec_toml: Some(spec_toml),
    })
}

/// Resolve the endpoint's transitive closure.
pub async fn resolve(
    request: &PreparedRequest,
    ctx: &RunContext,
    client: &reqwest::Client,
) -> miette::Result<Resolution> {
    jgo_util::progress::status("Resolving", &request.endpoint.to_string());
    resolver::resolve(&request.endpoint, ctx, client).await
}

/// Materialize the environment, reusing a valid cached build unless
/// `--update` forces a rebuild.
pub async fn materialize(
    request: PreparedRequest,
    ctx: &RunContext,
    client: &reqwest::Client,
) -> miette::Result<(Endpoint, BuiltEnvironment)> {
    if let Some(cached) = builder::load_cached(&request.workspace, ctx) {
        tracing::debug!("reusing environment at {}", cached.workspace.dir.display());
        return Ok((request.endpoint, cached));
    }

    let resolution = resolve(&request, ctx, client).await?;
    jgo_util::progress::status(
        "Building",
        &format!(
            "environment with {} artifacts",
            resolution.artifacts.len()
        ),
    );

    let endpoint = request.endpoint.clone();
    let built = builder::build(
        &resolution,
        BuildRequest {
            workspace: request.workspace,
            env_name: request.env_name,
            java: request.java,
            entrypoints: request.entrypoints,
            spec_toml: request.spec_toml,
        },
        ctx,
        client,
    )
    .await?;

    Ok((endpoint, built))
}

/// `jgo env`: materialize and report where the environment lives.
pub async fn exec(
    endpoint_arg: Option<&str>,
    shortcuts: &HashMap<String, String>,
    mut ctx: RunContext,
) -> miette::Result<()> {
    let client = jgo_maven::download::build_client()?;
    let request = prepare_request(endpoint_arg, shortcuts, &mut ctx)?;
    let (_, built) = materialize(request, &ctx, &client).await?;

    jgo_util::progress::status("Environment", &built.workspace.dir.display().to_string());
    println!("{}", built.workspace.dir.display());
    println!(
        "  class-path jars: {}, module-path jars: {}, min java: {}",
        built.class_path_jars.len(),
        built.module_path_jars.len(),
        built.min_java_version()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adhoc_request_records_default_entrypoint() {
        let mut ctx = RunContext::default();
        let req = prepare_request(
            Some("org.scijava:parsington:3.1.0@Main"),
            &HashMap::new(),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(
            req.entrypoints.get("default").map(String::as_str),
            Some("Main")
        );
        assert_eq!(req.env_name.as_deref(), Some("parsington"));
        assert!(req.workspace.spec_hash.is_none());
    }

    #[test]
    fn adhoc_cache_key_ignores_main_class() {
        let mut ctx = RunContext::default();
        let a = prepare_request(Some("g:a:1.0@Main"), &HashMap::new(), &mut ctx).unwrap();
        let b = prepare_request(Some("g:a:1.0@Other"), &HashMap::new(), &mut ctx).unwrap();
        assert_eq!(a.workspace.dir, b.workspace.dir);
    }

    #[test]
    fn project_request_folds_spec_into_context() {
        let tmp = tempfile::tempdir().unwrap();
        let spec_path = tmp.path().join("jgo.toml");
        std::fs::write(
            &spec_path,
            r#"
[environment]
name = "demo"

[java]
version = 17

[repositories]
scijava = "https://maven.scijava.org/content/groups/public"

[dependencies]
coordinates = ["org.scijava:parsington:3.1.0"]

[dependencies.exclusions]
"org.scijava:parsington" = ["junit:junit"]

[entrypoints]
default = "org.scijava.parsington.Main"
"#,
        )
        .unwrap();

        let mut ctx = RunContext::default();
        let req = prepare_project(&spec_path, &HashMap::new(), &mut ctx).unwrap();
        assert_eq!(req.env_name.as_deref(), Some("demo"));
        assert_eq!(ctx.java.version, Some(17));
        assert!(ctx
            .repositories
            .iter()
            .any(|(name, _)| name == "scijava"));
        assert_eq!(req.endpoint.coordinates.len(), 1);
        assert_eq!(req.endpoint.coordinates[0].exclusions.len(), 1);
        assert!(req.workspace.spec_hash.is_some());
        assert!(req.workspace.dir.ends_with(".jgo"));
    }

    #[test]
    fn missing_spec_and_endpoint_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let old = std::env::current_dir().unwrap();
        std::env::set_current_dir(tmp.path()).unwrap();
        let mut ctx = RunContext::default();
        let result = prepare_request(None, &HashMap::new(), &mut ctx);
        std::env::set_current_dir(old).unwrap();
        assert!(result.is_err());
    }
}
