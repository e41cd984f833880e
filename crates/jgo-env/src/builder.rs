//! Environment building: fetch resolved artifacts, classify and link them,
//! infer the minimum Java release, concretize entrypoints, and commit the
//! lockfile.
//!
//! The lockfile write is the single commit point. A build interrupted at
//! any earlier step leaves the workspace unmarked, and the next run starts
//! over.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;

use jgo_core::context::RunContext;
use jgo_core::coordinate::{Coordinate, Placement};
use jgo_core::lockfile::{LockMetadata, Lockfile, LockedDependency, LockedEnvironment};
use jgo_core::project::{self, JavaSection};
use jgo_maven::cache::LocalRepository;
use jgo_maven::repository;
use jgo_resolver::resolver::Resolution;
use jgo_util::errors::JgoError;

use crate::bytecode;
use crate::linker;
use crate::mainclass;
use crate::modules::{self, Classification};
use crate::workspace::Workspace;

/// Default minimum Java when no class files impose one.
const FALLBACK_MIN_JAVA: u32 = 8;

/// A materialized environment ready to launch.
pub struct BuiltEnvironment {
    pub workspace: Workspace,
    pub lockfile: Lockfile,
    /// Class-path JARs in resolution order.
    pub class_path_jars: Vec<PathBuf>,
    /// Module-path JARs in resolution order, with their module names.
    pub module_path_jars: Vec<(PathBuf, Option<String>)>,
}

impl BuiltEnvironment {
    /// All materialized JARs in resolution order (class path first).
    pub fn all_jars(&self) -> Vec<PathBuf> {
        self.class_path_jars
            .iter()
            .cloned()
            .chain(self.module_path_jars.iter().map(|(p, _)| p.clone()))
            .collect()
    }

    /// The module containing `fqcn`, when the class lives on the module path.
    pub fn module_of_class(&self, fqcn: &str) -> Option<String> {
        let entry = format!("{}.class", fqcn.replace('.', "/"));
        for (jar, module_name) in &self.module_path_jars {
            let Ok(file) = std::fs::File::open(jar) else {
                continue;
            };
            let Ok(archive) = zip::ZipArchive::new(file) else {
                continue;
            };
            if archive.file_names().any(|name| name == entry) {
                return module_name.clone();
            }
        }
        None
    }

    pub fn min_java_version(&self) -> u32 {
        self.lockfile.environment.min_java_version
    }
}

/// Inputs for one environment build.
pub struct BuildRequest {
    pub workspace: Workspace,
    pub env_name: Option<String>,
    pub java: Option<JavaSection>,
    /// Raw entrypoints: class names, `@suffix` fragments, or coordinate refs.
    pub entrypoints: BTreeMap<String, String>,
    /// Project-mode `jgo.toml` content, copied into the environment.
    pub spec_toml: Option<String>,
}

/// Load a previously committed environment, if valid and not bypassed.
pub fn load_cached(workspace: &Workspace, ctx: &RunContext) -> Option<BuiltEnvironment> {
    if ctx.update || ctx.no_cache || !workspace.is_valid() {
        return None;
    }
    let lockfile = Lockfile::from_path(&workspace.lockfile_path()).ok()?;

    let mut class_path_jars = Vec::new();
    let mut module_path_jars = Vec::new();
    for dep in &lockfile.dependencies {
        let file_name = locked_file_name(dep);
        if dep.placement == "module-path" {
            let path = workspace.modules_dir().join(&file_name);
            if path.exists() {
                module_path_jars.push((path, dep.module_name.clone()));
            }
        } else {
            let path = workspace.jars_dir().join(&file_name);
            if path.exists() {
                class_path_jars.push(path);
            }
        }
    }

    Some(BuiltEnvironment {
        workspace: workspace.clone(),
        lockfile,
        class_path_jars,
        module_path_jars,
    })
}

/// Build (or rebuild) an environment from a resolution.
pub async fn build(
    resolution: &Resolution,
    request: BuildRequest,
    ctx: &RunContext,
    client: &Client,
) -> miette::Result<BuiltEnvironment> {
    let workspace = request.workspace;
    workspace.clear()?;
    jgo_util::fs::ensure_dir(&workspace.dir).map_err(JgoError::Io)?;

    let repos = repository::build_repos(&ctx.repositories);
    let local = LocalRepository::new(ctx.repo_cache.clone());

    let mut class_path_jars: Vec<PathBuf> = Vec::new();
    let mut module_path_jars: Vec<(PathBuf, Option<String>)> = Vec::new();
    let mut locked: Vec<LockedDependency> = Vec::new();
    let mut min_java = FALLBACK_MIN_JAVA;

    for artifact in &resolution.artifacts {
        if !artifact.has_payload() {
            continue;
        }

        let file_name = artifact.file_name();
        let fetched = local
            .fetch_artifact(
                client,
                &repos,
                ctx.offline,
                &artifact.group_id,
                &artifact.artifact_id,
                &artifact.version,
                &file_name,
                &file_name,
            )
            .await?;
        let Some((src, sha256)) = fetched else {
            let what = format!(
                "artifact {}:{}:{}",
                artifact.group_id, artifact.artifact_id, artifact.resolved_version
            );
            if ctx.lenient {
                tracing::warn!("{what} not found in any repository; dropping");
                continue;
            }
            return Err(JgoError::NotFound { what }.into());
        };

        let classification = modules::classify_jar(&src)?;
        let placement =
            modules::decide_placement(&classification, artifact.placement_override, ctx);

        if let Some(required) = bytecode::min_java_for_jar(&src)? {
            min_java = min_java.max(required);
        }

        let dest_dir = match placement {
            Placement::ClassPath => workspace.jars_dir(),
            Placement::ModulePath => workspace.modules_dir(),
        };
        let dest = dest_dir.join(&file_name);
        linker::link(&src, &dest, ctx.links)?;

        match placement {
            Placement::ClassPath => class_path_jars.push(dest),
            Placement::ModulePath => {
                module_path_jars.push((dest, classification.module_name().map(str::to_string)));
            }
        }

        locked.push(LockedDependency {
            group_id: artifact.group_id.clone(),
            artifact_id: artifact.artifact_id.clone(),
            version: artifact.resolved_version.clone(),
            packaging: artifact.packaging.clone(),
            classifier: artifact.classifier.clone(),
            sha256: Some(sha256),
            is_modular: classification.is_modular(),
            module_name: classification.module_name().map(str::to_string),
            placement: match placement {
                Placement::ClassPath => "class-path".to_string(),
                Placement::ModulePath => "module-path".to_string(),
            },
        });
    }

    let all_jars: Vec<PathBuf> = class_path_jars
        .iter()
        .cloned()
        .chain(module_path_jars.iter().map(|(p, _)| p.clone()))
        .collect();
    let entrypoints =
        concretize_entrypoints(&request.entrypoints, &resolution.artifacts, &all_jars)?;

    if let Some(ref spec_toml) = request.spec_toml {
        jgo_util::fs::write_atomic(
            &workspace.dir.join(project::SPEC_FILE),
            spec_toml.as_bytes(),
        )
        .map_err(JgoError::Io)?;
    }

    let lockfile = Lockfile {
        metadata: LockMetadata {
            generated: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            tool_version: jgo_core::TOOL_VERSION.to_string(),
            spec_hash: workspace.spec_hash.clone(),
        },
        environment: LockedEnvironment {
            name: request.env_name,
            min_java_version: min_java,
        },
        java: request.java,
        entrypoints,
        dependencies: locked,
    };
    lockfile.write(&workspace.lockfile_path())?;

    Ok(BuiltEnvironment {
        workspace,
        lockfile,
        class_path_jars,
        module_path_jars,
    })
}

/// Turn raw entrypoint values into fully-qualified class names.
///
/// Coordinate references resolve through that artifact's manifest
/// `Main-Class`; bare suffixes are completed by scanning class entries.
fn concretize_entrypoints(
    raw: &BTreeMap<String, String>,
    artifacts: &[jgo_resolver::resolver::ResolvedArtifact],
    jars: &[PathBuf],
) -> miette::Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for (name, value) in raw {
        let class = if project::is_coordinate_ref(value) {
            let coord = Coordinate::parse(value)?;
            let target = artifacts
                .iter()
                .find(|a| a.group_id == coord.group_id && a.artifact_id == coord.artifact_id)
                .ok_or_else(|| JgoError::NotFound {
                    what: format!("entrypoint artifact {value} in the resolution"),
                })?;
            let file_name = target.file_name();
            let jar = jars
                .iter()
                .find(|p| p.file_name().is_some_and(|n| n.to_string_lossy() == file_name))
                .ok_or_else(|| JgoError::NotFound {
                    what: format!("materialized JAR for entrypoint {value}"),
                })?;
            mainclass::manifest_main_class(jar)?.ok_or_else(|| JgoError::NotFound {
                what: format!("Main-Class manifest attribute in {}", jar.display()),
            })?
        } else {
            mainclass::resolve_main_class(value, jars)?
        };
        out.insert(name.clone(), class);
    }
    Ok(out)
}

/// File name a locked dependency materializes under.
fn locked_file_name(dep: &LockedDependency) -> String {
    match &dep.classifier {
        Some(c) => format!(
            "{}-{}-{}.{}",
            dep.artifact_id, dep.version, c, dep.packaging
        ),
        None => format!("{}-{}.{}", dep.artifact_id, dep.version, dep.packaging),
    }
}
