//! Core dependency resolution: nearest-wins BFS, scope propagation,
//! exclusions, optional-depth policy, managed (BOM-import) versions, and
//! metadata-driven version selection.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use jgo_core::context::RunContext;
use jgo_core::coordinate::{Coordinate, ExclusionPattern, Placement};
use jgo_core::endpoint::Endpoint;
use jgo_maven::cache::LocalRepository;
use jgo_maven::metadata::{self, MavenMetadata};
use jgo_maven::repository::{self, MavenRepository};
use jgo_util::errors::JgoError;

use crate::graph::{DepEdge, DependencyGraph, ResolvedNode};
use crate::loader::PomLoader;
use crate::version::{MavenVersion, VersionRange};

const MAX_CONCURRENT_FETCHES: usize = 8;

/// The output of dependency resolution.
pub struct Resolution {
    pub graph: DependencyGraph,
    /// Accepted artifacts in resolution (BFS) order.
    pub artifacts: Vec<ResolvedArtifact>,
}

/// A single resolved artifact with concrete coordinates.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub group_id: String,
    pub artifact_id: String,
    /// Selected version as it appears in repository paths (`1.0-SNAPSHOT`).
    pub version: String,
    /// Concrete version; differs from `version` only for timestamped
    /// SNAPSHOTs (`1.0-20240615.143022-42`).
    pub resolved_version: String,
    pub packaging: String,
    pub classifier: Option<String>,
    pub scope: String,
    /// Endpoint-level `(c)`/`(m)` override, if any.
    pub placement_override: Option<Placement>,
}

impl ResolvedArtifact {
    /// `groupId:artifactId` key.
    pub fn ga_key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Artifact file name using the concrete (timestamped) version.
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.resolved_version, c, self.packaging
            ),
            None => format!(
                "{}-{}.{}",
                self.artifact_id, self.resolved_version, self.packaging
            ),
        }
    }

    /// Whether this artifact carries a JAR at all.
    pub fn has_payload(&self) -> bool {
        self.packaging != "pom"
    }
}

/// Entry in the BFS queue.
struct QueueEntry {
    group: String,
    artifact: String,
    version: String,
    packaging: String,
    classifier: Option<String>,
    scope: String,
    depth: usize,
    parent_key: Option<String>,
    exclusions: Arc<Vec<ExclusionPattern>>,
    /// Path-merged dependency management, nearest (shallowest) entry wins.
    managed: Arc<HashMap<String, String>>,
}

/// Resolve the full transitive closure of an endpoint.
pub async fn resolve(
    endpoint: &Endpoint,
    ctx: &RunContext,
    client: &Client,
) -> miette::Result<Resolution> {
    let repos = repository::build_repos(&ctx.repositories);
    let local = LocalRepository::new(ctx.repo_cache.clone());
    let loader = PomLoader::new(
        client.clone(),
        repos.clone(),
        local.clone(),
        ctx.offline,
        ctx.lenient,
    );
    let mut metadata_memo: HashMap<String, Option<MavenMetadata>> = HashMap::new();

    let mut graph = DependencyGraph::new();
    let root = graph.add_node(ResolvedNode::synthetic_root(&endpoint.to_string()));
    graph.set_root(root);

    let global_exclusions = collect_global_exclusions(endpoint, ctx)?;
    let placement_overrides: HashMap<String, Placement> = endpoint
        .dependency_coordinates()
        .filter_map(|c| c.placement.map(|p| (c.ga_key(), p)))
        .collect();

    // Pin endpoint versions first; RELEASE/LATEST/ranges consult metadata.
    let mut direct: Vec<(Coordinate, String)> = Vec::new();
    for coord in endpoint.dependency_coordinates() {
        let version = resolve_version_spec(
            &coord.group_id,
            &coord.artifact_id,
            &coord.version,
            &local,
            &repos,
            client,
            ctx,
            &mut metadata_memo,
        )
        .await?;
        direct.push((coord.clone(), version));
    }

    // The managed-dependencies default: each endpoint coordinate not marked
    // with `!` contributes its dependency management, as if imported into a
    // synthetic root BOM. Earlier coordinates win on conflicting keys.
    let mut root_managed: HashMap<String, String> = HashMap::new();
    if ctx.managed {
        for (coord, version) in &direct {
            if !coord.managed_import {
                continue;
            }
            if let Some(pom) = loader
                .load_effective(&coord.group_id, &coord.artifact_id, version)
                .await?
            {
                for dm in &pom.dependency_management {
                    if let Some(ref v) = dm.version {
                        root_managed
                            .entry(format!("{}:{}", dm.group_id, dm.artifact_id))
                            .or_insert_with(|| v.clone());
                    }
                }
            }
        }
    }
    let root_managed = Arc::new(root_managed);
    let no_exclusions = Arc::new(Vec::new());

    let mut queue: VecDeque<QueueEntry> = VecDeque::new();
    for (coord, version) in &direct {
        queue.push_back(QueueEntry {
            group: coord.group_id.clone(),
            artifact: coord.artifact_id.clone(),
            version: version.clone(),
            packaging: coord.packaging.clone(),
            classifier: coord.classifier.clone(),
            scope: "compile".to_string(),
            depth: 1,
            parent_key: None,
            exclusions: if coord.exclusions.is_empty() {
                no_exclusions.clone()
            } else {
                Arc::new(coord.exclusions.clone())
            },
            managed: root_managed.clone(),
        });
    }

    // `(groupId, artifactId, classifier, packaging)` -> (version, depth)
    let mut resolved: HashMap<(String, String, String, String), (String, usize)> = HashMap::new();
    let mut artifacts: Vec<ResolvedArtifact> = Vec::new();
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));

    while !queue.is_empty() {
        // Drain one depth level and prefetch its POMs in parallel; the
        // loader memoizes, so processing below is cache-hits only.
        let current_depth = queue.front().map(|e| e.depth).unwrap_or(0);
        let mut level: Vec<QueueEntry> = Vec::new();
        while queue.front().is_some_and(|e| e.depth == current_depth) {
            level.push(queue.pop_front().unwrap());
        }

        let to_fetch: HashSet<(String, String, String)> = level
            .iter()
            .map(|e| (e.group.clone(), e.artifact.clone(), e.version.clone()))
            .collect();
        if to_fetch.len() > 1 && !ctx.offline {
            let mut join_set = JoinSet::new();
            for (group, artifact, version) in to_fetch {
                let loader = loader.clone();
                let sem = semaphore.clone();
                join_set.spawn(async move {
                    let _permit = sem.acquire().await;
                    let _ = loader.load_effective(&group, &artifact, &version).await;
                });
            }
            while join_set.join_next().await.is_some() {}
        }

        for entry in level {
            let dedup_key = (
                entry.group.clone(),
                entry.artifact.clone(),
                entry.classifier.clone().unwrap_or_default(),
                entry.packaging.clone(),
            );

            if let Some((existing_ver, existing_depth)) = resolved.get(&dedup_key) {
                if *existing_depth <= entry.depth {
                    if *existing_ver != entry.version {
                        tracing::debug!(
                            "nearest wins for {}:{}: keeping {existing_ver} (depth \
                             {existing_depth}), dropping {} (depth {})",
                            entry.group,
                            entry.artifact,
                            entry.version,
                            entry.depth
                        );
                    }
                    // Still record the edge so the tree shows the dependency.
                    link_edge(&mut graph, root, &entry);
                    continue;
                }
            }

            let pom = loader
                .load_effective(&entry.group, &entry.artifact, &entry.version)
                .await?;
            let Some(pom) = pom else {
                let what = format!("POM for {}:{}:{}", entry.group, entry.artifact, entry.version);
                if ctx.lenient {
                    tracing::warn!("{what} not found in any repository; dropping");
                    continue;
                }
                return Err(JgoError::NotFound { what }.into());
            };

            resolved.insert(dedup_key, (entry.version.clone(), entry.depth));

            let resolved_version = if entry.version.ends_with("-SNAPSHOT") {
                resolve_snapshot_version(
                    &entry.group,
                    &entry.artifact,
                    &entry.version,
                    entry.classifier.as_deref(),
                    &entry.packaging,
                    &local,
                    &repos,
                    client,
                    ctx,
                )
                .await?
            } else {
                entry.version.clone()
            };

            let node = graph.add_node(ResolvedNode {
                group: entry.group.clone(),
                artifact: entry.artifact.clone(),
                version: entry.version.clone(),
                scope: entry.scope.clone(),
            });
            link_edge_to(&mut graph, root, &entry, node);

            artifacts.push(ResolvedArtifact {
                group_id: entry.group.clone(),
                artifact_id: entry.artifact.clone(),
                version: entry.version.clone(),
                resolved_version,
                packaging: entry.packaging.clone(),
                classifier: entry.classifier.clone(),
                scope: entry.scope.clone(),
                placement_override: placement_overrides
                    .get(&format!("{}:{}", entry.group, entry.artifact))
                    .copied(),
            });

            // Child entries inherit this node's dependency management beneath
            // the path-merged map (nearer declarations win).
            let mut child_managed = (*entry.managed).clone();
            for dm in &pom.dependency_management {
                if let Some(ref v) = dm.version {
                    child_managed
                        .entry(format!("{}:{}", dm.group_id, dm.artifact_id))
                        .or_insert_with(|| v.clone());
                }
            }
            let child_managed = Arc::new(child_managed);
            let node_key = format!("{}:{}", entry.group, entry.artifact);

            for dep in &pom.dependencies {
                if dep.optional && entry.depth > ctx.optional_depth {
                    continue;
                }
                let dep_scope = dep.scope.as_deref().unwrap_or("compile");
                let Some(propagated) = propagate_scope(&entry.scope, dep_scope) else {
                    continue;
                };

                let excluded = global_exclusions
                    .iter()
                    .chain(entry.exclusions.iter())
                    .any(|p| p.matches(&dep.group_id, &dep.artifact_id));
                if excluded {
                    continue;
                }

                // The merged map covers the path (nearer wins) plus this
                // node's own dependency management, which supplies versions
                // its declarations omit.
                let managed_key = format!("{}:{}", dep.group_id, dep.artifact_id);
                let version_spec = child_managed
                    .get(&managed_key)
                    .cloned()
                    .or_else(|| dep.version.clone());
                let Some(version_spec) = version_spec else {
                    let message = format!(
                        "no version for {managed_key} (declared by {}:{}:{})",
                        entry.group, entry.artifact, entry.version
                    );
                    if ctx.lenient {
                        tracing::warn!("{message}");
                        continue;
                    }
                    return Err(JgoError::VersionUnresolved { message }.into());
                };

                let version = resolve_version_spec(
                    &dep.group_id,
                    &dep.artifact_id,
                    &version_spec,
                    &local,
                    &repos,
                    client,
                    ctx,
                    &mut metadata_memo,
                )
                .await?;

                let mut child_exclusions = (*entry.exclusions).clone();
                for excl in &dep.exclusions {
                    child_exclusions.push(ExclusionPattern {
                        group_id: excl.group_id.clone(),
                        artifact_id: excl
                            .artifact_id
                            .clone()
                            .unwrap_or_else(|| "*".to_string()),
                    });
                }

                queue.push_back(QueueEntry {
                    group: dep.group_id.clone(),
                    artifact: dep.artifact_id.clone(),
                    version,
                    packaging: dep.type_.clone().unwrap_or_else(|| "jar".to_string()),
                    classifier: dep.classifier.clone(),
                    scope: propagated,
                    depth: entry.depth + 1,
                    parent_key: Some(node_key.clone()),
                    exclusions: Arc::new(child_exclusions),
                    managed: child_managed.clone(),
                });
            }
        }
    }

    Ok(Resolution { graph, artifacts })
}

fn link_edge(graph: &mut DependencyGraph, root: petgraph::graph::NodeIndex, entry: &QueueEntry) {
    let key = format!("{}:{}", entry.group, entry.artifact);
    if let Some(node) = graph.find(&key) {
        link_edge_to(graph, root, entry, node);
    }
}

fn link_edge_to(
    graph: &mut DependencyGraph,
    root: petgraph::graph::NodeIndex,
    entry: &QueueEntry,
    node: petgraph::graph::NodeIndex,
) {
    let parent = entry
        .parent_key
        .as_ref()
        .and_then(|key| graph.find(key))
        .unwrap_or(root);
    if parent != node {
        graph.add_edge(
            parent,
            node,
            DepEdge {
                scope: entry.scope.clone(),
            },
        );
    }
}

/// Maven's scope-transition matrix for transitive dependencies.
///
/// `None` means the dependency does not propagate (test, provided, system,
/// and import scopes are never carried across an edge).
fn propagate_scope(parent_scope: &str, dep_scope: &str) -> Option<String> {
    let propagated = match (parent_scope, dep_scope) {
        ("compile", "compile") => "compile",
        ("compile", "runtime") => "runtime",
        ("runtime", "compile") => "runtime",
        ("runtime", "runtime") => "runtime",
        _ => return None,
    };
    Some(propagated.to_string())
}

fn collect_global_exclusions(
    endpoint: &Endpoint,
    ctx: &RunContext,
) -> miette::Result<Vec<ExclusionPattern>> {
    let mut patterns = Vec::new();
    for spec in ctx
        .global_exclusions
        .iter()
        .cloned()
        .chain(endpoint.global_exclusions())
    {
        patterns.push(ExclusionPattern::parse(&spec)?);
    }
    Ok(patterns)
}

/// Resolve `RELEASE`, `LATEST`, and range specs against artifact metadata;
/// concrete versions pass through untouched.
#[allow(clippy::too_many_arguments)]
async fn resolve_version_spec(
    group: &str,
    artifact: &str,
    spec: &str,
    local: &LocalRepository,
    repos: &[MavenRepository],
    client: &Client,
    ctx: &RunContext,
    memo: &mut HashMap<String, Option<MavenMetadata>>,
) -> miette::Result<String> {
    let range = VersionRange::parse(spec);
    if spec != "RELEASE" && spec != "LATEST" && range.is_none() {
        return Ok(spec.to_string());
    }

    let key = format!("{group}:{artifact}");
    if !memo.contains_key(&key) {
        let meta = match local
            .fetch_metadata(client, repos, ctx.offline, ctx.update, group, artifact)
            .await?
        {
            Some(xml) => Some(metadata::parse_metadata(&xml)?),
            None => None,
        };
        memo.insert(key.clone(), meta);
    }
    let Some(meta) = memo.get(&key).and_then(|m| m.as_ref()) else {
        return Err(JgoError::VersionUnresolved {
            message: format!("no maven-metadata.xml for {group}:{artifact} ({spec})"),
        }
        .into());
    };

    let selected = if let Some(range) = range {
        range.select_highest(&meta.versions)
    } else if spec == "RELEASE" {
        meta.release.clone().or_else(|| {
            meta.versions
                .iter()
                .filter(|v| !v.ends_with("-SNAPSHOT"))
                .map(|v| MavenVersion::parse(v))
                .max()
                .map(|v| v.original)
        })
    } else {
        meta.latest.clone().or_else(|| {
            meta.versions
                .iter()
                .map(|v| MavenVersion::parse(v))
                .max()
                .map(|v| v.original)
        })
    };

    selected.ok_or_else(|| {
        JgoError::VersionUnresolved {
            message: format!("no version of {group}:{artifact} satisfies {spec}"),
        }
        .into()
    })
}

/// Crystallize a `-SNAPSHOT` version into its timestamped build via the
/// version-level metadata. Falls back to the declared version when the
/// repository publishes no snapshot metadata.
#[allow(clippy::too_many_arguments)]
async fn resolve_snapshot_version(
    group: &str,
    artifact: &str,
    version: &str,
    classifier: Option<&str>,
    packaging: &str,
    local: &LocalRepository,
    repos: &[MavenRepository],
    client: &Client,
    ctx: &RunContext,
) -> miette::Result<String> {
    let xml = local
        .fetch_text(
            client,
            repos,
            ctx.offline,
            ctx.update,
            group,
            artifact,
            version,
            "maven-metadata.xml",
        )
        .await?;
    let Some(xml) = xml else {
        tracing::warn!("no snapshot metadata for {group}:{artifact}:{version}; using declared");
        return Ok(version.to_string());
    };
    let meta = metadata::parse_snapshot_metadata(&xml)?;
    Ok(meta
        .resolve_value(classifier, packaging)
        .unwrap_or_else(|| version.to_string()))
}
