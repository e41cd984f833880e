//! Effective-POM loading: fetch, parent merging, BOM import expansion, and
//! property interpolation.
//!
//! Loaded POMs are memoized per `(groupId, artifactId, version)` for the
//! lifetime of the loader. Parent chains and BOM imports are resolved
//! recursively with a load-stack that turns cyclic POM graphs into a hard
//! error instead of a hang.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use reqwest::Client;

use jgo_maven::cache::LocalRepository;
use jgo_maven::pom::Pom;
use jgo_maven::repository::MavenRepository;
use jgo_util::errors::JgoError;

/// Memoizing, cycle-detecting POM loader.
#[derive(Clone)]
pub struct PomLoader {
    client: Client,
    repos: Arc<Vec<MavenRepository>>,
    local: LocalRepository,
    offline: bool,
    lenient: bool,
    memo: Arc<Mutex<HashMap<String, Option<Pom>>>>,
}

impl PomLoader {
    pub fn new(
        client: Client,
        repos: Vec<MavenRepository>,
        local: LocalRepository,
        offline: bool,
        lenient: bool,
    ) -> Self {
        Self {
            client,
            repos: Arc::new(repos),
            local,
            offline,
            lenient,
            memo: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Load the effective POM for a coordinate: raw POM merged with its
    /// parent chain, BOM imports expanded, and properties interpolated.
    ///
    /// Returns `Ok(None)` when no configured repository has the POM.
    pub async fn load_effective(
        &self,
        group: &str,
        artifact: &str,
        version: &str,
    ) -> miette::Result<Option<Pom>> {
        let mut stack = Vec::new();
        self.load_inner(
            group.to_string(),
            artifact.to_string(),
            version.to_string(),
            &mut stack,
        )
        .await
    }

    fn load_inner<'a>(
        &'a self,
        group: String,
        artifact: String,
        version: String,
        stack: &'a mut Vec<String>,
    ) -> BoxFuture<'a, miette::Result<Option<Pom>>> {
        Box::pin(async move {
            let key = format!("{group}:{artifact}:{version}");

            if stack.contains(&key) {
                return Err(JgoError::Parse {
                    message: format!(
                        "cyclic POM graph: {} -> {key}",
                        stack.join(" -> ")
                    ),
                }
                .into());
            }

            if let Some(cached) = self.memo.lock().expect("poisoned memo").get(&key) {
                return Ok(cached.clone());
            }

            stack.push(key.clone());
            let result = self
                .build_effective(&group, &artifact, &version, stack)
                .await;
            stack.pop();

            match result {
                Ok(pom) => {
                    self.memo
                        .lock()
                        .expect("poisoned memo")
                        .insert(key, pom.clone());
                    Ok(pom)
                }
                Err(e) => Err(e),
            }
        })
    }

    async fn build_effective(
        &self,
        group: &str,
        artifact: &str,
        version: &str,
        stack: &mut Vec<String>,
    ) -> miette::Result<Option<Pom>> {
        let raw = self
            .local
            .fetch_pom(&self.client, &self.repos, self.offline, group, artifact, version)
            .await?;
        let Some(mut pom) = raw else {
            return Ok(None);
        };

        // Merge the parent chain, nearest first.
        if let Some(parent_ref) = pom.parent.clone() {
            let parent = self
                .load_inner(
                    parent_ref.group_id.clone(),
                    parent_ref.artifact_id.clone(),
                    parent_ref.version.clone(),
                    stack,
                )
                .await?;
            match parent {
                Some(parent) => pom.apply_parent(&parent),
                None if self.lenient => {
                    tracing::warn!(
                        "parent POM {}:{}:{} not found; continuing without it",
                        parent_ref.group_id,
                        parent_ref.artifact_id,
                        parent_ref.version
                    );
                }
                None => {
                    return Err(JgoError::NotFound {
                        what: format!(
                            "parent POM {}:{}:{} of {group}:{artifact}:{version}",
                            parent_ref.group_id, parent_ref.artifact_id, parent_ref.version
                        ),
                    }
                    .into());
                }
            }
        }

        pom.resolve_properties();
        self.expand_bom_imports(&mut pom, stack).await?;
        pom.resolve_properties();

        let unresolved = pom.unresolved_expressions();
        if !unresolved.is_empty() {
            let message = format!(
                "{group}:{artifact}:{version} leaves {} uninterpolated",
                unresolved.join(", ")
            );
            if self.lenient {
                tracing::warn!("{message}");
            } else {
                return Err(JgoError::Interpolation { message }.into());
            }
        }

        Ok(Some(pom))
    }

    /// Replace `scope=import` entries in dependency management with the
    /// imported BOM's own managed dependencies. Entries already managed
    /// explicitly keep their versions.
    async fn expand_bom_imports(
        &self,
        pom: &mut Pom,
        stack: &mut Vec<String>,
    ) -> miette::Result<()> {
        let imports: Vec<(String, String, Option<String>)> = pom
            .bom_imports()
            .iter()
            .map(|d| (d.group_id.clone(), d.artifact_id.clone(), d.version.clone()))
            .collect();
        if imports.is_empty() {
            return Ok(());
        }

        pom.dependency_management.retain(|d| {
            !(d.scope.as_deref() == Some("import")
                && d.type_.as_deref().unwrap_or("jar") == "pom")
        });

        for (group, artifact, version) in imports {
            let Some(version) = version else {
                tracing::warn!("BOM import {group}:{artifact} has no version; skipping");
                continue;
            };
            let bom = self
                .load_inner(group.clone(), artifact.clone(), version.clone(), stack)
                .await?;
            match bom {
                Some(bom) => {
                    for dm in &bom.dependency_management {
                        let dominated = pom
                            .dependency_management
                            .iter()
                            .any(|d| d.gacp_key() == dm.gacp_key());
                        if !dominated {
                            pom.dependency_management.push(dm.clone());
                        }
                    }
                }
                None if self.lenient => {
                    tracing::warn!("imported BOM {group}:{artifact}:{version} not found");
                }
                None => {
                    return Err(JgoError::NotFound {
                        what: format!("imported BOM {group}:{artifact}:{version}"),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader_for(tmp: &std::path::Path) -> PomLoader {
        PomLoader::new(
            jgo_maven::download::build_client().unwrap(),
            Vec::new(),
            LocalRepository::new(tmp.to_path_buf()),
            true, // offline: tests only exercise the local cache
            false,
        )
    }

    fn put_pom(tmp: &std::path::Path, group: &str, artifact: &str, version: &str, xml: &str) {
        let path = std::path::Path::new(tmp)
            .join(group.replace('.', "/"))
            .join(artifact)
            .join(version)
            .join(format!("{artifact}-{version}.pom"));
        jgo_util::fs::write_atomic(&path, xml.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn missing_pom_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = loader_for(tmp.path());
        let pom = loader.load_effective("no.such", "artifact", "1.0").await.unwrap();
        assert!(pom.is_none());
    }

    #[tokio::test]
    async fn parent_properties_flow_into_child() {
        let tmp = tempfile::tempdir().unwrap();
        put_pom(
            tmp.path(),
            "org.example",
            "parent",
            "1.0",
            r#"<project>
    <groupId>org.example</groupId><artifactId>parent</artifactId>
    <version>1.0</version><packaging>pom</packaging>
    <properties><dep.version>9.9</dep.version></properties>
</project>"#,
        );
        put_pom(
            tmp.path(),
            "org.example",
            "child",
            "1.0",
            r#"<project>
    <parent>
        <groupId>org.example</groupId><artifactId>parent</artifactId>
        <version>1.0</version>
    </parent>
    <artifactId>child</artifactId>
    <dependencies>
        <dependency>
            <groupId>o</groupId><artifactId>lib</artifactId>
            <version>${dep.version}</version>
        </dependency>
    </dependencies>
</project>"#,
        );

        let loader = loader_for(tmp.path());
        let pom = loader
            .load_effective("org.example", "child", "1.0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pom.dependencies[0].version.as_deref(), Some("9.9"));
        assert_eq!(pom.effective_group_id(), Some("org.example"));
    }

    #[tokio::test]
    async fn bom_import_expands_managed_versions() {
        let tmp = tempfile::tempdir().unwrap();
        put_pom(
            tmp.path(),
            "org.example",
            "bom",
            "2.0",
            r#"<project>
    <groupId>org.example</groupId><artifactId>bom</artifactId>
    <version>2.0</version><packaging>pom</packaging>
    <dependencyManagement><dependencies>
        <dependency>
            <groupId>o</groupId><artifactId>managed</artifactId><version>5.5</version>
        </dependency>
    </dependencies></dependencyManagement>
</project>"#,
        );
        put_pom(
            tmp.path(),
            "org.example",
            "app",
            "1.0",
            r#"<project>
    <groupId>org.example</groupId><artifactId>app</artifactId><version>1.0</version>
    <dependencyManagement><dependencies>
        <dependency>
            <groupId>org.example</groupId><artifactId>bom</artifactId>
            <version>2.0</version><type>pom</type><scope>import</scope>
        </dependency>
    </dependencies></dependencyManagement>
</project>"#,
        );

        let loader = loader_for(tmp.path());
        let pom = loader
            .load_effective("org.example", "app", "1.0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pom.managed_version("o", "managed"), Some("5.5"));
        assert!(pom.bom_imports().is_empty());
    }

    #[tokio::test]
    async fn cyclic_parent_chain_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        put_pom(
            tmp.path(),
            "org.cycle",
            "a",
            "1",
            r#"<project>
    <parent><groupId>org.cycle</groupId><artifactId>b</artifactId><version>1</version></parent>
    <artifactId>a</artifactId>
</project>"#,
        );
        put_pom(
            tmp.path(),
            "org.cycle",
            "b",
            "1",
            r#"<project>
    <parent><groupId>org.cycle</groupId><artifactId>a</artifactId><version>1</version></parent>
    <artifactId>b</artifactId>
</project>"#,
        );

        let loader = loader_for(tmp.path());
        let err = loader.load_effective("org.cycle", "a", "1").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn memoization_survives_repeat_loads() {
        let tmp = tempfile::tempdir().unwrap();
        put_pom(
            tmp.path(),
            "g",
            "a",
            "1",
            r#"<project><groupId>g</groupId><artifactId>a</artifactId><version>1</version></project>"#,
        );
        let loader = loader_for(tmp.path());
        let first = loader.load_effective("g", "a", "1").await.unwrap();
        assert!(first.is_some());

        // Even after the backing file disappears, the memoized POM is served.
        std::fs::remove_dir_all(tmp.path().join("g")).unwrap();
        let second = loader.load_effective("g", "a", "1").await.unwrap();
        assert!(second.is_some());
    }
}
