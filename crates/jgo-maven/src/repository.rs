//! Maven repository abstraction: URL layout and configuration.

/// Maven Central base URL.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// A configured remote Maven repository.
#[derive(Debug, Clone)]
pub struct MavenRepository {
    pub name: String,
    pub url: String,
}

impl MavenRepository {
    /// Build a repository from a name and base URL.
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    /// Construct the default Maven Central repository.
    pub fn maven_central() -> Self {
        Self::new("central", MAVEN_CENTRAL_URL)
    }

    /// Standard Maven layout path for a given coordinate.
    ///
    /// `org.python:jython-standalone:2.7.3` becomes
    /// `org/python/jython-standalone/2.7.3`
    pub fn coordinate_path(group: &str, artifact: &str, version: &str) -> String {
        format!("{}/{}/{}", group.replace('.', "/"), artifact, version)
    }

    /// Full URL to a specific file within the repository.
    pub fn file_url(&self, group: &str, artifact: &str, version: &str, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.url,
            Self::coordinate_path(group, artifact, version),
            filename
        )
    }

    /// URL to the POM file for a given coordinate.
    pub fn pom_url(&self, group: &str, artifact: &str, version: &str) -> String {
        let filename = format!("{artifact}-{version}.pom");
        self.file_url(group, artifact, version, &filename)
    }

    /// URL to the `maven-metadata.xml` at the artifact level (version listing).
    pub fn metadata_url(&self, group: &str, artifact: &str) -> String {
        format!(
            "{}/{}/{}/maven-metadata.xml",
            self.url,
            group.replace('.', "/"),
            artifact
        )
    }

    /// URL to the `maven-metadata.xml` at the version level (SNAPSHOT resolution).
    pub fn snapshot_metadata_url(&self, group: &str, artifact: &str, version: &str) -> String {
        format!(
            "{}/{}/maven-metadata.xml",
            self.url,
            Self::coordinate_path(group, artifact, version)
        )
    }
}

/// Build the probe-ordered repository list from `(name, url)` pairs,
/// always ensuring Maven Central is present.
pub fn build_repos(configured: &[(String, String)]) -> Vec<MavenRepository> {
    let mut repos: Vec<MavenRepository> = configured
        .iter()
        .map(|(name, url)| MavenRepository::new(name, url))
        .collect();
    if !repos.iter().any(|r| r.url.contains("repo.maven.apache.org")) {
        repos.push(MavenRepository::maven_central());
    }
    repos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_path_replaces_dots() {
        let path = MavenRepository::coordinate_path("org.python", "jython-standalone", "2.7.3");
        assert_eq!(path, "org/python/jython-standalone/2.7.3");
    }

    #[test]
    fn pom_url_format() {
        let repo = MavenRepository::maven_central();
        let url = repo.pom_url("org.scijava", "parsington", "3.1.0");
        assert_eq!(
            url,
            "https://repo.maven.apache.org/maven2/org/scijava/parsington/3.1.0/parsington-3.1.0.pom"
        );
    }

    #[test]
    fn metadata_url_format() {
        let repo = MavenRepository::maven_central();
        let url = repo.metadata_url("org.scijava", "parsington");
        assert_eq!(
            url,
            "https://repo.maven.apache.org/maven2/org/scijava/parsington/maven-metadata.xml"
        );
    }

    #[test]
    fn snapshot_metadata_is_version_level() {
        let repo = MavenRepository::maven_central();
        let url = repo.snapshot_metadata_url("g", "a", "1.0-SNAPSHOT");
        assert!(url.ends_with("g/a/1.0-SNAPSHOT/maven-metadata.xml"));
    }

    #[test]
    fn build_repos_appends_central() {
        let repos = build_repos(&[(
            "scijava".to_string(),
            "https://maven.scijava.org/content/groups/public/".to_string(),
        )]);
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].name, "scijava");
        assert!(!repos[0].url.ends_with('/'));
        assert_eq!(repos[1].name, "central");
    }

    #[test]
    fn build_repos_keeps_explicit_central_position() {
        let repos = build_repos(&[("central".to_string(), MAVEN_CENTRAL_URL.to_string())]);
        assert_eq!(repos.len(), 1);
    }
}
