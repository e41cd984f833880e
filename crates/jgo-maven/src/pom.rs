//! POM file parsing: dependency declarations, parent inheritance, property
//! interpolation, BOM imports.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use jgo_util::errors::JgoError;

/// Interpolation is fixed-point up to this many passes; chains longer than
/// this are treated as unresolved.
const MAX_INTERPOLATION_PASSES: usize = 16;

/// A parsed POM (Project Object Model) file.
#[derive(Debug, Clone, Default)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,

    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    pub dependency_management: Vec<PomDependency>,
    pub modules: Vec<String>,
}

/// Reference to a parent POM.
#[derive(Debug, Clone)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

/// A dependency declared in a POM file.
#[derive(Debug, Clone, Default)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    pub classifier: Option<String>,
    pub type_: Option<String>,
    pub exclusions: Vec<PomExclusion>,
}

impl PomDependency {
    /// Key identifying a dependency for inheritance overrides:
    /// `(groupId, artifactId, classifier, type)`.
    pub fn gacp_key(&self) -> (String, String, String, String) {
        (
            self.group_id.clone(),
            self.artifact_id.clone(),
            self.classifier.clone().unwrap_or_default(),
            self.type_.clone().unwrap_or_else(|| "jar".to_string()),
        )
    }
}

/// An exclusion within a dependency declaration.
#[derive(Debug, Clone)]
pub struct PomExclusion {
    pub group_id: String,
    pub artifact_id: Option<String>,
}

impl Pom {
    /// Effective group ID (falls back to parent).
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    /// Effective version (falls back to parent).
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.version.as_str()))
    }

    /// Whether this POM describes a JAR-less aggregator/BOM artifact.
    pub fn is_pom_packaging(&self) -> bool {
        self.packaging.as_deref() == Some("pom")
    }

    /// Resolve `${property}` references in a string using POM properties,
    /// built-in project variables, and `env.*` environment lookups.
    pub fn interpolate(&self, input: &str) -> String {
        let mut result = input.to_string();
        let mut iterations = 0;
        while result.contains("${") && iterations < MAX_INTERPOLATION_PASSES {
            iterations += 1;
            let mut new = result.clone();
            while let Some(start) = new.find("${") {
                let Some(end) = new[start..].find('}') else {
                    break;
                };
                let key = &new[start + 2..start + end];
                let value = self.resolve_property(key);
                if let Some(val) = value {
                    new = format!("{}{}{}", &new[..start], val, &new[start + end + 1..]);
                } else {
                    break;
                }
            }
            if new == result {
                break;
            }
            result = new;
        }
        result
    }

    fn resolve_property(&self, key: &str) -> Option<String> {
        if let Some(var) = key.strip_prefix("env.") {
            return std::env::var(var).ok();
        }
        match key {
            "project.groupId" | "pom.groupId" => self.effective_group_id().map(|s| s.to_string()),
            "project.artifactId" | "pom.artifactId" => self.artifact_id.clone(),
            "project.version" | "pom.version" => self.effective_version().map(|s| s.to_string()),
            "project.packaging" | "pom.packaging" => self.packaging.clone(),
            "project.parent.groupId" => self.parent.as_ref().map(|p| p.group_id.clone()),
            "project.parent.version" => self.parent.as_ref().map(|p| p.version.clone()),
            _ => self.properties.get(key).cloned(),
        }
    }

    /// Interpolate all property references in dependencies and dependency
    /// management.
    pub fn resolve_properties(&mut self) {
        let snapshot = self.clone();
        for dep in self
            .dependencies
            .iter_mut()
            .chain(self.dependency_management.iter_mut())
        {
            dep.group_id = snapshot.interpolate(&dep.group_id);
            dep.artifact_id = snapshot.interpolate(&dep.artifact_id);
            if let Some(ref v) = dep.version {
                dep.version = Some(snapshot.interpolate(v));
            }
            if let Some(ref c) = dep.classifier {
                dep.classifier = Some(snapshot.interpolate(c));
            }
        }
    }

    /// `${...}` expressions that survived interpolation, for error reporting.
    pub fn unresolved_expressions(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut check = |s: &str| {
            if s.contains("${") {
                out.push(s.to_string());
            }
        };
        for dep in self.dependencies.iter().chain(&self.dependency_management) {
            check(&dep.group_id);
            check(&dep.artifact_id);
            if let Some(ref v) = dep.version {
                check(v);
            }
        }
        out
    }

    /// Merge a parent POM into this one.
    ///
    /// Child entries win: properties, dependency management, and
    /// dependencies are each overridden by `(groupId, artifactId,
    /// classifier, type)` key. Missing child coordinates inherit the
    /// parent's group and version.
    pub fn apply_parent(&mut self, parent: &Pom) {
        for (k, v) in &parent.properties {
            self.properties
                .entry(k.clone())
                .or_insert_with(|| v.clone());
        }
        if self.group_id.is_none() {
            self.group_id = parent.effective_group_id().map(|s| s.to_string());
        }
        if self.version.is_none() {
            self.version = parent.effective_version().map(|s| s.to_string());
        }
        for dm in &parent.dependency_management {
            let dominated = self
                .dependency_management
                .iter()
                .any(|d| d.gacp_key() == dm.gacp_key());
            if !dominated {
                self.dependency_management.push(dm.clone());
            }
        }
        for dep in &parent.dependencies {
            let dominated = self.dependencies.iter().any(|d| d.gacp_key() == dep.gacp_key());
            if !dominated {
                self.dependencies.push(dep.clone());
            }
        }
    }

    /// Look up a managed version for a given group:artifact.
    pub fn managed_version(&self, group_id: &str, artifact_id: &str) -> Option<&str> {
        self.dependency_management
            .iter()
            .find(|d| d.group_id == group_id && d.artifact_id == artifact_id)
            .and_then(|d| d.version.as_deref())
    }

    /// Return BOM imports from dependency management
    /// (entries with `scope = "import"` and `type = "pom"`).
    pub fn bom_imports(&self) -> Vec<&PomDependency> {
        self.dependency_management
            .iter()
            .filter(|d| {
                d.scope.as_deref() == Some("import") && d.type_.as_deref().unwrap_or("jar") == "pom"
            })
            .collect()
    }
}

/// Parse a POM XML string into a `Pom` struct.
///
/// The parser streams events and tolerates unknown or missing elements;
/// declaration order of dependencies and dependency management is preserved.
pub fn parse_pom(xml: &str) -> miette::Result<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();

    let mut current_dep: Option<PomDependency> = None;
    let mut current_exclusion: Option<PomExclusion> = None;
    let mut current_parent: Option<ParentRef> = None;
    let mut in_dep_mgmt = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                path.push(tag);
                text_buf.clear();

                let ctx = path.join(">");
                match ctx.as_str() {
                    "project>dependencyManagement>dependencies>dependency" => {
                        in_dep_mgmt = true;
                        current_dep = Some(PomDependency::default());
                    }
                    "project>dependencies>dependency" => {
                        current_dep = Some(PomDependency::default());
                    }
                    _ if ctx.ends_with(">exclusion") && current_dep.is_some() => {
                        current_exclusion = Some(PomExclusion {
                            group_id: String::new(),
                            artifact_id: None,
                        });
                    }
                    "project>parent" => {
                        current_parent = Some(ParentRef {
                            group_id: String::new(),
                            artifact_id: String::new(),
                            version: String::new(),
                        });
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                let ctx = path.join(">");
                let depth = path.len();

                // Properties: <project><properties><key>value</key></properties>
                if depth == 3 && path.get(1).map(|s| s.as_str()) == Some("properties") {
                    let prop_name = path.last().cloned().unwrap_or_default();
                    pom.properties.insert(prop_name, text_buf.clone());
                }

                if let Some(ref mut dep) = current_dep {
                    if let Some(ref mut excl) = current_exclusion {
                        match path.last().map(|s| s.as_str()) {
                            Some("groupId") => excl.group_id = text_buf.clone(),
                            Some("artifactId") => excl.artifact_id = Some(text_buf.clone()),
                            _ => {}
                        }
                        if ctx.ends_with(">exclusion") {
                            if let Some(excl) = current_exclusion.take() {
                                dep.exclusions.push(excl);
                            }
                        }
                    } else {
                        match path.last().map(|s| s.as_str()) {
                            Some("groupId") if ctx.ends_with(">dependency>groupId") => {
                                dep.group_id = text_buf.clone();
                            }
                            Some("artifactId") if ctx.ends_with(">dependency>artifactId") => {
                                dep.artifact_id = text_buf.clone();
                            }
                            Some("version") if ctx.ends_with(">dependency>version") => {
                                dep.version = Some(text_buf.clone());
                            }
                            Some("scope") if ctx.ends_with(">dependency>scope") => {
                                dep.scope = Some(text_buf.clone());
                            }
                            Some("optional") if ctx.ends_with(">dependency>optional") => {
                                dep.optional = text_buf.trim() == "true";
                            }
                            Some("classifier") if ctx.ends_with(">dependency>classifier") => {
                                dep.classifier = Some(text_buf.clone());
                            }
                            Some("type") if ctx.ends_with(">dependency>type") => {
                                dep.type_ = Some(text_buf.clone());
                            }
                            _ => {}
                        }
                    }

                    if ctx == "project>dependencies>dependency"
                        || ctx == "project>dependencyManagement>dependencies>dependency"
                    {
                        if let Some(dep) = current_dep.take() {
                            if in_dep_mgmt {
                                pom.dependency_management.push(dep);
                            } else {
                                pom.dependencies.push(dep);
                            }
                        }
                        in_dep_mgmt = false;
                    }
                }

                if let Some(ref mut parent) = current_parent {
                    match path.last().map(|s| s.as_str()) {
                        Some("groupId") if ctx == "project>parent>groupId" => {
                            parent.group_id = text_buf.clone();
                        }
                        Some("artifactId") if ctx == "project>parent>artifactId" => {
                            parent.artifact_id = text_buf.clone();
                        }
                        Some("version") if ctx == "project>parent>version" => {
                            parent.version = text_buf.clone();
                        }
                        _ => {}
                    }
                    if ctx == "project>parent" {
                        pom.parent = current_parent.take();
                    }
                }

                if depth == 2 {
                    match path.last().map(|s| s.as_str()) {
                        Some("groupId") => pom.group_id = Some(text_buf.clone()),
                        Some("artifactId") => pom.artifact_id = Some(text_buf.clone()),
                        Some("version") => pom.version = Some(text_buf.clone()),
                        Some("packaging") => pom.packaging = Some(text_buf.clone()),
                        Some("name") => pom.name = Some(text_buf.clone()),
                        Some("description") => pom.description = Some(text_buf.clone()),
                        _ => {}
                    }
                }

                if ctx == "project>modules>module" {
                    pom.modules.push(text_buf.clone());
                }

                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(JgoError::Parse {
                    message: format!("failed to parse POM XML: {e}"),
                }
                .into());
            }
            _ => {}
        }
    }

    Ok(pom)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
    <groupId>org.example</groupId>
    <artifactId>my-lib</artifactId>
    <version>1.0.0</version>
    <packaging>jar</packaging>

    <properties>
        <jython.version>2.7.3</jython.version>
    </properties>

    <dependencies>
        <dependency>
            <groupId>org.python</groupId>
            <artifactId>jython-standalone</artifactId>
            <version>${jython.version}</version>
        </dependency>
        <dependency>
            <groupId>junit</groupId>
            <artifactId>junit</artifactId>
            <version>4.13.2</version>
            <scope>test</scope>
        </dependency>
    </dependencies>
</project>"#;

    #[test]
    fn parse_simple_pom() {
        let pom = parse_pom(SIMPLE_POM).unwrap();
        assert_eq!(pom.group_id.as_deref(), Some("org.example"));
        assert_eq!(pom.artifact_id.as_deref(), Some("my-lib"));
        assert_eq!(pom.version.as_deref(), Some("1.0.0"));
        assert_eq!(pom.dependencies.len(), 2);
        assert_eq!(pom.properties.get("jython.version").unwrap(), "2.7.3");
    }

    #[test]
    fn property_interpolation() {
        let mut pom = parse_pom(SIMPLE_POM).unwrap();
        pom.resolve_properties();
        assert_eq!(pom.dependencies[0].version.as_deref(), Some("2.7.3"));
        assert!(pom.unresolved_expressions().is_empty());
    }

    #[test]
    fn chained_interpolation_converges() {
        let mut pom = Pom::default();
        pom.properties
            .insert("one".to_string(), "${two}".to_string());
        pom.properties.insert("two".to_string(), "3".to_string());
        assert_eq!(pom.interpolate("v${one}"), "v3");
    }

    #[test]
    fn unresolved_expression_survives_and_is_reported() {
        let mut pom = parse_pom(
            r#"<project>
    <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
    <dependencies>
        <dependency>
            <groupId>o</groupId><artifactId>b</artifactId>
            <version>${mystery.version}</version>
        </dependency>
    </dependencies>
</project>"#,
        )
        .unwrap();
        pom.resolve_properties();
        let unresolved = pom.unresolved_expressions();
        assert_eq!(unresolved, vec!["${mystery.version}".to_string()]);
    }

    #[test]
    fn project_version_interpolation() {
        let mut pom = parse_pom(
            r#"<project>
    <groupId>org.example</groupId>
    <artifactId>lib</artifactId>
    <version>3.0.0</version>
    <dependencies>
        <dependency>
            <groupId>${project.groupId}</groupId>
            <artifactId>sibling</artifactId>
            <version>${project.version}</version>
        </dependency>
    </dependencies>
</project>"#,
        )
        .unwrap();
        pom.resolve_properties();
        assert_eq!(pom.dependencies[0].group_id, "org.example");
        assert_eq!(pom.dependencies[0].version.as_deref(), Some("3.0.0"));
    }

    #[test]
    fn dependency_management_and_bom() {
        let xml = r#"<?xml version="1.0"?>
<project>
    <groupId>org.example</groupId>
    <artifactId>parent</artifactId>
    <version>1.0.0</version>

    <dependencyManagement>
        <dependencies>
            <dependency>
                <groupId>net.imagej</groupId>
                <artifactId>pom-imagej</artifactId>
                <version>2.15.0</version>
                <type>pom</type>
                <scope>import</scope>
            </dependency>
            <dependency>
                <groupId>com.google.guava</groupId>
                <artifactId>guava</artifactId>
                <version>32.0.0-jre</version>
            </dependency>
        </dependencies>
    </dependencyManagement>
</project>"#;
        let pom = parse_pom(xml).unwrap();
        assert_eq!(pom.dependency_management.len(), 2);
        let boms = pom.bom_imports();
        assert_eq!(boms.len(), 1);
        assert_eq!(boms[0].artifact_id, "pom-imagej");
        assert_eq!(
            pom.managed_version("com.google.guava", "guava"),
            Some("32.0.0-jre")
        );
    }

    #[test]
    fn parent_ref_and_inheritance() {
        let xml = r#"<?xml version="1.0"?>
<project>
    <parent>
        <groupId>org.scijava</groupId>
        <artifactId>pom-scijava</artifactId>
        <version>37.0.0</version>
    </parent>
    <artifactId>child</artifactId>
</project>"#;
        let mut child = parse_pom(xml).unwrap();
        assert_eq!(child.effective_group_id(), Some("org.scijava"));
        assert_eq!(child.effective_version(), Some("37.0.0"));

        let mut parent = Pom::default();
        parent.group_id = Some("org.scijava".to_string());
        parent.version = Some("37.0.0".to_string());
        parent
            .properties
            .insert("shared".to_string(), "yes".to_string());
        parent.dependencies.push(PomDependency {
            group_id: "org.scijava".to_string(),
            artifact_id: "scijava-common".to_string(),
            version: Some("2.96.0".to_string()),
            ..Default::default()
        });

        child.apply_parent(&parent);
        assert_eq!(child.properties.get("shared").map(String::as_str), Some("yes"));
        assert_eq!(child.dependencies.len(), 1);
    }

    #[test]
    fn child_dependency_overrides_parent_by_gacp() {
        let mut child = Pom::default();
        child.dependencies.push(PomDependency {
            group_id: "g".to_string(),
            artifact_id: "a".to_string(),
            version: Some("2.0".to_string()),
            ..Default::default()
        });
        let mut parent = Pom::default();
        parent.dependencies.push(PomDependency {
            group_id: "g".to_string(),
            artifact_id: "a".to_string(),
            version: Some("1.0".to_string()),
            ..Default::default()
        });
        // Same artifact with a different classifier is a distinct key.
        parent.dependencies.push(PomDependency {
            group_id: "g".to_string(),
            artifact_id: "a".to_string(),
            version: Some("1.0".to_string()),
            classifier: Some("natives-linux".to_string()),
            ..Default::default()
        });

        child.apply_parent(&parent);
        assert_eq!(child.dependencies.len(), 2);
        assert_eq!(child.dependencies[0].version.as_deref(), Some("2.0"));
    }

    #[test]
    fn exclusion_parsing() {
        let xml = r#"<?xml version="1.0"?>
<project>
    <groupId>org.example</groupId>
    <artifactId>app</artifactId>
    <version>1.0</version>
    <dependencies>
        <dependency>
            <groupId>com.example</groupId>
            <artifactId>lib</artifactId>
            <version>1.0</version>
            <exclusions>
                <exclusion>
                    <groupId>commons-logging</groupId>
                    <artifactId>commons-logging</artifactId>
                </exclusion>
            </exclusions>
        </dependency>
    </dependencies>
</project>"#;
        let pom = parse_pom(xml).unwrap();
        assert_eq!(pom.dependencies[0].exclusions.len(), 1);
        assert_eq!(pom.dependencies[0].exclusions[0].group_id, "commons-logging");
    }

    #[test]
    fn pom_packaging_detection() {
        let pom = parse_pom(
            r#"<project><groupId>g</groupId><artifactId>bom</artifactId>
               <version>1</version><packaging>pom</packaging></project>"#,
        )
        .unwrap();
        assert!(pom.is_pom_packaging());
    }
}
