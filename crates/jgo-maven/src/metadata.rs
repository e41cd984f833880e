//! maven-metadata.xml parsing for version discovery and SNAPSHOT resolution.

use quick_xml::events::Event;
use quick_xml::Reader;

use jgo_util::errors::JgoError;

/// Artifact-level Maven metadata listing available versions.
#[derive(Debug, Clone, Default)]
pub struct MavenMetadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Vec<String>,
}

/// Version-level snapshot metadata for timestamped SNAPSHOT resolution.
#[derive(Debug, Clone, Default)]
pub struct SnapshotMetadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub timestamp: Option<String>,
    pub build_number: Option<u32>,
    pub last_updated: Option<String>,
    /// `<snapshotVersions>` entries keyed by `(classifier, extension)`.
    pub snapshot_versions: Vec<SnapshotVersion>,
}

/// One `<snapshotVersion>` entry.
#[derive(Debug, Clone, Default)]
pub struct SnapshotVersion {
    pub classifier: Option<String>,
    pub extension: Option<String>,
    /// Timestamped concrete version, e.g. `1.0-20240615.143022-42`.
    pub value: Option<String>,
    pub updated: Option<String>,
}

impl SnapshotMetadata {
    /// The concrete timestamped version for `(classifier, extension)`.
    ///
    /// Falls back to the `<snapshot>` timestamp/buildNumber pair when no
    /// matching `<snapshotVersion>` entry exists (older repositories).
    pub fn resolve_value(&self, classifier: Option<&str>, extension: &str) -> Option<String> {
        let matching = self.snapshot_versions.iter().find(|sv| {
            sv.classifier.as_deref() == classifier
                && sv.extension.as_deref().unwrap_or("jar") == extension
        });
        if let Some(sv) = matching {
            return sv.value.clone();
        }
        let base = self.version.as_deref()?.strip_suffix("-SNAPSHOT")?;
        let ts = self.timestamp.as_deref()?;
        let bn = self.build_number?;
        Some(format!("{base}-{ts}-{bn}"))
    }

    /// Timestamped filename base for downloads: `artifactId-<value>`.
    pub fn snapshot_file_base(
        &self,
        artifact_id: &str,
        classifier: Option<&str>,
        extension: &str,
    ) -> Option<String> {
        let value = self.resolve_value(classifier, extension)?;
        Some(format!("{artifact_id}-{value}"))
    }
}

/// Parse an artifact-level `maven-metadata.xml` that lists available versions.
pub fn parse_metadata(xml: &str) -> miette::Result<MavenMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut meta = MavenMetadata::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                text_buf.clear();
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                let ctx = path.join(">");
                match ctx.as_str() {
                    "metadata>groupId" => meta.group_id = Some(text_buf.clone()),
                    "metadata>artifactId" => meta.artifact_id = Some(text_buf.clone()),
                    "metadata>versioning>latest" => meta.latest = Some(text_buf.clone()),
                    "metadata>versioning>release" => meta.release = Some(text_buf.clone()),
                    "metadata>versioning>versions>version" => {
                        meta.versions.push(text_buf.clone());
                    }
                    _ => {}
                }
                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(JgoError::Parse {
                    message: format!("failed to parse maven-metadata.xml: {e}"),
                }
                .into());
            }
            _ => {}
        }
    }

    Ok(meta)
}

/// Parse a version-level `maven-metadata.xml` for SNAPSHOT resolution.
pub fn parse_snapshot_metadata(xml: &str) -> miette::Result<SnapshotMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut meta = SnapshotMetadata::default();
    let mut current_sv: Option<SnapshotVersion> = None;
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                text_buf.clear();
                if path.join(">") == "metadata>versioning>snapshotVersions>snapshotVersion" {
                    current_sv = Some(SnapshotVersion::default());
                }
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                let ctx = path.join(">");
                if let Some(ref mut sv) = current_sv {
                    match path.last().map(|s| s.as_str()) {
                        Some("classifier") => sv.classifier = Some(text_buf.clone()),
                        Some("extension") => sv.extension = Some(text_buf.clone()),
                        Some("value") => sv.value = Some(text_buf.clone()),
                        Some("updated") => sv.updated = Some(text_buf.clone()),
                        _ => {}
                    }
                    if ctx == "metadata>versioning>snapshotVersions>snapshotVersion" {
                        if let Some(sv) = current_sv.take() {
                            meta.snapshot_versions.push(sv);
                        }
                    }
                } else {
                    match ctx.as_str() {
                        "metadata>groupId" => meta.group_id = Some(text_buf.clone()),
                        "metadata>artifactId" => meta.artifact_id = Some(text_buf.clone()),
                        "metadata>version" => meta.version = Some(text_buf.clone()),
                        "metadata>versioning>snapshot>timestamp" => {
                            meta.timestamp = Some(text_buf.clone());
                        }
                        "metadata>versioning>snapshot>buildNumber" => {
                            meta.build_number = text_buf.parse().ok();
                        }
                        "metadata>versioning>lastUpdated" => {
                            meta.last_updated = Some(text_buf.clone());
                        }
                        _ => {}
                    }
                }
                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(JgoError::Parse {
                    message: format!("failed to parse snapshot metadata: {e}"),
                }
                .into());
            }
            _ => {}
        }
    }

    Ok(meta)
}
