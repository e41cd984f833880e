//! Maven coordinates and their jgo-specific modifiers.
//!
//! A coordinate is `groupId:artifactId[:version][:classifier][:packaging]`,
//! optionally followed by a parenthesized modifier group and a trailing `!`:
//!
//! - `(c)` / `(cp)` force class-path placement, `(m)` / `(mp)` / `(p)` force
//!   module-path placement;
//! - `(x)` marks the coordinate as a global exclusion rather than a
//!   participating dependency;
//! - `(x:G:A,G:A,...)` attaches per-coordinate exclusions;
//! - a trailing `!` disables the dependency-management import for this
//!   coordinate.

use std::fmt;

use jgo_util::errors::JgoError;

/// Default version requested when a coordinate omits one.
pub const DEFAULT_VERSION: &str = "RELEASE";

/// Default packaging when a coordinate omits one.
pub const DEFAULT_PACKAGING: &str = "jar";

/// Forced placement of an artifact on the JVM class path or module path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    ClassPath,
    ModulePath,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClassPath => f.write_str("c"),
            Self::ModulePath => f.write_str("m"),
        }
    }
}

/// An exclusion pattern `(groupId, artifactId)` where either side may be `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExclusionPattern {
    pub group_id: String,
    pub artifact_id: String,
}

impl ExclusionPattern {
    /// Parse `"G:A"`; a missing artifact part means `*`.
    pub fn parse(s: &str) -> Result<Self, JgoError> {
        let mut parts = s.splitn(2, ':');
        let group = parts.next().unwrap_or_default();
        if group.is_empty() {
            return Err(JgoError::Parse {
                message: format!("empty group in exclusion '{s}'"),
            });
        }
        let artifact = parts.next().unwrap_or("*");
        Ok(Self {
            group_id: group.to_string(),
            artifact_id: if artifact.is_empty() {
                "*".to_string()
            } else {
                artifact.to_string()
            },
        })
    }

    /// Whether this pattern matches the given `groupId:artifactId`.
    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        (self.group_id == "*" || self.group_id == group_id)
            && (self.artifact_id == "*" || self.artifact_id == artifact_id)
    }
}

impl fmt::Display for ExclusionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// A single parsed coordinate with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub packaging: String,
    pub placement: Option<Placement>,
    /// `(x)`: this coordinate only contributes a global exclusion.
    pub global_exclusion: bool,
    pub exclusions: Vec<ExclusionPattern>,
    /// `false` when the coordinate carried a trailing `!`.
    pub managed_import: bool,
}

impl Coordinate {
    /// A coordinate with all-default modifiers, for tests and synthetic roots.
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            classifier: None,
            packaging: DEFAULT_PACKAGING.to_string(),
            placement: None,
            global_exclusion: false,
            exclusions: Vec::new(),
            managed_import: true,
        }
    }

    /// Parse a coordinate string including its modifier suffixes.
    pub fn parse(input: &str) -> Result<Self, JgoError> {
        let mut rest = input.trim();

        let managed_import = if let Some(stripped) = rest.strip_suffix('!') {
            rest = stripped;
            false
        } else {
            true
        };

        let mut placement = None;
        let mut global_exclusion = false;
        let mut exclusions = Vec::new();

        if rest.ends_with(')') {
            // A trailing ')' may close a modifier group or a version range
            // such as `[1.0,2.0)`; only the former is stripped here.
            if let Some(open) = modifier_group_start(rest) {
                let body = &rest[open + 1..rest.len() - 1];
                rest = &rest[..open];
                parse_modifiers(
                    body,
                    input,
                    &mut placement,
                    &mut global_exclusion,
                    &mut exclusions,
                )?;
            }
        } else if rest.contains('(') {
            return Err(JgoError::Parse {
                message: format!("unterminated '(' in coordinate '{input}'"),
            });
        }

        let fields: Vec<&str> = rest.splitn(5, ':').collect();
        if fields.len() < 2 || fields[0].is_empty() || fields[1].is_empty() {
            return Err(JgoError::Parse {
                message: format!("coordinate '{input}' needs at least groupId:artifactId"),
            });
        }

        let get = |i: usize| fields.get(i).copied().filter(|s| !s.is_empty());

        Ok(Self {
            group_id: fields[0].to_string(),
            artifact_id: fields[1].to_string(),
            version: get(2).unwrap_or(DEFAULT_VERSION).to_string(),
            classifier: get(3).map(str::to_string),
            packaging: get(4).unwrap_or(DEFAULT_PACKAGING).to_string(),
            placement,
            global_exclusion,
            exclusions,
            managed_import,
        })
    }

    /// The `groupId:artifactId` key used for deduplication and exclusions.
    pub fn ga_key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Whether a concrete version was requested (not `RELEASE`/`LATEST`).
    pub fn has_pinned_version(&self) -> bool {
        self.version != "RELEASE" && self.version != "LATEST"
    }

    /// Conventional artifact filename: `artifactId-version[-classifier].packaging`.
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, c, self.packaging
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.packaging),
        }
    }
}

/// Offset of the `(` opening a trailing modifier group, or `None` when the
/// parenthetical is part of a version range (an exclusive bound opens with
/// `(` directly after a field separator).
fn modifier_group_start(rest: &str) -> Option<usize> {
    let open = rest.rfind('(')?;
    if open == 0 {
        return None;
    }
    match rest.as_bytes()[open - 1] {
        b':' | b',' | b'[' | b'(' => None,
        _ => Some(open),
    }
}

fn parse_modifiers(
    body: &str,
    input: &str,
    placement: &mut Option<Placement>,
    global_exclusion: &mut bool,
    exclusions: &mut Vec<ExclusionPattern>,
) -> Result<(), JgoError> {
    let mut in_exclusion_list = false;

    for token in body.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(JgoError::Parse {
                message: format!("empty modifier token in '{input}'"),
            });
        }

        let new_placement = match token {
            "c" | "cp" => Some(Placement::ClassPath),
            "m" | "mp" | "p" => Some(Placement::ModulePath),
            _ => None,
        };
        if let Some(p) = new_placement {
            if placement.is_some_and(|existing| existing != p) {
                return Err(JgoError::Parse {
                    message: format!("conflicting placement modifiers in '{input}'"),
                });
            }
            *placement = Some(p);
            in_exclusion_list = false;
            continue;
        }

        if token == "x" {
            *global_exclusion = true;
            in_exclusion_list = false;
            continue;
        }

        if let Some(spec) = token.strip_prefix("x:") {
            exclusions.push(ExclusionPattern::parse(spec)?);
            in_exclusion_list = true;
            continue;
        }

        // A bare G:A continues a preceding x:G:A list.
        if in_exclusion_list && token.contains(':') {
            exclusions.push(ExclusionPattern::parse(token)?);
            continue;
        }

        return Err(JgoError::Parse {
            message: format!("unknown modifier '{token}' in '{input}'"),
        });
    }

    if *global_exclusion && placement.is_some() {
        return Err(JgoError::Parse {
            message: format!("'{input}' mixes the x marker with a placement modifier"),
        });
    }

    Ok(())
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;

        let version = (self.version != DEFAULT_VERSION).then_some(self.version.as_str());
        let packaging = (self.packaging != DEFAULT_PACKAGING).then_some(self.packaging.as_str());

        if version.is_some() || self.classifier.is_some() || packaging.is_some() {
            write!(f, ":{}", version.unwrap_or_default())?;
        }
        if self.classifier.is_some() || packaging.is_some() {
            write!(f, ":{}", self.classifier.as_deref().unwrap_or_default())?;
        }
        if let Some(p) = packaging {
            write!(f, ":{p}")?;
        }

        let mut tokens: Vec<String> = Vec::new();
        if let Some(p) = self.placement {
            tokens.push(p.to_string());
        }
        if self.global_exclusion {
            tokens.push("x".to_string());
        }
        for (i, excl) in self.exclusions.iter().enumerate() {
            if i == 0 {
                tokens.push(format!("x:{excl}"));
            } else {
                tokens.push(excl.to_string());
            }
        }
        if !tokens.is_empty() {
            write!(f, "({})", tokens.join(","))?;
        }
        if !self.managed_import {
            f.write_str("!")?;
        }
        Ok(())
    }
}
