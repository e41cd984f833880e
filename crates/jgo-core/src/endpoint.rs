//! Endpoint parsing: one or more coordinates joined by `+`, optionally
//! followed by `@mainClass`.

use std::collections::HashMap;
use std::fmt;

use jgo_util::errors::JgoError;

use crate::coordinate::Coordinate;

/// A parsed launch request: coordinates plus an optional main class.
///
/// The coordinates of one endpoint share a single environment and classpath.
/// The `@mainClass` suffix may be a fully-qualified class name or a simple
/// suffix completed later by scanning the resolved JARs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub coordinates: Vec<Coordinate>,
    pub main_class: Option<String>,
}

impl Endpoint {
    /// Parse an endpoint string, expanding `shortcuts` first.
    pub fn parse(input: &str, shortcuts: &HashMap<String, String>) -> Result<Self, JgoError> {
        let expanded = expand_shortcut(input.trim(), shortcuts);

        let parts = split_top_level(&expanded, '+');
        if parts.iter().any(|p| p.is_empty()) {
            return Err(JgoError::Parse {
                message: format!("empty coordinate in endpoint '{input}'"),
            });
        }

        // Only the final segment may carry an @mainClass suffix.
        for part in &parts[..parts.len().saturating_sub(1)] {
            if part.contains('@') {
                return Err(JgoError::Parse {
                    message: format!("'@' is only valid on the last coordinate of '{input}'"),
                });
            }
        }

        let mut coordinates = Vec::with_capacity(parts.len());
        let mut main_class = None;

        for (i, part) in parts.iter().enumerate() {
            let mut coord_str = part.as_str();
            if i == parts.len() - 1 {
                let at_parts: Vec<&str> = part.split('@').collect();
                match at_parts.len() {
                    1 => {}
                    2 => {
                        coord_str = at_parts[0];
                        let class = at_parts[1].trim();
                        if class.is_empty() {
                            return Err(JgoError::Parse {
                                message: format!("empty main class after '@' in '{input}'"),
                            });
                        }
                        main_class = Some(class.to_string());
                    }
                    _ => {
                        return Err(JgoError::Parse {
                            message: format!("multiple '@' suffixes in '{input}'"),
                        });
                    }
                }
            }
            coordinates.push(Coordinate::parse(coord_str)?);
        }

        check_placement_conflicts(&coordinates, input)?;

        Ok(Self {
            coordinates,
            main_class,
        })
    }

    /// The coordinates that participate as dependencies (everything not
    /// marked as a pure `(x)` exclusion).
    pub fn dependency_coordinates(&self) -> impl Iterator<Item = &Coordinate> {
        self.coordinates.iter().filter(|c| !c.global_exclusion)
    }

    /// `groupId:artifactId` patterns excluded across the whole resolution.
    pub fn global_exclusions(&self) -> Vec<String> {
        self.coordinates
            .iter()
            .filter(|c| c.global_exclusion)
            .map(|c| c.ga_key())
            .collect()
    }

    /// The first participating coordinate; main-class inference prefers it.
    pub fn primary(&self) -> Option<&Coordinate> {
        self.dependency_coordinates().next()
    }
}

/// Two concatenated coordinates naming the same artifact must not force
/// different placements.
fn check_placement_conflicts(coordinates: &[Coordinate], input: &str) -> Result<(), JgoError> {
    for (i, a) in coordinates.iter().enumerate() {
        for b in &coordinates[i + 1..] {
            if a.ga_key() == b.ga_key()
                && a.placement.is_some()
                && b.placement.is_some()
                && a.placement != b.placement
            {
                return Err(JgoError::Parse {
                    message: format!(
                        "conflicting placements for {} across '{input}'",
                        a.ga_key()
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Single-pass shortcut expansion.
///
/// The candidate name is the longest input prefix that ends at `:`, `+`,
/// `@`, `(`, or end-of-string and is a key in `shortcuts`. Expansion does
/// not recurse.
fn expand_shortcut(input: &str, shortcuts: &HashMap<String, String>) -> String {
    if shortcuts.is_empty() {
        return input.to_string();
    }

    let mut boundaries: Vec<usize> = input
        .char_indices()
        .filter(|(_, ch)| matches!(ch, ':' | '+' | '@' | '('))
        .map(|(i, _)| i)
        .collect();
    boundaries.push(input.len());

    for end in boundaries.into_iter().rev() {
        let name = &input[..end];
        if let Some(replacement) = shortcuts.get(name) {
            return format!("{replacement}{}", &input[end..]);
        }
    }

    input.to_string()
}

/// Split on `sep` at the top level only, ignoring occurrences inside `(...)`.
fn split_top_level(input: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in input.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if c == sep && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.coordinates.iter().map(|c| c.to_string()).collect();
        f.write_str(&joined.join("+"))?;
        if let Some(ref main) = self.main_class {
            write!(f, "@{main}")?;
        }
        Ok(())
    }
}
