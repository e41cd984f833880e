//! Global user settings loaded from `~/.jgo/settings.ini`.
//!
//! The settings file is INI-format with three sections:
//!
//! ```ini
//! [settings]
//! links = auto
//! cache-dir = /var/cache/jgo
//!
//! [repositories]
//! scijava = https://maven.scijava.org/content/groups/public
//!
//! [shortcuts]
//! imagej = net.imagej:imagej
//! ```
//!
//! Repository declaration order is significant (remotes are probed in
//! order), so repositories are kept as an ordered list rather than a map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use jgo_util::errors::JgoError;

/// File name of the global settings file inside the jgo directory.
pub const SETTINGS_FILE: &str = "settings.ini";

/// Parsed global settings.
#[derive(Debug, Clone, Default)]
pub struct GlobalSettings {
    /// Keys from `[settings]`: `links`, `cache-dir`, `repo-cache`, ...
    pub settings: HashMap<String, String>,
    /// `[repositories]` entries in declaration order.
    pub repositories: Vec<(String, String)>,
    /// `[shortcuts]` endpoint abbreviations.
    pub shortcuts: HashMap<String, String>,
}

impl GlobalSettings {
    /// Parse INI text. Unknown sections are ignored; `;` and `#` start
    /// comments; keys and section names are case-insensitive.
    pub fn parse_ini(content: &str) -> Result<Self, JgoError> {
        let mut out = Self::default();
        let mut section = String::new();

        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                if !line.ends_with(']') {
                    return Err(JgoError::Parse {
                        message: format!("settings line {}: unterminated section", lineno + 1),
                    });
                }
                section = line[1..line.len() - 1].trim().to_ascii_lowercase();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(JgoError::Parse {
                    message: format!("settings line {}: expected key = value", lineno + 1),
                });
            };
            let key = key.trim().to_string();
            let value = value.trim().to_string();

            match section.as_str() {
                "settings" => {
                    out.settings.insert(key.to_ascii_lowercase(), value);
                }
                "repositories" => out.repositories.push((key, value)),
                "shortcuts" => {
                    out.shortcuts.insert(key, value);
                }
                _ => {}
            }
        }

        Ok(out)
    }

    /// Load from a file, returning defaults when it does not exist.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(JgoError::Io)?;
        Ok(Self::parse_ini(&content)?)
    }

    /// Load from the default location.
    pub fn load() -> miette::Result<Self> {
        Self::from_path(&Self::default_path())
    }

    /// `~/.jgo/settings.ini` (respecting `JGO_CACHE_DIR`).
    pub fn default_path() -> PathBuf {
        jgo_util::dirs_path().join(SETTINGS_FILE)
    }

    /// A `[settings]` value by (case-insensitive) key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INI: &str = r#"
; global jgo configuration
[settings]
links = soft
cache-dir = /tmp/jgo-cache

[repositories]
scijava = https://maven.scijava.org/content/groups/public
central = https://repo.maven.apache.org/maven2

[shortcuts]
imagej = net.imagej:imagej
repl = org.scijava:scijava-common@ScriptREPL
"#;

    #[test]
    fn parse_all_sections() {
        let s = GlobalSettings::parse_ini(INI).unwrap();
        assert_eq!(s.get("links"), Some("soft"));
        assert_eq!(s.get("cache-dir"), Some("/tmp/jgo-cache"));
        assert_eq!(s.repositories.len(), 2);
        assert_eq!(s.shortcuts["imagej"], "net.imagej:imagej");
    }

    #[test]
    fn repository_order_is_preserved() {
        let s = GlobalSettings::parse_ini(INI).unwrap();
        assert_eq!(s.repositories[0].0, "scijava");
        assert_eq!(s.repositories[1].0, "central");
    }

    #[test]
    fn comments_and_blanks_ignored() {
        let s = GlobalSettings::parse_ini("# top\n\n[settings]\n; note\nlinks = hard\n").unwrap();
        assert_eq!(s.get("links"), Some("hard"));
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert!(GlobalSettings::parse_ini("[settings\n").is_err());
        assert!(GlobalSettings::parse_ini("[settings]\nnot a pair\n").is_err());
    }

    #[test]
    fn unknown_sections_ignored() {
        let s = GlobalSettings::parse_ini("[future]\nkey = value\n").unwrap();
        assert!(s.settings.is_empty());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let s = GlobalSettings::from_path(Path::new("/nonexistent/settings.ini")).unwrap();
        assert!(s.repositories.is_empty());
    }
}
