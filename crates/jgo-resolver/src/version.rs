//! Maven version parsing, comparison, and range matching.
//!
//! When both operands are strict lowercase SemVer without build metadata,
//! SemVer precedence applies. Otherwise the Maven Version Order rules do:
//! - tokens split on `.`, `-`, `_`, and digit/letter transitions;
//! - numeric tokens compare as numbers, and `-N` sorts below `.N`;
//! - known qualifiers order as
//!   `alpha < beta < milestone < rc = cr < snapshot < "" = final = ga = release < sp`;
//! - `a`/`b`/`m` alias the long qualifiers only when a digit follows directly;
//! - unknown qualifiers sort after `sp`, lexically;
//! - trailing null tokens (`0`, empty, `final`, `ga`, `release`) are trimmed,
//!   so `1`, `1.0`, and `1.ga` all compare equal.

use std::cmp::Ordering;
use std::fmt;

/// A parsed Maven version with comparable tokens.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    pub original: String,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct Token {
    sep: Sep,
    item: Item,
}

/// The separator preceding a token. Dot-joined numbers outrank
/// hyphen-joined ones at the same position.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Sep {
    Dot,
    Hyphen,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Item {
    Num(u64),
    Qualifier(QualifierRank),
    /// Unknown qualifier, stored lowercased; sorts after all known ones.
    Str(String),
}

/// Well-known Maven qualifiers with defined ordering.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum QualifierRank {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

impl MavenVersion {
    pub fn parse(version: &str) -> Self {
        Self {
            original: version.to_string(),
            tokens: tokenize(version),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.original.ends_with("-SNAPSHOT")
    }

    /// The base version without the `-SNAPSHOT` suffix.
    pub fn base_version(&self) -> &str {
        self.original
            .strip_suffix("-SNAPSHOT")
            .unwrap_or(&self.original)
    }
}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Some(a), Some(b)) = (strict_semver(&self.original), strict_semver(&other.original))
        {
            return a.cmp(&b);
        }

        let max_len = self.tokens.len().max(other.tokens.len());
        for i in 0..max_len {
            let ord = compare_tokens(self.tokens.get(i), other.tokens.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parse as strict SemVer: lowercase and free of build metadata.
fn strict_semver(s: &str) -> Option<semver::Version> {
    if s.contains('+') || s.chars().any(|c| c.is_ascii_uppercase()) {
        return None;
    }
    semver::Version::parse(s).ok()
}

fn compare_tokens(a: Option<&Token>, b: Option<&Token>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(t), None) => compare_item_to_empty(&t.item),
        (None, Some(t)) => compare_item_to_empty(&t.item).reverse(),
        (Some(a), Some(b)) => compare_two(a, b),
    }
}

/// How an item compares against padding (a missing token on the other side).
fn compare_item_to_empty(item: &Item) -> Ordering {
    match item {
        Item::Num(0) => Ordering::Equal,
        Item::Num(_) => Ordering::Greater,
        Item::Qualifier(q) => q.cmp(&QualifierRank::Release),
        // Unknown qualifiers sort after all known ones, including release.
        Item::Str(_) => Ordering::Greater,
    }
}

fn compare_two(a: &Token, b: &Token) -> Ordering {
    match (&a.item, &b.item) {
        (Item::Num(x), Item::Num(y)) => {
            // `1.1 > 1-1`: a dot-joined number outranks a hyphen-joined one
            // regardless of magnitude.
            match (a.sep, b.sep) {
                (Sep::Dot, Sep::Hyphen) => Ordering::Greater,
                (Sep::Hyphen, Sep::Dot) => Ordering::Less,
                _ => x.cmp(y),
            }
        }
        (Item::Num(_), _) => Ordering::Greater,
        (_, Item::Num(_)) => Ordering::Less,
        (Item::Qualifier(x), Item::Qualifier(y)) => x.cmp(y),
        (Item::Qualifier(_), Item::Str(_)) => Ordering::Less,
        (Item::Str(_), Item::Qualifier(_)) => Ordering::Greater,
        (Item::Str(x), Item::Str(y)) => x.cmp(y),
    }
}

fn tokenize(version: &str) -> Vec<Token> {
    let lower = version.to_ascii_lowercase();
    let mut tokens: Vec<Token> = Vec::new();
    let mut current = String::new();
    let mut sep = Sep::Dot;
    let mut prev_char: Option<char> = None;

    let mut flush = |current: &mut String, sep: Sep, followed_by_digit: bool| {
        tokens.push(Token {
            sep,
            item: classify(current, followed_by_digit),
        });
        current.clear();
    };

    for ch in lower.chars() {
        match ch {
            '.' => {
                flush(&mut current, sep, false);
                sep = Sep::Dot;
            }
            '-' | '_' => {
                flush(&mut current, sep, false);
                sep = Sep::Hyphen;
            }
            _ => {
                // A digit/letter transition splits tokens like an implicit hyphen.
                if let Some(prev) = prev_char {
                    if prev.is_ascii_digit() != ch.is_ascii_digit() && !current.is_empty() {
                        flush(&mut current, sep, ch.is_ascii_digit());
                        sep = Sep::Hyphen;
                    }
                }
                current.push(ch);
            }
        }
        prev_char = if ch == '.' || ch == '-' || ch == '_' {
            None
        } else {
            Some(ch)
        };
    }
    flush(&mut current, sep, false);

    // Trailing null tokens never affect ordering; drop them eagerly so that
    // `1`, `1.0`, and `1.ga` share a representation.
    while tokens.len() > 1 && tokens.last().is_some_and(|t| is_null(&t.item)) {
        tokens.pop();
    }

    tokens
}

fn is_null(item: &Item) -> bool {
    matches!(item, Item::Num(0) | Item::Qualifier(QualifierRank::Release))
}

fn classify(token: &str, followed_by_digit: bool) -> Item {
    if let Ok(n) = token.parse::<u64>() {
        return Item::Num(n);
    }
    // Single-letter shorthands only alias the long qualifiers when the next
    // character is a digit: `1-a1` == `1-alpha-1`, but `1-a` is the literal
    // qualifier "a".
    if followed_by_digit {
        match token {
            "a" => return Item::Qualifier(QualifierRank::Alpha),
            "b" => return Item::Qualifier(QualifierRank::Beta),
            "m" => return Item::Qualifier(QualifierRank::Milestone),
            _ => {}
        }
    }
    match token {
        "alpha" => Item::Qualifier(QualifierRank::Alpha),
        "beta" => Item::Qualifier(QualifierRank::Beta),
        "milestone" => Item::Qualifier(QualifierRank::Milestone),
        "rc" | "cr" => Item::Qualifier(QualifierRank::Rc),
        "snapshot" => Item::Qualifier(QualifierRank::Snapshot),
        "" | "ga" | "final" | "release" => Item::Qualifier(QualifierRank::Release),
        "sp" => Item::Qualifier(QualifierRank::Sp),
        other => Item::Str(other.to_string()),
    }
}

/// A Maven version range expression.
///
/// Supports: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]` (exact).
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub version: MavenVersion,
    pub inclusive: bool,
}

impl VersionRange {
    /// Parse a Maven version range string.
    ///
    /// Returns `None` for bare versions (not a range).
    pub fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim();
        if !s.starts_with('[') && !s.starts_with('(') {
            return None;
        }

        let open_inclusive = s.starts_with('[');
        let close_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        if let Some((lower, upper)) = inner.split_once(',') {
            let lower = lower.trim();
            let upper = upper.trim();
            Some(VersionRange {
                lower: if lower.is_empty() {
                    None
                } else {
                    Some(Bound {
                        version: MavenVersion::parse(lower),
                        inclusive: open_inclusive,
                    })
                },
                upper: if upper.is_empty() {
                    None
                } else {
                    Some(Bound {
                        version: MavenVersion::parse(upper),
                        inclusive: close_inclusive,
                    })
                },
            })
        } else {
            // Exact version: [1.0] means exactly 1.0
            let v = MavenVersion::parse(inner.trim());
            Some(VersionRange {
                lower: Some(Bound {
                    version: v.clone(),
                    inclusive: true,
                }),
                upper: Some(Bound {
                    version: v,
                    inclusive: true,
                }),
            })
        }
    }

    /// Check if a version satisfies this range.
    pub fn contains(&self, version: &MavenVersion) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = version.cmp(&lower.version);
            if lower.inclusive {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = version.cmp(&upper.version);
            if upper.inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }

    /// The highest of `candidates` that satisfies this range.
    pub fn select_highest(&self, candidates: &[String]) -> Option<String> {
        candidates
            .iter()
            .map(|s| MavenVersion::parse(s))
            .filter(|v| self.contains(v))
            .max()
            .map(|v| v.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lt(a: &str, b: &str) {
        assert!(
            MavenVersion::parse(a) < MavenVersion::parse(b),
            "expected {a} < {b}"
        );
    }

    fn eq(a: &str, b: &str) {
        assert_eq!(
            MavenVersion::parse(a),
            MavenVersion::parse(b),
            "expected {a} == {b}"
        );
    }

    #[test]
    fn basic_ordering() {
        lt("1.0", "2.0");
        lt("1.0.0", "1.0.1");
        lt("1.0.1", "1.1.0");
    }

    #[test]
    fn qualifier_ordering() {
        lt("1.0-alpha", "1.0-beta");
        lt("1.0-beta", "1.0-milestone");
        lt("1.0-milestone", "1.0-rc");
        lt("1.0-rc", "1.0-snapshot");
        lt("1.0-snapshot", "1.0");
        lt("1.0", "1.0-sp");
        eq("1.0-rc", "1.0-cr");
    }

    #[test]
    fn trailing_nulls_compare_equal() {
        eq("1", "1.0");
        eq("1", "1.0.0");
        eq("1", "1.ga");
        eq("1", "1-final");
        eq("1.0", "1.0-ga");
    }

    #[test]
    fn spec_boundary_cases() {
        lt("1-alpha", "1");
        lt("1.0-SNAPSHOT", "1.0");
        assert!(MavenVersion::parse("1-sp") > MavenVersion::parse("1"));
        eq("1-a1", "1-alpha-1");
    }

    #[test]
    fn comparison_is_case_insensitive() {
        eq("1.0-ALPHA", "1.0-alpha");
        eq("1.0-RC1", "1.0-rc1");
    }

    #[test]
    fn digit_letter_transitions_split() {
        eq("1.0rc1", "1.0-rc-1");
        lt("1.0a1", "1.0");
        lt("1.0a1", "1.0b1");
    }

    #[test]
    fn shorthand_requires_adjacent_digit() {
        // `1-a` is the unknown qualifier "a", which sorts above release.
        assert!(MavenVersion::parse("1-a") > MavenVersion::parse("1"));
        lt("1-a1", "1");
    }

    #[test]
    fn hyphen_number_below_dot_number() {
        lt("1-1", "1.1");
        lt("1-2", "1.1");
    }

    #[test]
    fn unknown_qualifiers_sort_after_sp_lexically() {
        assert!(MavenVersion::parse("1.0-jre") > MavenVersion::parse("1.0"));
        assert!(MavenVersion::parse("1.0-jre") > MavenVersion::parse("1.0-sp"));
        lt("1.0-android", "1.0-jre");
        lt("31.0-jre", "32.0-jre");
    }

    #[test]
    fn semver_fast_path() {
        lt("1.2.3", "1.2.10");
        lt("1.2.3-alpha.2", "1.2.3");
    }

    #[test]
    fn snapshot_detection() {
        let v = MavenVersion::parse("1.0-SNAPSHOT");
        assert!(v.is_snapshot());
        assert_eq!(v.base_version(), "1.0");
        assert!(!MavenVersion::parse("1.0.0").is_snapshot());
    }

    #[test]
    fn version_range_inclusive() {
        let range = VersionRange::parse("[1.0,2.0]").unwrap();
        assert!(range.contains(&MavenVersion::parse("1.0")));
        assert!(range.contains(&MavenVersion::parse("1.5")));
        assert!(range.contains(&MavenVersion::parse("2.0")));
        assert!(!range.contains(&MavenVersion::parse("0.9")));
        assert!(!range.contains(&MavenVersion::parse("2.1")));
    }

    #[test]
    fn version_range_exclusive_upper() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(range.contains(&MavenVersion::parse("1.9.9")));
        assert!(!range.contains(&MavenVersion::parse("2.0")));
    }

    #[test]
    fn version_range_open_lower() {
        let range = VersionRange::parse("(,2.0)").unwrap();
        assert!(range.contains(&MavenVersion::parse("1.0")));
        assert!(!range.contains(&MavenVersion::parse("2.0")));
    }

    #[test]
    fn version_range_exact() {
        let range = VersionRange::parse("[1.5]").unwrap();
        assert!(range.contains(&MavenVersion::parse("1.5")));
        assert!(!range.contains(&MavenVersion::parse("1.6")));
    }

    #[test]
    fn bare_version_not_a_range() {
        assert!(VersionRange::parse("1.0").is_none());
    }

    #[test]
    fn select_highest_in_range() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        let candidates = vec![
            "0.9".to_string(),
            "1.0".to_string(),
            "1.9".to_string(),
            "2.0".to_string(),
        ];
        assert_eq!(range.select_highest(&candidates).as_deref(), Some("1.9"));
    }
}
