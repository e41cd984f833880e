//! Stable cache keys for ad-hoc environments.
//!
//! The key is the SHA-256 of a canonicalized request string, truncated to
//! 128 bits. Requests that differ only in flag spelling or declaration
//! order hash identically.

/// Everything that distinguishes one ad-hoc environment from another.
#[derive(Debug, Clone, Default)]
pub struct CacheKeyInputs {
    pub coordinates: Vec<String>,
    pub optional_depth: usize,
    pub managed: bool,
    pub exclusions: Vec<String>,
    pub add_classpath: Vec<String>,
}

/// Compute the 32-hex-character (128-bit) cache key.
pub fn cache_key(inputs: &CacheKeyInputs) -> String {
    jgo_util::hash::sha256_hex_prefix(&canonical_string(inputs), 32)
}

/// The canonical request string fed into the hash.
fn canonical_string(inputs: &CacheKeyInputs) -> String {
    let mut coordinates = inputs.coordinates.clone();
    coordinates.sort();
    let mut exclusions = inputs.exclusions.clone();
    exclusions.sort();
    let mut add_classpath = inputs.add_classpath.clone();
    add_classpath.sort();

    format!(
        "{}|optional_depth={}|managed={}|exclusions={}|add_classpath={}",
        coordinates.join("+"),
        inputs.optional_depth,
        inputs.managed,
        exclusions.join(","),
        add_classpath.join(","),
    )
}
