//! Main-class inference: complete an `@suffix`, or fall back to the primary
//! artifact's manifest `Main-Class`.

use std::path::{Path, PathBuf};

use jgo_util::errors::JgoError;

use crate::modules;

/// Resolve a requested main class against the materialized JARs.
///
/// A name containing a dot is taken verbatim. A bare suffix is completed by
/// scanning class entries of `jars` in resolution order; the first class
/// whose simple name equals the suffix wins.
pub fn resolve_main_class(request: &str, jars: &[PathBuf]) -> miette::Result<String> {
    if request.contains('.') {
        return Ok(request.to_string());
    }

    for jar in jars {
        if let Some(found) = scan_for_simple_name(jar, request)? {
            return Ok(found);
        }
    }

    Err(JgoError::NotFound {
        what: format!("class named '{request}' in any resolved JAR"),
    }
    .into())
}

/// The `Main-Class` manifest attribute of a JAR, if declared.
pub fn manifest_main_class(jar: &Path) -> miette::Result<Option<String>> {
    let file = std::fs::File::open(jar).map_err(JgoError::Io)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| JgoError::Parse {
        message: format!("cannot open {} as a JAR: {e}", jar.display()),
    })?;
    Ok(modules::manifest_attribute(&mut archive, "Main-Class"))
}

/// Find the first class entry whose simple name equals `suffix`.
fn scan_for_simple_name(jar: &Path, suffix: &str) -> miette::Result<Option<String>> {
    let file = std::fs::File::open(jar).map_err(JgoError::Io)?;
    let archive = zip::ZipArchive::new(file).map_err(|e| JgoError::Parse {
        message: format!("cannot open {} as a JAR: {e}", jar.display()),
    })?;

    let target = format!("{suffix}.class");
    for name in archive.file_names() {
        if !name.ends_with(".class") || name.starts_with("META-INF/") {
            continue;
        }
        let simple = name.rsplit('/').next().unwrap_or(name);
        if simple == target {
            let fqcn = name.trim_end_matches(".class").replace('/', ".");
            return Ok(Some(fqcn));
        }
    }

    Ok(None)
}
