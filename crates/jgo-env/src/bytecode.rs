//! Bytecode scanning: read `.class` major versions to infer the minimum
//! Java release an artifact needs.

use std::io::Read;
use std::path::Path;

use jgo_util::errors::JgoError;

/// Supported LTS releases, ascending.
const LTS_RELEASES: [u32; 4] = [8, 11, 17, 21];

/// Class-file major version of Java 1.0; majors count up from here.
const MAJOR_BASE: u32 = 44;

/// Map a class-file major version to its Java feature release
/// (52 is Java 8, 61 is Java 17).
pub fn major_to_java(major: u16) -> u32 {
    (major as u32).saturating_sub(MAJOR_BASE)
}

/// Round a Java release up to the nearest supported LTS.
///
/// Releases newer than the last LTS are kept as-is so the JVM locator still
/// demands a runtime that can actually load the classes.
pub fn round_up_to_lts(java: u32) -> u32 {
    for lts in LTS_RELEASES {
        if java <= lts {
            return lts;
        }
    }
    java
}

/// Scan every `.class` entry of a JAR and return the highest major version.
///
/// Multi-release overlays under `META-INF/versions/` are opt-in at runtime
/// and excluded from the minimum-version computation. Returns `None` for
/// JARs without class files (resource-only artifacts).
pub fn scan_jar(path: &Path) -> miette::Result<Option<u16>> {
    let file = std::fs::File::open(path).map_err(JgoError::Io)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| JgoError::Parse {
        message: format!("cannot open {} as a JAR: {e}", path.display()),
    })?;

    let mut max_major: Option<u16> = None;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| JgoError::Parse {
            message: format!("bad entry in {}: {e}", path.display()),
        })?;
        let name = entry.name().to_string();
        if !name.ends_with(".class") || name.starts_with("META-INF/versions/") {
            continue;
        }

        // Only the 8-byte header is needed: magic, minor, major.
        let mut header = [0u8; 8];
        if entry.read_exact(&mut header).is_err() {
            continue;
        }
        if header[..4] != [0xCA, 0xFE, 0xBA, 0xBE] {
            continue;
        }
        let major = u16::from_be_bytes([header[6], header[7]]);
        max_major = Some(max_major.map_or(major, |m| m.max(major)));
    }

    Ok(max_major)
}

/// Minimum LTS Java release required to load a JAR's classes.
pub fn min_java_for_jar(path: &Path) -> miette::Result<Option<u32>> {
    Ok(scan_jar(path)?.map(|major| round_up_to_lts(major_to_java(major))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn class_with_major(major: u16) -> Vec<u8> {
        let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00];
        bytes.extend_from_slice(&major.to_be_bytes());
        bytes.extend_from_slice(b"rest of the class file");
        bytes
    }

    fn jar_with(entries: &[(&str, Vec<u8>)]) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut writer = zip::ZipWriter::new(tmp.reopen().unwrap());
        let options = zip::write::SimpleFileOptions::default();
        for (name, bytes) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
        tmp
    }

    #[test]
    fn major_version_mapping() {
        assert_eq!(major_to_java(52), 8);
        assert_eq!(major_to_java(55), 11);
        assert_eq!(major_to_java(61), 17);
        assert_eq!(major_to_java(65), 21);
    }

    #[test]
    fn lts_rounding() {
        assert_eq!(round_up_to_lts(8), 8);
        assert_eq!(round_up_to_lts(9), 11);
        assert_eq!(round_up_to_lts(12), 17);
        assert_eq!(round_up_to_lts(17), 17);
        assert_eq!(round_up_to_lts(18), 21);
        assert_eq!(round_up_to_lts(22), 22);
    }

    #[test]
    fn scan_takes_the_maximum() {
        let jar = jar_with(&[
            ("com/a/Old.class", class_with_major(52)),
            ("com/a/New.class", class_with_major(61)),
            ("README.txt", b"not a class".to_vec()),
        ]);
        assert_eq!(scan_jar(jar.path()).unwrap(), Some(61));
        assert_eq!(min_java_for_jar(jar.path()).unwrap(), Some(17));
    }

    #[test]
    fn multi_release_overlays_are_ignored() {
        let jar = jar_with(&[
            ("com/a/Main.class", class_with_major(52)),
            ("META-INF/versions/11/com/a/Main.class", class_with_major(55)),
        ]);
        assert_eq!(min_java_for_jar(jar.path()).unwrap(), Some(8));
    }

    #[test]
    fn resource_only_jar_has_no_requirement() {
        let jar = jar_with(&[("data.properties", b"k=v".to_vec())]);
        assert_eq!(min_java_for_jar(jar.path()).unwrap(), None);
    }
}
