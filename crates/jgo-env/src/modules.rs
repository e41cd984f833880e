//! JPMS classification: explicit modules (`module-info.class`), automatic
//! modules (`Automatic-Module-Name`), and plain class-path JARs.

use std::io::Read;
use std::path::Path;

use jgo_core::context::RunContext;
use jgo_core::coordinate::Placement;
use jgo_util::errors::JgoError;

/// How an artifact participates in the module system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Carries a root `module-info.class` naming the module.
    Explicit(String),
    /// Declares `Automatic-Module-Name` in its manifest.
    Automatic(String),
    NonModular,
}

impl Classification {
    pub fn is_modular(&self) -> bool {
        !matches!(self, Self::NonModular)
    }

    pub fn module_name(&self) -> Option<&str> {
        match self {
            Self::Explicit(name) | Self::Automatic(name) => Some(name),
            Self::NonModular => None,
        }
    }
}

/// Inspect a JAR and classify it.
pub fn classify_jar(path: &Path) -> miette::Result<Classification> {
    let file = std::fs::File::open(path).map_err(JgoError::Io)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| JgoError::Parse {
        message: format!("cannot open {} as a JAR: {e}", path.display()),
    })?;

    // Only a root-level module-info.class makes a JAR an explicit module;
    // multi-release overlays under META-INF/versions/ do not.
    if let Ok(mut entry) = archive.by_name("module-info.class") {
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(JgoError::Io)?;
        drop(entry);
        let name = module_name_from_class(&bytes).map_err(|message| JgoError::Parse {
            message: format!("bad module-info.class in {}: {message}", path.display()),
        })?;
        return Ok(Classification::Explicit(name));
    }

    if let Some(name) = manifest_attribute(&mut archive, "Automatic-Module-Name") {
        let name = name.trim().to_string();
        if !name.is_empty() {
            return Ok(Classification::Automatic(name));
        }
    }

    Ok(Classification::NonModular)
}

/// Decide final placement for one artifact.
///
/// Global `--class-path-only` / `--module-path-only` flags override
/// everything; a per-coordinate `(c)`/`(m)` modifier overrides detection.
pub fn decide_placement(
    classification: &Classification,
    coordinate_override: Option<Placement>,
    ctx: &RunContext,
) -> Placement {
    if ctx.class_path_only {
        return Placement::ClassPath;
    }
    if ctx.module_path_only {
        return Placement::ModulePath;
    }
    if let Some(forced) = coordinate_override {
        return forced;
    }
    if classification.is_modular() {
        Placement::ModulePath
    } else {
        Placement::ClassPath
    }
}

/// Return the value of `key` from the main section of the JAR manifest.
pub fn manifest_attribute<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    key: &str,
) -> Option<String> {
    let mut entry = archive.by_name("META-INF/MANIFEST.MF").ok()?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes).ok()?;
    let manifest = String::from_utf8_lossy(&bytes);
    manifest_main_attribute(&manifest, key)
}

/// Extract `key` from manifest text.
///
/// Manifest files are line-oriented and fold long values onto continuation
/// lines that start with a single space character.
pub fn manifest_main_attribute(manifest: &str, key: &str) -> Option<String> {
    let mut current_key: Option<&str> = None;
    let mut current_value = String::new();

    for line in manifest.lines() {
        let line = line.trim_end_matches('\r');

        // The first empty line terminates the main attributes section.
        if line.is_empty() {
            break;
        }

        if let Some(rest) = line.strip_prefix(' ') {
            if current_key.is_some() {
                current_value.push_str(rest);
            }
            continue;
        }

        if let Some(k) = current_key.take() {
            if k.trim().eq_ignore_ascii_case(key) {
                return Some(current_value.trim().to_string());
            }
        }
        current_value.clear();

        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        current_key = Some(k);
        current_value.push_str(v.trim_start());
    }

    if let Some(k) = current_key {
        if k.trim().eq_ignore_ascii_case(key) {
            return Some(current_value.trim().to_string());
        }
    }

    None
}

// -----------------------------------------------------------------------
// Minimal class-file walk: just enough to pull the module name out of the
// Module attribute's CONSTANT_Module_info entry.
// -----------------------------------------------------------------------

enum CpEntry {
    Utf8(String),
    Module { name_index: u16 },
    Other,
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u1(&mut self) -> Result<u8, String> {
        let b = *self.bytes.get(self.pos).ok_or("truncated class file")?;
        self.pos += 1;
        Ok(b)
    }

    fn u2(&mut self) -> Result<u16, String> {
        Ok(u16::from_be_bytes([self.u1()?, self.u1()?]))
    }

    fn u4(&mut self) -> Result<u32, String> {
        Ok(u32::from_be_bytes([
            self.u1()?,
            self.u1()?,
            self.u1()?,
            self.u1()?,
        ]))
    }

    fn skip(&mut self, n: usize) -> Result<(), String> {
        if self.pos + n > self.bytes.len() {
            return Err("truncated class file".to_string());
        }
        self.pos += n;
        Ok(())
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], String> {
        if self.pos + n > self.bytes.len() {
            return Err("truncated class file".to_string());
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

/// Parse a `module-info.class` and return the declared module name.
fn module_name_from_class(bytes: &[u8]) -> Result<String, String> {
    let mut r = ByteReader::new(bytes);
    if r.u4()? != 0xCAFE_BABE {
        return Err("bad magic".to_string());
    }
    let _minor = r.u2()?;
    let _major = r.u2()?;

    let cp_count = r.u2()? as usize;
    let mut pool: Vec<CpEntry> = Vec::with_capacity(cp_count);
    pool.push(CpEntry::Other); // constant pool is 1-indexed
    let mut i = 1;
    while i < cp_count {
        let tag = r.u1()?;
        let entry = match tag {
            1 => {
                let len = r.u2()? as usize;
                let text = String::from_utf8_lossy(r.bytes(len)?).to_string();
                CpEntry::Utf8(text)
            }
            7 | 8 | 16 | 20 => {
                r.skip(2)?;
                CpEntry::Other
            }
            19 => CpEntry::Module { name_index: r.u2()? },
            15 => {
                r.skip(3)?;
                CpEntry::Other
            }
            3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => {
                r.skip(4)?;
                CpEntry::Other
            }
            5 | 6 => {
                r.skip(8)?;
                pool.push(CpEntry::Other);
                i += 1;
                CpEntry::Other
            }
            other => return Err(format!("unknown constant pool tag {other}")),
        };
        pool.push(entry);
        i += 1;
    }

    let _access_flags = r.u2()?;
    let _this_class = r.u2()?;
    let _super_class = r.u2()?;

    let interfaces = r.u2()? as usize;
    r.skip(interfaces * 2)?;

    for _ in 0..r.u2()? {
        // fields
        r.skip(6)?;
        skip_attributes(&mut r)?;
    }
    for _ in 0..r.u2()? {
        // methods
        r.skip(6)?;
        skip_attributes(&mut r)?;
    }

    let attr_count = r.u2()? as usize;
    for _ in 0..attr_count {
        let name_index = r.u2()? as usize;
        let length = r.u4()? as usize;
        let is_module_attr =
            matches!(pool.get(name_index), Some(CpEntry::Utf8(name)) if name == "Module");
        if is_module_attr {
            let mut sub = ByteReader::new(r.bytes(length)?);
            let module_index = sub.u2()? as usize;
            let Some(CpEntry::Module { name_index }) = pool.get(module_index) else {
                return Err("Module attribute does not reference CONSTANT_Module_info".to_string());
            };
            let Some(CpEntry::Utf8(name)) = pool.get(*name_index as usize) else {
                return Err("module name index out of range".to_string());
            };
            return Ok(name.clone());
        }
        r.skip(length)?;
    }

    Err("missing Module attribute".to_string())
}

fn skip_attributes(r: &mut ByteReader<'_>) -> Result<(), String> {
    let count = r.u2()? as usize;
    for _ in 0..count {
        r.skip(2)?;
        let len = r.u4()? as usize;
        r.skip(len)?;
    }
    Ok(())
}
