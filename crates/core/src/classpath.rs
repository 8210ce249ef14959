//! Classpath entries: owners of raw class-file bytes.

use crate::error::{CoreError, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;
use zip::ZipArchive;

/// Module descriptor at the root of an entry.
pub const MODULE_INFO: &str = "module-info.class";

/// A directory, an archive, or an in-memory set of classes.
///
/// Entries only hand out bytes keyed by their internal path
/// (`java/util/Map$Entry.class`); decoding happens elsewhere.
#[derive(Debug, Clone)]
pub enum ClasspathEntry {
    Directory(PathBuf),
    Archive(PathBuf),
    Memory {
        name: String,
        classes: Arc<BTreeMap<String, Arc<[u8]>>>,
    },
}

impl ClasspathEntry {
    /// Picks `Archive` for `.jar`/`.zip` files and `Directory` otherwise.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_archive = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"));
        if is_archive {
            ClasspathEntry::Archive(path)
        } else {
            ClasspathEntry::Directory(path)
        }
    }

    /// Builds an in-memory entry from `(internal class name, bytes)` pairs.
    pub fn memory<N: Into<String>>(
        name: impl Into<String>,
        classes: impl IntoIterator<Item = (N, Vec<u8>)>,
    ) -> Self {
        let classes = classes
            .into_iter()
            .map(|(n, bytes)| {
                let mut path: String = n.into();
                if !path.ends_with(".class") {
                    path.push_str(".class");
                }
                (path, Arc::from(bytes))
            })
            .collect();
        ClasspathEntry::Memory {
            name: name.into(),
            classes: Arc::new(classes),
        }
    }

    pub fn name(&self) -> String {
        match self {
            ClasspathEntry::Directory(p) | ClasspathEntry::Archive(p) => p.display().to_string(),
            ClasspathEntry::Memory { name, .. } => name.clone(),
        }
    }

    /// Internal paths of every `.class` file declaring a type, sorted. Module
    /// and package descriptors and `META-INF` content are skipped; see
    /// [`ClasspathEntry::module_descriptor`].
    pub fn class_paths(&self) -> Result<Vec<String>> {
        let mut paths = match self {
            ClasspathEntry::Directory(root) => directory_classes(root)?,
            ClasspathEntry::Archive(path) => {
                let archive = ZipArchive::new(File::open(path)?)?;
                archive
                    .file_names()
                    .filter(|n| is_class_path(n))
                    .map(str::to_string)
                    .collect()
            }
            ClasspathEntry::Memory { classes, .. } => classes
                .keys()
                .filter(|n| is_class_path(n))
                .cloned()
                .collect(),
        };
        paths.sort();
        Ok(paths)
    }

    /// Bytes of the root `module-info.class`, if the entry has one.
    pub fn module_descriptor(&self) -> Result<Option<Vec<u8>>> {
        match self.read(MODULE_INFO) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(CoreError::ClassNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn read(&self, class_path: &str) -> Result<Vec<u8>> {
        let not_found = || CoreError::ClassNotFound {
            class: class_path.to_string(),
            entry: self.name(),
        };
        match self {
            ClasspathEntry::Directory(root) => {
                let file = root.join(class_path);
                if !file.is_file() {
                    return Err(not_found());
                }
                Ok(std::fs::read(file)?)
            }
            ClasspathEntry::Archive(path) => {
                let mut archive = ZipArchive::new(File::open(path)?)?;
                let mut entry = match archive.by_name(class_path) {
                    Ok(e) => e,
                    Err(zip::result::ZipError::FileNotFound) => return Err(not_found()),
                    Err(e) => return Err(e.into()),
                };
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
            ClasspathEntry::Memory { classes, .. } => classes
                .get(class_path)
                .map(|b| b.to_vec())
                .ok_or_else(not_found),
        }
    }
}

fn is_class_path(name: &str) -> bool {
    name.ends_with(".class")
        && !name.starts_with("META-INF/")
        && !name.ends_with("module-info.class")
        && !name.ends_with("package-info.class")
}

fn directory_classes(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )
        .into());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if is_class_path(&rel) {
            out.push(rel);
        }
    }
    Ok(out)
}

/// `java/util/Map$Entry.class` to the binary name `java.util.Map$Entry`.
pub fn binary_name_of(class_path: &str) -> String {
    class_path
        .strip_suffix(".class")
        .unwrap_or(class_path)
        .replace('/', ".")
}

/// Inverse of [`binary_name_of`].
pub fn class_path_of(binary_name: &str) -> String {
    format!("{}.class", binary_name.replace('.', "/"))
}
