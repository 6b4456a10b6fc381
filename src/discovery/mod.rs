//! File discovery: scan units and their classification.
//!
//! ## Notes
//!
//! - Classification is a pure function of the scan root, the file's directory and its name (plus
//!   the presence of package markers on disk); calling it twice gives the same answer.
//! - A source file outside a package degrades to plain-text extraction instead of failing.

pub mod module;

use std::path::{Component, Path, PathBuf};

pub use module::{ModuleIdentity, ModuleResolver, Unresolved};

use crate::config::RunConfig;

/// A file under consideration during one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanUnit {
    /// Absolute directory holding the file
    pub dir: PathBuf,
    pub file_name: String,
    /// Extension without the dot; empty when the file has none
    pub extension: String,
    /// `dir` relative to the scan root (empty for files directly under it)
    pub rel_dir: PathBuf,
}

impl ScanUnit {
    /// Describe `path` relative to `root`; `None` when the file lies outside the root.
    pub fn new(root: &Path, path: &Path) -> Option<Self> {
        let dir = path.parent()?.to_path_buf();
        let rel_dir = dir.strip_prefix(root).ok()?.to_path_buf();
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(Self {
            dir,
            file_name,
            extension,
            rel_dir,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Path relative to the scan root, as shown in report headers.
    pub fn rel_path(&self) -> PathBuf {
        self.rel_dir.join(&self.file_name)
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        if self.extension.is_empty() {
            &self.file_name
        } else {
            &self.file_name[..self.file_name.len() - self.extension.len() - 1]
        }
    }
}

/// Extraction strategy for a scan unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Importable module: documentation examples and test-case classes.
    PackageModule(ModuleIdentity),
    /// Raw content scanned once for examples under a synthetic name.
    PlainText { name: String },
    Ignored,
}

/// Decides whether a file is tested and how.
#[derive(Debug, Clone)]
pub struct PathClassifier<'a> {
    config: &'a RunConfig,
    resolver: ModuleResolver,
}

impl<'a> PathClassifier<'a> {
    /// `root` must be the absolute scan root the units were built against.
    pub fn new(config: &'a RunConfig, root: &Path) -> Self {
        Self {
            config,
            resolver: ModuleResolver::new(root, config.package_marker.clone()),
        }
    }

    pub fn is_ignored(&self, unit: &ScanUnit) -> bool {
        self.config.is_ignored_file(&unit.file_name)
            || unit.rel_dir.components().any(|c| match c {
                Component::Normal(name) => self.config.is_ignored_dir(&name.to_string_lossy()),
                _ => false,
            })
    }

    #[tracing::instrument(skip_all, fields(file = %unit.rel_path().display()))]
    pub fn classify(&self, unit: &ScanUnit) -> Classification {
        if self.is_ignored(unit) {
            return Classification::Ignored;
        }
        let path = unit.path();
        if self.config.is_source_file(&path) {
            match self.resolver.resolve(unit) {
                Ok(identity) => return Classification::PackageModule(identity),
                Err(reason) => {
                    tracing::debug!(%reason, "not a package module; scanning as plain text");
                }
            }
        } else if !self.config.is_text_file(&path) {
            return Classification::Ignored;
        }
        Classification::PlainText {
            name: unit.stem().to_string(),
        }
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;

    fn classify(root: &Path, rel: &str) -> Classification {
        let config = RunConfig::default();
        let classifier = PathClassifier::new(&config, root);
        classifier.classify(&ScanUnit::new(root, &root.join(rel)).unwrap())
    }

    #[test]
    fn test_scan_unit_parts() {
        let unit = ScanUnit::new(Path::new("/work"), Path::new("/work/pkg/mod.py")).unwrap();
        assert_eq!(unit.dir, PathBuf::from("/work/pkg"));
        assert_eq!(unit.rel_dir, PathBuf::from("pkg"));
        assert_eq!(unit.extension, "py");
        assert_eq!(unit.stem(), "mod");
        assert_eq!(unit.rel_path(), PathBuf::from("pkg/mod.py"));
        assert!(ScanUnit::new(Path::new("/work"), Path::new("/elsewhere/x.py")).is_none());
    }

    #[test]
    fn test_classification_kinds() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::create_dir_all(dir.path().join("loose")).unwrap();
        fs::write(dir.path().join("pkg/__init__.py"), "").unwrap();

        assert_eq!(
            classify(dir.path(), "top.py"),
            Classification::PackageModule(ModuleIdentity::from_segments(["top"]))
        );
        assert_eq!(
            classify(dir.path(), "pkg/mod.py"),
            Classification::PackageModule(ModuleIdentity::from_segments(["pkg", "mod"]))
        );
        assert_eq!(
            classify(dir.path(), "loose/mod.py"),
            Classification::PlainText { name: "mod".to_string() }
        );
        assert_eq!(
            classify(dir.path(), "loose/notes.txt"),
            Classification::PlainText { name: "notes".to_string() }
        );
        assert_eq!(
            classify(dir.path(), "README"),
            Classification::PlainText { name: "README".to_string() }
        );
        assert_eq!(classify(dir.path(), "image.png"), Classification::Ignored);
        assert_eq!(classify(dir.path(), ".gitignore"), Classification::Ignored);
        assert_eq!(classify(dir.path(), "__pycache__/mod.py"), Classification::Ignored);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c.py")), PathBuf::from("/a/c.py"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    proptest! {
        #[test]
        fn test_classification_is_pure(name in "[a-z]{1,8}", ext in prop::sample::select(vec!["py", "txt", "md", "rs", ""])) {
            let dir = tempfile::tempdir().unwrap();
            let file = if ext.is_empty() { name.clone() } else { format!("{name}.{ext}") };
            let first = classify(dir.path(), &file);
            let second = classify(dir.path(), &file);
            prop_assert_eq!(first, second);
        }
    }
}
