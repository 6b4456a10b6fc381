//! Module identity resolution.
//!
//! A file is importable as `a.b.c` only when every directory between the scan root and the file
//! carries the package marker; the identity is then the relative directory segments plus the file
//! stem, joined with the module separator.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use runtest_core::conventions::MODULE_SEPARATOR;

use super::ScanUnit;

/// Dotted name under which a package module is loaded (`pkg.sub.module`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleIdentity(String);

impl ModuleIdentity {
    /// Build an identity from path segments (directories, then the file stem).
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<String> = segments.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self(parts.join(&MODULE_SEPARATOR.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix that block names of this module start with when its directory is stripped
    /// (`pkg.sub.` for `pkg.sub.module`); `None` for a top-level module.
    pub fn package_prefix(&self) -> Option<&str> {
        self.0.rfind(MODULE_SEPARATOR).map(|i| &self.0[..=i])
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a file has no module identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unresolved {
    #[error("directory {} has no package marker", .0.display())]
    MissingMarker(PathBuf),
    #[error("path segment {0:?} is not a valid module name")]
    InvalidSegment(String),
}

/// Maps scan units to module identities by walking their directories for the package marker.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    root: PathBuf,
    package_marker: String,
}

impl ModuleResolver {
    pub fn new(root: impl Into<PathBuf>, package_marker: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            package_marker: package_marker.into(),
        }
    }

    /// Check that every directory from the unit's own up to (not including) the root is a package.
    pub fn is_package_dir(&self, rel_dir: &Path) -> Result<(), Unresolved> {
        let mut head = rel_dir.to_path_buf();
        while !head.as_os_str().is_empty() {
            let dir = self.root.join(&head);
            if !dir.join(&self.package_marker).is_file() {
                return Err(Unresolved::MissingMarker(dir));
            }
            if !head.pop() {
                break;
            }
        }
        Ok(())
    }

    /// Dotted identity of a source file whose directories are all packages.
    pub fn resolve(&self, unit: &ScanUnit) -> Result<ModuleIdentity, Unresolved> {
        self.is_package_dir(&unit.rel_dir)?;
        let mut segments = Vec::new();
        for component in unit.rel_dir.components() {
            let Component::Normal(part) = component else {
                continue;
            };
            let part = part.to_string_lossy();
            if part.contains(MODULE_SEPARATOR) {
                return Err(Unresolved::InvalidSegment(part.into_owned()));
            }
            segments.push(part.into_owned());
        }
        segments.push(unit.stem().to_string());
        Ok(ModuleIdentity::from_segments(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn unit(root: &Path, rel: &str) -> ScanUnit {
        ScanUnit::new(root, &root.join(rel)).unwrap()
    }

    #[test]
    fn test_top_level_file_is_its_own_module() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ModuleResolver::new(dir.path(), "__init__.py");
        let identity = resolver.resolve(&unit(dir.path(), "tool.py")).unwrap();
        assert_eq!(identity.as_str(), "tool");
        assert_eq!(identity.package_prefix(), None);
    }

    #[test]
    fn test_nested_package_module() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg/sub")).unwrap();
        fs::write(dir.path().join("pkg/__init__.py"), "").unwrap();
        fs::write(dir.path().join("pkg/sub/__init__.py"), "").unwrap();
        let resolver = ModuleResolver::new(dir.path(), "__init__.py");
        let identity = resolver.resolve(&unit(dir.path(), "pkg/sub/mod.py")).unwrap();
        assert_eq!(identity.as_str(), "pkg.sub.mod");
        assert_eq!(identity.package_prefix(), Some("pkg.sub."));
    }

    #[test]
    fn test_removing_any_marker_breaks_resolution() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg/sub")).unwrap();
        fs::write(dir.path().join("pkg/sub/__init__.py"), "").unwrap();
        let resolver = ModuleResolver::new(dir.path(), "__init__.py");
        let err = resolver.resolve(&unit(dir.path(), "pkg/sub/mod.py")).unwrap_err();
        assert_eq!(err, Unresolved::MissingMarker(dir.path().join("pkg")));

        fs::write(dir.path().join("pkg/__init__.py"), "").unwrap();
        fs::remove_file(dir.path().join("pkg/sub/__init__.py")).unwrap();
        assert!(resolver.resolve(&unit(dir.path(), "pkg/sub/mod.py")).is_err());
    }

    #[test]
    fn test_dotted_directory_is_not_a_package() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("v1.2")).unwrap();
        fs::write(dir.path().join("v1.2/__init__.py"), "").unwrap();
        let resolver = ModuleResolver::new(dir.path(), "__init__.py");
        assert_eq!(
            resolver.resolve(&unit(dir.path(), "v1.2/mod.py")),
            Err(Unresolved::InvalidSegment("v1.2".to_string()))
        );
    }
}
