//! Run configuration.
//!
//! A [`RunConfig`] carries everything a scan needs to know: where to look, what to skip, how to
//! compare example output and how to render the report. The CLI builds one from its flags; library
//! callers start from [`RunConfig::new`] and adjust it with the `with_*` methods.

use std::path::{Path, PathBuf};

use runtest_core::conventions;

bitflags::bitflags! {
    /// Output comparison modes for documentation examples.
    ///
    /// Bit values match the option constants exposed to examples through the `doctest` module.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OptionFlags: u32 {
        /// `<BLANKLINE>` is taken literally instead of standing for an empty line.
        const DONT_ACCEPT_BLANKLINE = 2;
        /// Runs of whitespace compare equal to a single space.
        const NORMALIZE_WHITESPACE = 4;
        /// `...` in expected output matches any substring.
        const ELLIPSIS = 8;
        /// The example is not run at all.
        const SKIP = 16;
        /// Only the exception type is compared for expected exceptions.
        const IGNORE_EXCEPTION_DETAIL = 32;
    }
}

impl OptionFlags {
    /// Look up a flag by its `NAME` as written in directives and on the command line.
    pub fn parse_name(name: &str) -> Option<Self> {
        Self::from_name(name.trim())
    }
}

/// When ANSI colors are written to the report stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Only when the report goes to an interactive terminal
    #[default]
    Auto,
    Always,
    Never,
}

/// Coverage measurement settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageOptions {
    pub enabled: bool,
    /// Also write the coverage table to this file.
    pub text_file: Option<PathBuf>,
}

/// Everything a scan needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Working directory and scan root
    pub root: PathBuf,
    /// Explicit files relative to `root`; empty means scan the whole tree
    pub files: Vec<PathBuf>,
    pub ignore_dirs: Vec<String>,
    pub ignore_files: Vec<String>,
    /// Extensions (without the dot) always scanned as plain text; `""` matches no extension
    pub text_extensions: Vec<String>,
    /// Extension (without the dot) of importable source files
    pub source_extension: String,
    pub package_marker: String,
    /// Comparison modes applied to every example
    pub option_flags: OptionFlags,
    pub color: ColorChoice,
    /// Terminal width override
    pub width: Option<usize>,
    pub coverage: CoverageOptions,
    /// Stop after the first recorded failure
    pub fail_fast: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            files: Vec::new(),
            ignore_dirs: conventions::IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            ignore_files: conventions::IGNORE_FILES.iter().map(|s| s.to_string()).collect(),
            text_extensions: conventions::TEXT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            source_extension: conventions::SOURCE_EXTENSION.to_string(),
            package_marker: conventions::PACKAGE_MARKER.to_string(),
            option_flags: OptionFlags::empty(),
            color: ColorChoice::Auto,
            width: None,
            coverage: CoverageOptions::default(),
            fail_fast: false,
        }
    }
}

impl RunConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Restrict the run to these files (relative to the root)
    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    pub fn with_option_flags(mut self, flags: OptionFlags) -> Self {
        self.option_flags = flags;
        self
    }

    pub fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    pub fn with_width(mut self, width: Option<usize>) -> Self {
        self.width = width;
        self
    }

    pub fn with_coverage(mut self, coverage: CoverageOptions) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == name)
    }

    pub fn is_ignored_file(&self, name: &str) -> bool {
        self.ignore_files.iter().any(|f| f == name)
    }

    /// Whether `path` has one of the plain-text extensions.
    pub fn is_text_file(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.text_extensions.iter().any(|t| t == ext)
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.source_extension.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_conventions() {
        let config = RunConfig::default();
        assert_eq!(config.package_marker, "__init__.py");
        assert_eq!(config.source_extension, "py");
        assert!(config.is_ignored_dir(".git"));
        assert!(config.is_ignored_file(".gitignore"));
        assert!(config.option_flags.is_empty());
        assert_eq!(config.color, ColorChoice::Auto);
    }

    #[test]
    fn test_text_and_source_extensions() {
        let config = RunConfig::default();
        assert!(config.is_text_file(Path::new("README.md")));
        assert!(config.is_text_file(Path::new("LICENSE")));
        assert!(!config.is_text_file(Path::new("mod.py")));
        assert!(config.is_source_file(Path::new("pkg/mod.py")));
    }

    #[test]
    fn test_builder_methods() {
        let config = RunConfig::new()
            .with_root("/tmp/project")
            .with_width(Some(100))
            .with_fail_fast(true)
            .with_option_flags(OptionFlags::ELLIPSIS | OptionFlags::NORMALIZE_WHITESPACE);
        assert_eq!(config.root, PathBuf::from("/tmp/project"));
        assert_eq!(config.width, Some(100));
        assert!(config.fail_fast);
        assert!(config.option_flags.contains(OptionFlags::ELLIPSIS));
    }

    #[test]
    fn test_option_flag_names() {
        assert_eq!(OptionFlags::parse_name("ELLIPSIS"), Some(OptionFlags::ELLIPSIS));
        assert_eq!(
            OptionFlags::parse_name("IGNORE_EXCEPTION_DETAIL"),
            Some(OptionFlags::IGNORE_EXCEPTION_DETAIL)
        );
        assert_eq!(OptionFlags::parse_name("BOGUS"), None);
    }
}
