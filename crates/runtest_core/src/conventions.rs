//! Well-known names and spellings shared by discovery, extraction and the runtime.

/// Extension (without the dot) of importable source files.
pub const SOURCE_EXTENSION: &str = "py";

/// File whose presence marks a directory as an importable package.
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Extensions (without the dot) of files scanned as plain-text documents.
///
/// The empty string matches files with no extension at all.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "html", "htm", ""];

/// Directory names skipped during a tree scan.
pub const IGNORE_DIRS: &[&str] = &[".git", ".svn", "CVS", "__pycache__", ".DS_Store"];

/// File names skipped during a tree scan.
pub const IGNORE_FILES: &[&str] = &[".gitignore", ".DS_Store"];

/// Separator between the segments of a module identity (`pkg.sub.module`).
pub const MODULE_SEPARATOR: char = '.';

/// Primary prompt that opens an interactive example.
pub const PROMPT: &str = ">>>";

/// Continuation prompt for the follow-on lines of an example.
pub const CONTINUATION: &str = "...";

/// Placeholder written in expected output to stand for an empty line.
pub const BLANKLINE_MARKER: &str = "<BLANKLINE>";

/// Marker that introduces inline option directives on an example's source line.
pub const DIRECTIVE_MARKER: &str = "doctest:";

/// First line of expected output that announces an expected exception.
pub const TRACEBACK_HEADER: &str = "Traceback (most recent call last):";

/// Prefix a method name must carry to be collected as a test.
pub const TEST_METHOD_PREFIX: &str = "test";

/// Module that provides the test-case base class.
pub const UNITTEST_MODULE: &str = "unittest";

/// Name of the test-case base class inside [`UNITTEST_MODULE`].
pub const TEST_CASE_CLASS: &str = "TestCase";

/// Fixture hooks run around each test method.
pub const SET_UP: &str = "setUp";
pub const TEAR_DOWN: &str = "tearDown";

/// Fixture hooks run once per test-case class.
pub const SET_UP_CLASS: &str = "setUpClass";
pub const TEAR_DOWN_CLASS: &str = "tearDownClass";

/// Module attribute holding the module's identity.
pub const MODULE_NAME_ATTR: &str = "__name__";

/// Module attribute holding the module's source path.
pub const MODULE_FILE_ATTR: &str = "__file__";

/// Attribute holding a docstring.
pub const DOC_ATTR: &str = "__doc__";

/// Recognize a directory name that a tree scan must not descend into.
pub fn is_ignored_dir(name: &str) -> bool {
    IGNORE_DIRS.contains(&name)
}

/// Recognize a file name that a tree scan must skip.
pub fn is_ignored_file(name: &str) -> bool {
    IGNORE_FILES.contains(&name)
}

/// Recognize a test method name.
///
/// ## Examples
/// ```rust
/// use runtest_core::conventions::is_test_method_name;
///
/// assert!(is_test_method_name("test_addition"));
/// assert!(is_test_method_name("testAddition"));
/// assert!(!is_test_method_name("helper"));
/// ```
pub fn is_test_method_name(name: &str) -> bool {
    name.starts_with(TEST_METHOD_PREFIX)
}

/// Check whether `line` opens an example: optional indentation, the prompt, then a space or end of line.
///
/// ## Returns
/// - `Some(indent)` with the column of the prompt when the line is a prompt line.
pub fn prompt_indent(line: &str) -> Option<usize> {
    let trimmed = line.trim_start_matches(' ');
    let rest = trimmed.strip_prefix(PROMPT)?;
    if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\n') {
        Some(line.len() - trimmed.len())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_indent() {
        assert_eq!(prompt_indent(">>> x = 1"), Some(0));
        assert_eq!(prompt_indent("    >>> x"), Some(4));
        assert_eq!(prompt_indent("  >>>"), Some(2));
        assert_eq!(prompt_indent(">>>x"), None);
        assert_eq!(prompt_indent("text >>> x"), None);
    }

    #[test]
    fn test_ignore_sets() {
        assert!(is_ignored_dir("__pycache__"));
        assert!(!is_ignored_dir("src"));
        assert!(is_ignored_file(".gitignore"));
    }
}
