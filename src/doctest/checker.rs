//! Output comparison for documentation examples.

use runtest_core::conventions::BLANKLINE_MARKER;

use crate::config::OptionFlags;

const ELLIPSIS_MARKER: &str = "...";

/// Compares an example's expected output with what it produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputChecker;

impl OutputChecker {
    /// Whether `got` satisfies `want` under `flags`.
    ///
    /// ## Examples
    /// ```rust
    /// use runtest::config::OptionFlags;
    /// use runtest::doctest::OutputChecker;
    ///
    /// let checker = OutputChecker;
    /// assert!(checker.check("[1, ..., 9]\n", "[1, 2, 3, 4, 5, 6, 7, 8, 9]\n", OptionFlags::ELLIPSIS));
    /// assert!(!checker.check("7\n", "8\n", OptionFlags::empty()));
    /// ```
    pub fn check(&self, want: &str, got: &str, flags: OptionFlags) -> bool {
        if want == got {
            return true;
        }

        let (want, got) = if flags.contains(OptionFlags::DONT_ACCEPT_BLANKLINE) {
            (want.to_string(), got.to_string())
        } else {
            let want = map_lines(want, |line| {
                let is_marker = line
                    .strip_prefix(BLANKLINE_MARKER)
                    .is_some_and(|rest| rest.trim().is_empty());
                if is_marker { "" } else { line }
            });
            let got = map_lines(got, |line| if line.trim().is_empty() { "" } else { line });
            if want == got {
                return true;
            }
            (want, got)
        };

        let (want, got) = if flags.contains(OptionFlags::NORMALIZE_WHITESPACE) {
            let (want, got) = (collapse_whitespace(&want), collapse_whitespace(&got));
            if want == got {
                return true;
            }
            (want, got)
        } else {
            (want, got)
        };

        flags.contains(OptionFlags::ELLIPSIS) && ellipsis_match(&want, &got)
    }

    /// Whether a raised exception (`Type: message`) matches the expected one.
    pub fn check_exception(&self, want: &str, got: &str, flags: OptionFlags) -> bool {
        if self.check(want, got, flags) {
            return true;
        }
        flags.contains(OptionFlags::IGNORE_EXCEPTION_DETAIL)
            && self.check(exception_type(want), exception_type(got), flags)
    }
}

/// Rewrite each line of `text`, keeping line endings.
fn map_lines(text: &str, f: impl Fn(&str) -> &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        out.push_str(f(body));
        out.push_str(newline);
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Match `got` against `want` where each `...` in `want` stands for any substring.
fn ellipsis_match(want: &str, got: &str) -> bool {
    if !want.contains(ELLIPSIS_MARKER) {
        return want == got;
    }
    let pieces: Vec<&str> = want.split(ELLIPSIS_MARKER).collect();
    let (first, last) = (pieces[0], pieces[pieces.len() - 1]);

    let mut start = 0;
    let mut end = got.len();
    if !first.is_empty() {
        if !got.starts_with(first) {
            return false;
        }
        start = first.len();
    }
    if !last.is_empty() {
        if !got.ends_with(last) {
            return false;
        }
        end -= last.len();
    }
    if start > end {
        return false;
    }
    for piece in &pieces[1..pieces.len() - 1] {
        match got[start..end].find(piece) {
            Some(at) => start += at + piece.len(),
            None => return false,
        }
    }
    true
}

/// Bare exception type name of a `pkg.mod.Type: message` line.
fn exception_type(msg: &str) -> &str {
    let first = msg.split('\n').next().unwrap_or("");
    let head = first.split(':').next().unwrap_or(first);
    match head.rfind('.') {
        Some(dot) => &head[dot + 1..],
        None => head,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(want: &str, got: &str, flags: OptionFlags) -> bool {
        OutputChecker.check(want, got, flags)
    }

    #[test]
    fn test_exact_match() {
        assert!(check("7\n", "7\n", OptionFlags::empty()));
        assert!(!check("7\n", "8\n", OptionFlags::empty()));
        assert!(check("", "", OptionFlags::empty()));
    }

    #[test]
    fn test_blankline_marker() {
        assert!(check("a\n<BLANKLINE>\nb\n", "a\n\nb\n", OptionFlags::empty()));
        assert!(check("a\n<BLANKLINE>\n", "a\n   \n", OptionFlags::empty()));
        assert!(!check("a\n<BLANKLINE>\nb\n", "a\n\nb\n", OptionFlags::DONT_ACCEPT_BLANKLINE));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert!(!check("1 2\n", "1    2\n", OptionFlags::empty()));
        assert!(check("1 2\n", "1    2\n", OptionFlags::NORMALIZE_WHITESPACE));
        assert!(check("[1,\n 2]\n", "[1, 2]\n", OptionFlags::NORMALIZE_WHITESPACE));
    }

    #[test]
    fn test_ellipsis() {
        let flags = OptionFlags::ELLIPSIS;
        assert!(check("<object at ...>\n", "<object at 0x1234>\n", flags));
        assert!(check("...\n", "anything\n", flags));
        assert!(check("a...b...c\n", "a-b-c\n", flags));
        assert!(!check("a...b...c\n", "a-c-b\n", flags));
        assert!(!check("aa...aa\n", "aaa\n", flags));
        assert!(!check("<object at ...>\n", "<object at 0x1234>\n", OptionFlags::empty()));
    }

    #[test]
    fn test_ellipsis_runs_on_collapsed_whitespace() {
        let flags = OptionFlags::NORMALIZE_WHITESPACE | OptionFlags::ELLIPSIS;
        assert!(check("[0, 1, ...,\n 19]\n", "[0, 1, 2, 3, 19]\n", flags));
        assert!(!check("[0, 1, ...,\n 19]\n", "[0, 1, 2, 3, 19]\n", OptionFlags::ELLIPSIS));
        assert!(!check("[0, ...,\n 9]\n", "[1, 2, 9]\n", flags));
    }

    #[test]
    fn test_exception_detail() {
        let want = "ValueError: bad thing\n";
        let got = "ValueError: other thing\n";
        assert!(!OutputChecker.check_exception(want, got, OptionFlags::empty()));
        assert!(OutputChecker.check_exception(want, got, OptionFlags::IGNORE_EXCEPTION_DETAIL));
        assert!(OutputChecker.check_exception(
            "mod.CustomError: x\n",
            "other.CustomError: y\n",
            OptionFlags::IGNORE_EXCEPTION_DETAIL
        ));
        assert!(!OutputChecker.check_exception(
            "KeyError: 'a'\n",
            "ValueError: 'a'\n",
            OptionFlags::IGNORE_EXCEPTION_DETAIL
        ));
    }
}
