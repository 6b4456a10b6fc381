//! Glyphs and ANSI colors of the report.

/// Status glyph of a passed example or test.
pub const CHAR_OK: char = '✓';
/// Status glyph of a failed example or test.
pub const CHAR_FAILED: char = '✗';
pub const CHAR_SKIP: char = '-';

/// Escape sequences for each report element; all empty when color is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub reset: &'static str,
    pub ok: &'static str,
    pub failed: &'static str,
    /// Inverse red, for the failure margin.
    pub failed_margin: &'static str,
    pub skip: &'static str,
    pub skip_margin: &'static str,
    pub doctest_header: &'static str,
    pub unittest_header: &'static str,
    pub result_ok: &'static str,
    pub result_failed: &'static str,
    pub coverage: &'static str,
}

impl Palette {
    pub const ANSI: Palette = Palette {
        reset: "\x1b[0m",
        ok: "\x1b[32m",
        failed: "\x1b[31m",
        failed_margin: "\x1b[31;7m",
        skip: "\x1b[35m",
        skip_margin: "\x1b[35;7m",
        doctest_header: "\x1b[36m",
        unittest_header: "\x1b[36m",
        result_ok: "\x1b[32;7m",
        result_failed: "\x1b[33;41m",
        coverage: "\x1b[7m",
    };

    pub const PLAIN: Palette = Palette {
        reset: "",
        ok: "",
        failed: "",
        failed_margin: "",
        skip: "",
        skip_margin: "",
        doctest_header: "",
        unittest_header: "",
        result_ok: "",
        result_failed: "",
        coverage: "",
    };

    pub fn new(color: bool) -> Self {
        if color { Self::ANSI } else { Self::PLAIN }
    }

    pub fn is_colored(&self) -> bool {
        !self.reset.is_empty()
    }

    /// Left margin of failure diagnostics: a space and an inverse-red cell.
    pub fn failure_prefix(&self) -> String {
        format!(" {} {}", self.failed_margin, self.reset)
    }

    /// Left margin of skip reasons.
    pub fn skip_prefix(&self) -> String {
        format!(" {} {} ", self.skip_margin, self.reset)
    }

    /// `text` in `color`, centered to `width` when colored, or set off by blank lines otherwise.
    pub fn banner(&self, color: &str, text: &str, width: usize) -> String {
        if self.is_colored() {
            format!("{color}{text:^width$}{}\n", self.reset)
        } else {
            format!("\n{text}\n\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_palette_has_no_escapes() {
        let palette = Palette::new(false);
        assert!(!palette.is_colored());
        assert_eq!(palette.failure_prefix(), "  ");
        assert_eq!(palette.banner(palette.result_ok, "Ran 1 tests", 20), "\nRan 1 tests\n\n");
    }

    #[test]
    fn test_colored_banner_is_centered() {
        let palette = Palette::new(true);
        let banner = palette.banner(palette.result_ok, "ok", 6);
        assert_eq!(banner, "\x1b[32;7m  ok  \x1b[0m\n");
    }
}
