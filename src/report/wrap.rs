//! Width-aware wrapping and truncation of report text.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Columns reserved at the right edge of wrapped diagnostics.
const RIGHT_MARGIN: usize = 3;
/// Extra indentation of continuation lines.
const HANGING_INDENT: &str = "        ";
const MIN_WIDTH: usize = 20;

/// Wrap one line of diagnostic text to `width - 3` columns.
///
/// The first line starts with `indent` plus the text's own leading whitespace; continuation lines
/// get `indent` and an 8-space hanging indent.
pub fn wrap_line(text: &str, width: usize, indent: &str) -> Vec<String> {
    let body = text.trim_end();
    let content = body.trim_start();
    if content.is_empty() {
        return vec![indent.trim_end().to_string()];
    }
    let leading = &body[..body.len() - content.len()];
    let initial = format!("{indent}{leading}");
    let subsequent = format!("{indent}{HANGING_INDENT}");
    let width = width.saturating_sub(RIGHT_MARGIN).max(MIN_WIDTH);
    let options = textwrap::Options::new(width)
        .initial_indent(&initial)
        .subsequent_indent(&subsequent);
    textwrap::wrap(content, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

/// Wrap every line of a multi-line `text`.
pub fn wrap_text(text: &str, width: usize, indent: &str) -> Vec<String> {
    text.trim_end_matches('\n')
        .split('\n')
        .flat_map(|line| wrap_line(line, width, indent))
        .collect()
}

/// Cut `text` to `max` display columns, ending in `...` when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let budget = max.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_line_is_kept() {
        assert_eq!(wrap_line("Expected:", 80, "  "), vec!["  Expected:"]);
    }

    #[test]
    fn test_leading_whitespace_is_kept() {
        assert_eq!(wrap_line("  File \"m.py\", line 3", 80, " "), vec!["   File \"m.py\", line 3"]);
    }

    #[test]
    fn test_long_line_gets_hanging_indent() {
        let text = "word ".repeat(12);
        let lines = wrap_line(&text, 30, " ");
        assert!(lines.len() > 1);
        assert!(lines[0].starts_with(" word"));
        assert!(lines[1].starts_with("         word"));
        assert!(lines.iter().all(|l| l.width() <= 27));
    }

    #[test]
    fn test_blank_line_keeps_margin() {
        assert_eq!(wrap_line("   ", 80, "  "), vec![""]);
        assert_eq!(wrap_text("a\n\nb\n", 80, " "), vec![" a", "", " b"]);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("✓✓✓✓✓✓", 5), "✓✓...");
    }
}
