//! Terminal detection: size and interactivity of the report stream.

use std::io::IsTerminal;

use crate::config::ColorChoice;

pub const DEFAULT_WIDTH: usize = 80;
pub const DEFAULT_HEIGHT: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub width: usize,
    pub height: usize,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

pub fn stdout_is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Whether the report is colored.
pub fn use_color(choice: ColorChoice, interactive: bool) -> bool {
    match choice {
        ColorChoice::Auto => interactive,
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}

/// Size of the terminal the report goes to.
///
/// Order: explicit width, the terminal itself when `interactive`, `COLUMNS`/`LINES`, 80x25.
pub fn detect(width_override: Option<usize>, interactive: bool) -> TerminalSize {
    let mut size = from_env(std::env::var("COLUMNS").ok(), std::env::var("LINES").ok());
    if interactive {
        match crossterm::terminal::size() {
            Ok((cols, rows)) if cols > 0 && rows > 0 => {
                size = TerminalSize {
                    width: usize::from(cols),
                    height: usize::from(rows),
                };
            }
            Ok(_) => {}
            Err(err) => tracing::debug!(error = %err, "cannot query terminal size"),
        }
    }
    if let Some(width) = width_override.filter(|w| *w > 0) {
        size.width = width;
    }
    size
}

/// Size from `COLUMNS`/`LINES` values, falling back to 80x25 for each one missing or invalid.
pub fn from_env(columns: Option<String>, lines: Option<String>) -> TerminalSize {
    let parse = |value: Option<String>| value.and_then(|v| v.trim().parse::<usize>().ok()).filter(|v| *v > 0);
    TerminalSize {
        width: parse(columns).unwrap_or(DEFAULT_WIDTH),
        height: parse(lines).unwrap_or(DEFAULT_HEIGHT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_fallbacks() {
        assert_eq!(from_env(None, None), TerminalSize::default());
        assert_eq!(
            from_env(Some("120".to_string()), Some("40".to_string())),
            TerminalSize { width: 120, height: 40 }
        );
        assert_eq!(from_env(Some("wide".to_string()), None).width, DEFAULT_WIDTH);
    }

    #[test]
    fn test_override_wins() {
        assert_eq!(detect(Some(100), false).width, 100);
    }

    #[test]
    fn test_color_choice() {
        assert!(use_color(ColorChoice::Auto, true));
        assert!(!use_color(ColorChoice::Auto, false));
        assert!(use_color(ColorChoice::Always, false));
        assert!(!use_color(ColorChoice::Never, true));
    }
}
