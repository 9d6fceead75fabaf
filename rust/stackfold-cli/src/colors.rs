//! ANSI color helpers for diagnostics on standard error.
//!
//! Colors are only emitted when stderr is a terminal and `NO_COLOR` is unset.

use once_cell::sync::Lazy;
use std::io::IsTerminal;

static STDERR_COLOR: Lazy<bool> =
    Lazy::new(|| std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none());

/// Whether diagnostics written to stderr should carry ANSI colors.
pub fn enabled() -> bool {
    *STDERR_COLOR
}

fn paint(code: &str, s: &str, color: bool) -> String {
    if color {
        format!("\x1b[{}m{}\x1b[0m", code, s)
    } else {
        s.to_string()
    }
}

/// Format text in red.
pub fn red(s: &str) -> String {
    paint("31", s, enabled())
}
