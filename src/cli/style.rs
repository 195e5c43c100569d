//! Terminal styling helpers

use indicatif::ProgressStyle;
use owo_colors::OwoColorize;
use std::fmt::Display;

/// Check mark for finished steps
pub const CHECK: &str = "✓";

/// Semantic colors for CLI output
pub trait Stylize {
    /// De-emphasized text
    fn muted(&self) -> String;
    /// Bold text
    fn emphasis(&self) -> String;
    /// Names and numbers
    fn accent(&self) -> String;
    /// Success
    fn success(&self) -> String;
    /// Warnings and skips
    fn warn(&self) -> String;
}

impl<T: Display> Stylize for T {
    fn muted(&self) -> String {
        self.dimmed().to_string()
    }

    fn emphasis(&self) -> String {
        self.bold().to_string()
    }

    fn accent(&self) -> String {
        self.cyan().to_string()
    }

    fn success(&self) -> String {
        self.green().to_string()
    }

    fn warn(&self) -> String {
        self.yellow().to_string()
    }
}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Spinner style for mergeability waits
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}
