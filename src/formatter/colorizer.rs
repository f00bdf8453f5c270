//! Color output support for terminal formatting
//!
//! Message styling for the command line: success, error, warning and
//! informational lines, plus bold/dim helpers for table headers and the
//! page status line. Every method returns the plain text when disabled.

use nu_ansi_term::{Color, Style};

/// Color scheme for output highlighting
#[derive(Debug, Clone, Copy)]
pub struct Colorizer {
    /// Enable colors
    enabled: bool,
}

impl Colorizer {
    /// Create a new colorizer
    ///
    /// # Arguments
    /// * `enabled` - Enable color output
    ///
    /// # Returns
    /// * `Self` - New colorizer
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Colorize text as success (green)
    pub fn success(&self, text: &str) -> String {
        self.paint(Color::Green.normal(), text)
    }

    /// Colorize text as error (red), prefixed with "Error: "
    pub fn error(&self, text: &str) -> String {
        self.paint(Color::Red.normal(), &format!("Error: {}", text))
    }

    /// Colorize text as warning (yellow)
    pub fn warning(&self, text: &str) -> String {
        self.paint(Color::Yellow.normal(), text)
    }

    /// Colorize text as info (cyan)
    pub fn info(&self, text: &str) -> String {
        self.paint(Color::Cyan.normal(), text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(Style::new().bold(), text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint(Style::new().dimmed(), text)
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.enabled {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for Colorizer {
    fn default() -> Self {
        Self::new(true)
    }
}
