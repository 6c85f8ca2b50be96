//! Configuration sections.
//!
//! # Example
//!
//! ```toml
//! [format]
//! indent = true           # Indent element-only content on save
//! indent_char = "space"   # "space" or "tab"
//! indent_level = 2        # Characters per indentation level
//! newline = "\r\n"        # Line break sequence
//!
//! [watch]
//! enabled = true          # Watch the bound file for external changes
//! debounce_ms = 1000      # Quiet period before checking a change
//! retries = 3             # Attempts while the writer still holds the file
//!
//! [load]
//! preserve_whitespace = false
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::reload::{DEFAULT_DEBOUNCE_MS, DEFAULT_RETRIES};
use crate::xml::FormatOptions;

const MAX_INDENT_LEVEL: usize = 16;

// ============================================================================
// [format]
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentChar {
    #[default]
    Space,
    Tab,
}

impl IndentChar {
    pub fn as_char(self) -> char {
        match self {
            Self::Space => ' ',
            Self::Tab => '\t',
        }
    }
}

/// Save formatting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub indent: bool,
    pub indent_char: IndentChar,
    pub indent_level: usize,
    pub newline: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: true,
            indent_char: IndentChar::Space,
            indent_level: 2,
            newline: "\r\n".to_string(),
        }
    }
}

impl FormatConfig {
    /// Serializer options for a save in `encoding`.
    pub fn options(&self, encoding: impl Into<String>) -> FormatOptions {
        FormatOptions {
            indent: self.indent,
            indent_unit: self
                .indent_char
                .as_char()
                .to_string()
                .repeat(self.indent_level),
            newline: self.newline.clone(),
            encoding: encoding.into(),
        }
    }

    pub(super) fn validate(&self, problems: &mut Vec<String>) {
        if self.indent_level > MAX_INDENT_LEVEL {
            problems.push(format!(
                "format.indent_level must be at most {MAX_INDENT_LEVEL} (got {})",
                self.indent_level
            ));
        }
        if self.newline.is_empty() || !self.newline.chars().all(|c| matches!(c, '\r' | '\n')) {
            problems.push("format.newline must consist of \\r and \\n only".to_string());
        }
    }
}

// ============================================================================
// [watch]
// ============================================================================

/// File watching and reload protocol.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
    pub retries: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            retries: DEFAULT_RETRIES,
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub(super) fn validate(&self, problems: &mut Vec<String>) {
        if self.debounce_ms == 0 {
            problems.push("watch.debounce_ms must be at least 1".to_string());
        }
        if self.retries == 0 {
            problems.push("watch.retries must be at least 1".to_string());
        }
    }
}

// ============================================================================
// [load]
// ============================================================================

/// Parsing options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Keep whitespace-only text nodes.
    pub preserve_whitespace: bool,
}
