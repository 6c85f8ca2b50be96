//! Configuration management for `xmlcache.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section    # [format], [watch], [load]
//! ├── error      # ConfigError
//! ├── util       # config file discovery
//! └── mod.rs     # CacheConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section    | Purpose                                        |
//! |------------|------------------------------------------------|
//! | `[format]` | Indentation and newlines used on save          |
//! | `[watch]`  | File watching, debounce and retry budget       |
//! | `[load]`   | Whitespace handling when parsing               |
//!
//! Every section is optional; a missing file means all defaults.

mod error;
mod section;
mod util;

pub use error::ConfigError;
pub use section::{FormatConfig, IndentChar, LoadConfig, WatchConfig};
pub use util::{find_config_file, find_config_file_from};

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::log;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root configuration structure representing `xmlcache.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Absolute path of the file this was read from (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Save formatting
    #[serde(default)]
    pub format: FormatConfig,

    /// File watching and the reload protocol
    #[serde(default)]
    pub watch: WatchConfig,

    /// Parsing options
    #[serde(default)]
    pub load: LoadConfig,
}

impl CacheConfig {
    pub const FILE_NAME: &'static str = "xmlcache.toml";

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `xmlcache.toml` is searched
    /// upward from the working directory and defaults are used if none is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) => return Err(ConfigError::NotFound(path.to_path_buf())),
            None => match find_config_file(Path::new(Self::FILE_NAME)) {
                Some(path) => path,
                None => {
                    crate::debug!("config"; "no {} found, using defaults", Self::FILE_NAME);
                    return Ok(Self::default());
                }
            },
        };

        let mut config = Self::from_path(&path)?;
        config.validate()?;
        crate::debug!("config"; "loaded {}", path.display());
        config.config_path = Some(path);
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, warning about unknown fields.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("config"; "ignoring unknown fields in {}: {}", display_path, fields.join(", "));
    }

    /// Check value ranges across all sections.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        self.format.validate(&mut problems);
        self.watch.validate(&mut problems);

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems.join("; ")))
        }
    }
}

/// Parse a config snippet, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> CacheConfig {
    let (parsed, ignored) = CacheConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_is_default() {
        let config = test_parse_config("");
        assert!(config.format.indent);
        assert!(config.watch.enabled);
        assert!(!config.load.preserve_whitespace);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_collected() {
        let content = "[format]\nindent = false\ncolour = \"red\"\n[extra]\nx = 1";
        let (_, ignored) = CacheConfig::parse_with_ignored(content).unwrap();
        assert_eq!(ignored, vec!["format.colour", "extra"]);
    }

    #[test]
    fn test_from_str_validates() {
        let err = CacheConfig::from_str("[watch]\nretries = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let err = CacheConfig::from_str("[format\nindent = true").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[format]\nindent_char = \"tab\"\nindent_level = 1").unwrap();

        let config = CacheConfig::load(Some(&path)).unwrap();
        assert_eq!(config.format.indent_char, IndentChar::Tab);
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let err = CacheConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("xmlcache.toml");
        fs::write(&path, "[format]\nindent_level = 40").unwrap();

        let err = CacheConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("indent_level"));
    }
}
