//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file `{0}` does not exist")]
    NotFound(PathBuf),

    #[error("config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_io_error_keeps_source() {
        let err = ConfigError::Io(
            PathBuf::from("xmlcache.toml"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "IO error when reading `xmlcache.toml`");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_validation_message() {
        let err = ConfigError::Validation("watch.retries must be at least 1".to_string());
        assert!(err.to_string().contains("watch.retries"));
    }
}
