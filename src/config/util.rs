//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from the current directory.
///
/// ```text
/// /home/user/docs/catalog/   ← cwd
/// /home/user/docs/xmlcache.toml  ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    find_config_file_from(&cwd, config_name)
}

/// Walk up from `start` looking for `config_name`.
pub fn find_config_file_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_in_ancestor() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("xmlcache.toml"), "").unwrap();

        let found = find_config_file_from(&nested, Path::new("xmlcache.toml"));
        assert_eq!(found, Some(dir.path().join("xmlcache.toml")));
    }

    #[test]
    fn test_nearest_wins() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("xmlcache.toml"), "").unwrap();
        std::fs::write(nested.join("xmlcache.toml"), "").unwrap();

        let found = find_config_file_from(&nested, Path::new("xmlcache.toml"));
        assert_eq!(found, Some(nested.join("xmlcache.toml")));
    }

    #[test]
    fn test_directory_is_not_a_config() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("xmlcache.toml")).unwrap();
        let found = find_config_file_from(dir.path(), Path::new("xmlcache.toml"));
        // Walks past the directory; whatever lies above the temp dir is not ours.
        assert_ne!(found, Some(dir.path().join("xmlcache.toml")));
    }
}
