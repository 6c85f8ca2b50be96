//! Turning user-supplied locations into local paths.

use std::path::{Path, PathBuf};

use url::Url;

use super::CacheError;
use crate::fs::normalize_path;

/// Resolve a path, `~/` path or `file://` URL to an absolute local path.
///
/// Other URL schemes are rejected. Paths that do not exist yet are
/// resolved through their parent directory so that a later save and load
/// of the same location agree.
pub fn resolve_location(location: &Path) -> Result<PathBuf, CacheError> {
    let text = location.to_string_lossy();

    if let Some((scheme, _)) = text.split_once("://")
        && scheme.len() > 1
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        let unsupported = || CacheError::UnsupportedLocation(text.to_string());
        let url = Url::parse(&text).map_err(|_| unsupported())?;
        if url.scheme() != "file" {
            return Err(unsupported());
        }
        let path = url.to_file_path().map_err(|()| unsupported())?;
        return Ok(absolute(&path));
    }

    let expanded = shellexpand::tilde(&text).into_owned();
    Ok(absolute(Path::new(&expanded)))
}

fn absolute(path: &Path) -> PathBuf {
    if path.exists() {
        return normalize_path(path);
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            normalize_path(parent).join(name)
        }
        _ => normalize_path(path),
    }
}
