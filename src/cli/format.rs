//! `xmlcache format`: load a document and write it back out.

use std::path::Path;

use anyhow::{Context, Result, bail};
use xmlcache::{CacheConfig, XmlCache, log};

pub fn format_file(
    file: &Path,
    output: Option<&Path>,
    make_writable: bool,
    config: CacheConfig,
) -> Result<()> {
    let mut cache = XmlCache::new(config);
    cache
        .load(file)
        .with_context(|| format!("cannot read {}", file.display()))?;

    let target = match output {
        Some(output) => output.to_path_buf(),
        None => cache
            .path()
            .map(Path::to_path_buf)
            .context("document is not bound to a file")?,
    };

    if target.exists() && cache.is_read_only(&target) {
        if !make_writable {
            bail!(
                "{} is read-only (pass --make-writable to clear the attribute)",
                target.display()
            );
        }
        cache.make_read_write(&target)?;
        log!("format"; "cleared read-only attribute on {}", target.display());
    }

    match output {
        Some(_) => cache.save_as(&target)?,
        None => cache.save()?,
    }
    log!("save"; "{}", target.display());
    Ok(())
}
