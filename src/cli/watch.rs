//! `xmlcache watch`: keep a document loaded and follow changes on disk.
//!
//! The cache reports confirmed external changes; this command reloads the
//! file and prints the outcome in a single status block. A file that fails
//! to parse stays bound and watched, so the next fix is picked up the same
//! way.

use std::error::Error;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use xmlcache::logger::{status_error, status_success, status_unchanged, status_warning};
use xmlcache::xml::{FormatOptions, to_string};
use xmlcache::{CacheConfig, ExternalChange, XmlCache, log};

pub fn watch_file(file: &Path, config: CacheConfig) -> Result<()> {
    if !config.watch.enabled {
        bail!("file watching is disabled by `[watch] enabled = false`");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to create tokio runtime")?;

    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .context("failed to set Ctrl+C handler")?;

    let mut cache = XmlCache::new(config);
    let path = start(&mut cache, file)?;
    log!("watch"; "watching {} (Ctrl+C to stop)", path.display());

    runtime.block_on(async move {
        loop {
            let change = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                change = cache.run_once() => change,
            };
            if let Some(change) = change {
                reload(&mut cache, &change);
            }
        }
    });

    log!("watch"; "stopped");
    Ok(())
}

/// Initial load. A parse error is reported and watching goes on; only a
/// location that cannot be bound at all is fatal.
fn start(cache: &mut XmlCache, file: &Path) -> Result<PathBuf> {
    let result = cache.load(file);
    let path = cache
        .path()
        .map(Path::to_path_buf)
        .with_context(|| format!("cannot watch {}", file.display()))?;

    match result {
        Ok(()) => report_loaded(cache, &path),
        Err(err) => report_failed(&path, &err),
    }
    Ok(path)
}

/// Reload after a confirmed change. Returns `false` when the file does not
/// parse.
fn reload(cache: &mut XmlCache, change: &ExternalChange) -> bool {
    if change.had_unsaved_changes {
        status_warning(&format!(
            "{} changed on disk, discarding unsaved edits",
            change.path.display()
        ));
    }

    let before = snapshot(cache);
    if let Err(err) = cache.load(&change.path) {
        report_failed(&change.path, &err);
        return false;
    }

    if before.is_some() && before == snapshot(cache) {
        status_unchanged(&format!("{} touched, content unchanged", change.path.display()));
    } else {
        report_loaded(cache, &change.path);
    }
    true
}

fn report_loaded(cache: &XmlCache, path: &Path) {
    let nodes = cache.document().node_count();
    if cache.warnings().is_empty() {
        status_success(&format!("loaded {} ({nodes} nodes)", path.display()));
        return;
    }

    let mut detail = format!("loaded {} ({nodes} nodes) with warnings:", path.display());
    for warning in cache.warnings() {
        detail.push_str(&format!("\n  {warning}"));
    }
    status_warning(&detail);
}

fn report_failed(path: &Path, err: &dyn Error) {
    status_error(&format!("failed to load {}", path.display()), &error_chain(err));
}

/// Compact serialization used to tell real edits from a touched file.
fn snapshot(cache: &XmlCache) -> Option<String> {
    if cache.document().is_empty() {
        return None;
    }
    let options = FormatOptions {
        indent: false,
        ..FormatOptions::default()
    };
    to_string(cache.document(), &options).ok()
}

/// Error sources, one per line.
fn error_chain(err: &dyn Error) -> String {
    let mut lines = Vec::new();
    let mut source = err.source();
    while let Some(err) = source {
        lines.push(format!("  {err}"));
        source = err.source();
    }
    lines.join("\n")
}
