use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use super::classify::{WatchMsg, classify_event};

/// OS watch on the directory holding the bound file.
///
/// Dropping the inner watcher handle stops notifications, so disarming is
/// just dropping it.
pub struct FileWatcher {
    outbox: UnboundedSender<WatchMsg>,
    enabled: bool,
    armed: Option<ArmedWatch>,
}

struct ArmedWatch {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl FileWatcher {
    pub fn new(outbox: UnboundedSender<WatchMsg>, enabled: bool) -> Self {
        Self {
            outbox,
            enabled,
            armed: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling also disarms.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.disarm();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn armed_path(&self) -> Option<&Path> {
        self.armed.as_ref().map(|a| a.path.as_path())
    }

    /// Start watching `path`.
    ///
    /// Returns `Ok(false)` without watching when disabled or when `path`
    /// is not an existing file.
    pub fn arm(&mut self, path: &Path) -> notify::Result<bool> {
        self.disarm();
        if !self.enabled || !path.is_file() {
            return Ok(false);
        }
        let Some(dir) = path.parent() else {
            return Ok(false);
        };

        let outbox = self.outbox.clone();
        let bound = path.to_path_buf();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    if let Some(msg) = classify_event(&event, &bound) {
                        // Receiver gone means the cache was dropped.
                        let _ = outbox.send(msg);
                    }
                }
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        crate::debug!("watch"; "armed {}", path.display());
        self.armed = Some(ArmedWatch {
            _watcher: watcher,
            path: path.to_path_buf(),
        });
        Ok(true)
    }

    /// Stop watching, returning the path that was watched.
    pub fn disarm(&mut self) -> Option<PathBuf> {
        let armed = self.armed.take()?;
        crate::debug!("watch"; "disarmed {}", armed.path.display());
        Some(armed.path)
    }

    /// Disarm until the returned guard drops.
    pub fn pause(&mut self) -> WatchPause<'_> {
        let rearm = self.disarm();
        WatchPause {
            watcher: self,
            rearm,
        }
    }
}

/// Rearms the watcher on drop, on whatever path it was last pointed at.
pub struct WatchPause<'a> {
    watcher: &'a mut FileWatcher,
    rearm: Option<PathBuf>,
}

impl WatchPause<'_> {
    /// Rearm on `path` instead of the previously watched one.
    pub fn retarget(&mut self, path: &Path) {
        self.rearm = Some(path.to_path_buf());
    }
}

impl Drop for WatchPause<'_> {
    fn drop(&mut self) {
        if let Some(path) = self.rearm.take()
            && let Err(e) = self.watcher.arm(&path)
        {
            crate::log!("watch"; "failed to watch {}: {}", path.display(), e);
        }
    }
}
