//! The document cache.
//!
//! [`XmlCache`] owns one document bound to one file and keeps the two in
//! step:
//!
//! ```text
//! edit() ──journal──▶ ChangeNotifier ──▶ model listeners
//!                           └──▶ DirtyTracker
//!
//! notify thread ──WatchMsg──▶ inbox ──▶ ReloadCoordinator ──▶ file listeners
//!                                     (debounce, mtime, lock probe)
//! ```
//!
//! All state is mutated by the owner. Watch messages are drained with
//! [`XmlCache::pump`] or awaited with [`XmlCache::run_once`]; the debounce
//! deadline is driven by [`XmlCache::poll_timer`].

mod binding;
mod location;
mod store;


pub use binding::FileBinding;
pub use location::resolve_location;
pub use store::DocumentStore;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::config::CacheConfig;
use crate::document::{Document, NodeId};
use crate::events::{
    ChangeEvent, ChangeKind, ChangeNotifier, DirtyTracker, ListenerId, Listeners, MutationPhase,
};
use crate::fs::{FileStat, FileWatcher, OsFileStat, WatchMsg, same_path};
use crate::reload::{CycleOutcome, ReloadCoordinator, ReloadState};
use crate::xml::{
    LineInfo, LoadWarning, Loader, ParseError, Serializer, XmlLoader, XmlSerializer,
    sniff_encoding,
};

/// Errors surfaced by cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to load `{}`", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("failed to save `{}`", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no file is bound")]
    NotBound,

    #[error("unsupported location `{0}`")]
    UnsupportedLocation(String),

    #[error("IO error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// The bound file was changed by someone else and is ready to be reloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalChange {
    pub path: PathBuf,
    /// The in-memory document had unsaved edits when the change was confirmed.
    pub had_unsaved_changes: bool,
}

/// In-memory document bound to a file on disk.
pub struct XmlCache {
    store: DocumentStore,
    binding: Option<FileBinding>,
    warnings: Vec<LoadWarning>,
    dirty: DirtyTracker,
    notifier: ChangeNotifier,
    file_listeners: Listeners<ExternalChange>,
    watcher: FileWatcher,
    coordinator: ReloadCoordinator,
    inbox: UnboundedReceiver<WatchMsg>,
    config: CacheConfig,
    loader: Box<dyn Loader + Send>,
    serializer: Box<dyn Serializer + Send>,
    stat: Box<dyn FileStat>,
}

impl Default for XmlCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl XmlCache {
    pub fn new(config: CacheConfig) -> Self {
        let (outbox, inbox) = mpsc::unbounded_channel();
        Self {
            store: DocumentStore::default(),
            binding: None,
            warnings: Vec::new(),
            dirty: DirtyTracker::new(),
            notifier: ChangeNotifier::new(),
            file_listeners: Listeners::default(),
            watcher: FileWatcher::new(outbox, config.watch.enabled),
            coordinator: ReloadCoordinator::new(config.watch.debounce(), config.watch.retries),
            inbox,
            loader: Box::new(XmlLoader::new(config.load.preserve_whitespace)),
            serializer: Box::new(XmlSerializer),
            stat: Box::new(OsFileStat),
            config,
        }
    }

    pub fn with_loader(mut self, loader: impl Loader + Send + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_serializer(mut self, serializer: impl Serializer + Send + 'static) -> Self {
        self.serializer = Box::new(serializer);
        self
    }

    pub fn with_file_stat(mut self, stat: impl FileStat + 'static) -> Self {
        self.stat = Box::new(stat);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn document(&self) -> &Document {
        self.store.document()
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn binding(&self) -> Option<&FileBinding> {
        self.binding.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.binding.as_ref().map(|b| b.path.as_path())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    /// The binding refers to an existing local file.
    pub fn is_file(&self) -> bool {
        self.binding
            .as_ref()
            .is_some_and(|b| b.is_local_file && self.stat.exists(&b.path))
    }

    pub fn line_info(&self, node: NodeId) -> Option<LineInfo> {
        self.store.line_info(node)
    }

    /// Warnings collected by the last load.
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Transform referenced by the document's `xml-stylesheet` instruction.
    pub fn xslt_reference(&self) -> Option<&str> {
        self.store.stylesheet()
    }

    pub fn set_xslt_reference(&mut self, href: Option<String>) {
        self.store.set_stylesheet(href);
    }

    pub fn reload_state(&self) -> ReloadState {
        self.coordinator.state()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_armed()
    }

    pub fn batch_depth(&self) -> u32 {
        self.notifier.depth()
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Subscribe to [`ChangeEvent`]s.
    pub fn on_model_changed(
        &mut self,
        listener: impl FnMut(&ChangeEvent) + Send + 'static,
    ) -> ListenerId {
        self.notifier.subscribe(listener)
    }

    pub fn remove_model_listener(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Subscribe to confirmed external changes of the bound file.
    pub fn on_file_changed(
        &mut self,
        listener: impl FnMut(&ExternalChange) + Send + 'static,
    ) -> ListenerId {
        self.file_listeners.subscribe(listener)
    }

    pub fn remove_file_listener(&mut self, id: ListenerId) -> bool {
        self.file_listeners.unsubscribe(id)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Load `location` and bind to it.
    ///
    /// On a parse failure the document is reset to empty but the cache
    /// stays bound and watched, so fixing the file on disk is reported as
    /// an external change. Observers get one `Reloaded` either way.
    pub fn load(&mut self, location: impl AsRef<Path>) -> Result<()> {
        let path = resolve_location(location.as_ref())?;

        self.watcher.disarm();
        self.coordinator.cancel();

        // Captured before reading so a write racing the read shows up as newer.
        let modified = self.stat.modified(&path).unwrap_or(SystemTime::UNIX_EPOCH);
        let loaded = File::open(&path)
            .map_err(ParseError::Io)
            .and_then(|mut file| self.loader.load(&mut file));

        match loaded {
            Ok(mut loaded) => {
                self.warnings = std::mem::take(&mut loaded.warnings);
                let journal = self.store.replace(loaded);
                self.notifier.apply(
                    self.store.document(),
                    &journal,
                    MutationPhase::Loading,
                    &mut self.dirty,
                );
                for warning in &self.warnings {
                    crate::debug!("load"; "{}: {}", path.display(), warning);
                }
                crate::debug!(
                    "load";
                    "{} ({} nodes)",
                    path.display(),
                    self.store.document().node_count()
                );

                self.bind(path, modified);
                self.notifier.emit(ChangeEvent::new(ChangeKind::Reloaded));
                Ok(())
            }
            Err(source) => {
                crate::debug!("load"; "{} failed: {}", path.display(), source);
                self.store.clear();
                self.warnings.clear();
                self.bind(path.clone(), modified);
                self.notifier.emit(ChangeEvent::new(ChangeKind::Reloaded));
                Err(CacheError::Parse { path, source })
            }
        }
    }

    fn bind(&mut self, path: PathBuf, last_modified: SystemTime) {
        self.binding = Some(FileBinding {
            path,
            last_modified,
            is_local_file: true,
        });
        self.dirty.clear();
        self.arm();
    }

    /// Load the bound file again.
    pub fn reload(&mut self) -> Result<()> {
        let path = self.path().ok_or(CacheError::NotBound)?.to_path_buf();
        self.load(path)
    }

    /// Write the document back to the bound file.
    pub fn save(&mut self) -> Result<()> {
        let path = self.path().ok_or(CacheError::NotBound)?.to_path_buf();
        self.save_as(path)
    }

    /// Write the document to `location` and bind to it.
    ///
    /// The watcher is paused for the write so the cache never reacts to its
    /// own output. On failure the previous binding and dirty state are kept.
    pub fn save_as(&mut self, location: impl AsRef<Path>) -> Result<()> {
        let path = resolve_location(location.as_ref())?;

        let (encoding, rejected) = sniff_encoding(self.store.document().declared_encoding());
        if let Some(label) = rejected {
            crate::log!("save"; "encoding '{}' is not supported, writing {}", label, encoding);
        }
        let options = self.config.format.options(encoding);

        let mut pause = self.watcher.pause();
        let mut buffer = Vec::new();
        let written = self
            .serializer
            .write(self.store.document(), &mut buffer, &options)
            .and_then(|()| fs::write(&path, &buffer));
        if let Err(source) = written {
            return Err(CacheError::Save { path, source });
        }
        // Dropping the pause on this error rearms the previous binding.
        let modified = match self.stat.modified(&path) {
            Ok(modified) => modified,
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        pause.retarget(&path);
        drop(pause);
        crate::debug!("save"; "{} ({} bytes)", path.display(), buffer.len());

        self.coordinator.cancel();
        self.binding = Some(FileBinding {
            path,
            last_modified: modified,
            is_local_file: true,
        });
        self.dirty.clear();
        self.notifier.emit(ChangeEvent::new(ChangeKind::Saved));
        Ok(())
    }

    /// Drop the document and the binding.
    pub fn clear(&mut self) {
        self.watcher.disarm();
        self.coordinator.cancel();
        self.store.clear();
        self.binding = None;
        self.warnings.clear();
        self.dirty.clear();
        self.notifier.emit(ChangeEvent::new(ChangeKind::Reloaded));
    }

    fn arm(&mut self) {
        let Some(binding) = &self.binding else {
            return;
        };
        if !binding.is_local_file {
            return;
        }
        if let Err(e) = self.watcher.arm(&binding.path) {
            crate::log!("watch"; "failed to watch {}: {}", binding.path.display(), e);
        }
    }

    // ========================================================================
    // Editing
    // ========================================================================

    pub fn begin_update(&mut self) {
        self.notifier.begin_update();
    }

    pub fn end_update(&mut self) {
        self.notifier.end_update();
    }

    /// Apply edits to the document.
    ///
    /// Every mutation made inside `f` is classified, dispatched and marks
    /// the cache dirty once `f` returns.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Document) -> R) -> R {
        let result = f(self.store.document_mut());
        let journal = self.store.document_mut().take_journal();
        self.store.track_stylesheet(&journal);
        self.notifier.apply(
            self.store.document(),
            &journal,
            MutationPhase::Editing,
            &mut self.dirty,
        );
        result
    }

    // ========================================================================
    // Read-only handling
    // ========================================================================

    /// `false` for missing files.
    pub fn is_read_only(&self, path: &Path) -> bool {
        self.stat.is_read_only(path).unwrap_or(false)
    }

    /// Clear the read-only attribute of `path` with the watcher paused.
    ///
    /// A missing file has nothing to clear and is not an error.
    pub fn make_read_write(&mut self, path: &Path) -> Result<()> {
        if !self.stat.exists(path) {
            return Ok(());
        }
        let _pause = self.watcher.pause();
        self.stat
            .set_read_write(path)
            .map_err(|source| CacheError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    // ========================================================================
    // External changes
    // ========================================================================

    /// Feed one watch message into the reload protocol.
    pub fn handle_watch(&mut self, msg: WatchMsg, now: Instant) {
        let Some(binding) = self.binding.as_mut() else {
            crate::debug!("watch"; "ignoring {} (unbound)", msg.path().display());
            return;
        };
        if !same_path(msg.path(), &binding.path) {
            crate::debug!("watch"; "ignoring {} (not bound)", msg.path().display());
            return;
        }

        match msg {
            WatchMsg::Changed(_) => {
                let path = binding.path.clone();
                self.coordinator.signal(&path, now);
            }
            WatchMsg::Renamed { to, .. } => {
                crate::log!("watch"; "{} renamed to {}", binding.path.display(), to.display());
                binding.path = to;
                let path = binding.path.clone();
                self.arm();
                self.coordinator.signal(&path, now);
            }
        }
    }

    /// Drain pending watch messages without blocking.
    pub fn pump(&mut self, now: Instant) -> usize {
        let mut handled = 0;
        while let Ok(msg) = self.inbox.try_recv() {
            self.handle_watch(msg, now);
            handled += 1;
        }
        handled
    }

    /// Resolve an expired debounce deadline.
    ///
    /// Listeners registered with [`XmlCache::on_file_changed`] are called
    /// before the change is returned.
    pub fn poll_timer(&mut self, now: Instant) -> Option<ExternalChange> {
        let outcome = self
            .coordinator
            .poll(now, self.binding.as_ref(), self.stat.as_ref())?;

        let CycleOutcome::FileChanged(path) = outcome else {
            return None;
        };
        let change = ExternalChange {
            path,
            had_unsaved_changes: self.dirty.is_dirty(),
        };
        crate::debug!("reload"; "{} changed externally", change.path.display());
        self.file_listeners.emit(&change);
        Some(change)
    }

    /// Wait for the next watch message or deadline and process it.
    pub async fn run_once(&mut self) -> Option<ExternalChange> {
        let sleep = self.coordinator.sleep_duration(Instant::now());
        tokio::select! {
            biased;
            Some(msg) = self.inbox.recv() => {
                self.handle_watch(msg, Instant::now());
                None
            }
            _ = tokio::time::sleep(sleep) => self.poll_timer(Instant::now()),
        }
    }
}
