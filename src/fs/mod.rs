//! File system side of the cache.
//!
//! ```text
//! notify thread → classify_event (bound path filter) → WatchMsg → owner inbox
//! ```
//!
//! The notify callback runs on the watcher's own thread and only posts
//! into an unbounded tokio channel; everything else happens on the owner.

// Raw notify events → WatchMsg for the bound path.
mod classify;
// Path normalization and comparison.
mod path;
// Modification time, read-only attribute and the shared-read probe.
mod stat;
// Armed/disarmed OS watch on the bound file's directory.
mod watcher;

#[cfg(test)]
mod tests;

pub use classify::{WatchMsg, classify_event};
pub use path::{normalize_path, same_path};
pub use stat::{FileStat, OsFileStat};
pub use watcher::{FileWatcher, WatchPause};
