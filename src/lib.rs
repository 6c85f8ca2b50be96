//! xmlcache - an XML document cache that stays in sync with its file.
//!
//! ```text
//! xml       → quick-xml loader/serializer, line info, stylesheet PI
//! document  → arena tree with a mutation journal
//! events    → change classification, batching, dirty flag
//! fs        → notify watcher, file metadata, lock probe
//! reload    → debounce + retry state machine
//! cache     → XmlCache, tying the above to one bound file
//! config    → xmlcache.toml
//! ```

pub mod cache;
pub mod config;
pub mod document;
pub mod events;
pub mod fs;
pub mod logger;
pub mod reload;
pub mod xml;

pub use cache::{CacheError, ExternalChange, FileBinding, XmlCache};
pub use config::CacheConfig;
pub use document::{Document, NodeId, NodeKind};
pub use events::{ChangeEvent, ChangeKind};
