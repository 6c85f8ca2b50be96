use std::path::PathBuf;
use std::time::SystemTime;

/// The file a cache is bound to.
///
/// `last_modified` only changes on a successful load or save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBinding {
    pub path: PathBuf,
    pub last_modified: SystemTime,
    pub is_local_file: bool,
}
