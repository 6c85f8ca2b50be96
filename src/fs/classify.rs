use std::path::{Path, PathBuf};

use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

use super::path::same_path;

/// Possible external change to the bound file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchMsg {
    /// Content written, or a file moved or created onto the bound path.
    Changed(PathBuf),
    /// The bound file itself was renamed.
    Renamed { from: PathBuf, to: PathBuf },
}

impl WatchMsg {
    /// Path the message concerns (the old path for renames).
    pub fn path(&self) -> &Path {
        match self {
            Self::Changed(path) => path,
            Self::Renamed { from, .. } => from,
        }
    }
}

/// Filter a raw notify event down to the bound path.
///
/// Metadata-only changes are ignored; saving editors that write a temp
/// file and rename it over the original show up as a rename *to* the
/// bound path and are reported as content changes.
pub fn classify_event(event: &notify::Event, bound: &Path) -> Option<WatchMsg> {
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let [from, to] = event.paths.as_slice() else {
                return None;
            };
            if same_path(from, bound) {
                Some(WatchMsg::Renamed {
                    from: from.clone(),
                    to: to.clone(),
                })
            } else if same_path(to, bound) {
                Some(WatchMsg::Changed(to.clone()))
            } else {
                None
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) | EventKind::Create(_) => event
            .paths
            .iter()
            .find(|p| same_path(p, bound))
            .map(|p| WatchMsg::Changed(p.clone())),
        EventKind::Modify(ModifyKind::Name(_) | ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => event
            .paths
            .iter()
            .find(|p| same_path(p, bound))
            .map(|p| WatchMsg::Changed(p.clone())),
        _ => None,
    }
}
