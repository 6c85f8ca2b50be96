use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::sync::mpsc;

use super::*;

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn metadata_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ))
}

fn rename_kind(mode: notify::event::RenameMode) -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Name(mode))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

const BOUND: &str = "/tmp/docs/books.xml";

fn classify(paths: Vec<&str>, kind: notify::EventKind) -> Option<WatchMsg> {
    classify_event(&make_event(paths, kind), Path::new(BOUND))
}

// ============================================================================
// classify_event
// ============================================================================

#[test]
fn test_content_change_on_bound_path() {
    assert_eq!(
        classify(vec![BOUND], modify_kind()),
        Some(WatchMsg::Changed(PathBuf::from(BOUND)))
    );
}

#[test]
fn test_other_files_ignored() {
    assert_eq!(classify(vec!["/tmp/docs/other.xml"], modify_kind()), None);
    assert_eq!(classify(vec!["/tmp/docs/books.xml.bak"], modify_kind()), None);
}

#[test]
fn test_path_match_ignores_case() {
    assert_eq!(
        classify(vec!["/tmp/docs/BOOKS.XML"], modify_kind()),
        Some(WatchMsg::Changed(PathBuf::from("/tmp/docs/BOOKS.XML")))
    );
}

#[test]
fn test_metadata_and_remove_ignored() {
    assert_eq!(classify(vec![BOUND], metadata_kind()), None);
    assert_eq!(classify(vec![BOUND], remove_kind()), None);
}

#[test]
fn test_create_counts_as_change() {
    assert_eq!(
        classify(vec![BOUND], create_kind()),
        Some(WatchMsg::Changed(PathBuf::from(BOUND)))
    );
}

#[test]
fn test_rename_away_from_bound_path() {
    use notify::event::RenameMode;

    let msg = classify(vec![BOUND, "/tmp/docs/renamed.xml"], rename_kind(RenameMode::Both));
    assert_eq!(
        msg,
        Some(WatchMsg::Renamed {
            from: PathBuf::from(BOUND),
            to: PathBuf::from("/tmp/docs/renamed.xml"),
        })
    );
    assert_eq!(msg.unwrap().path(), Path::new(BOUND));
}

#[test]
fn test_rename_onto_bound_path_is_a_change() {
    use notify::event::RenameMode;

    assert_eq!(
        classify(vec!["/tmp/docs/.books.xml.tmp", BOUND], rename_kind(RenameMode::Both)),
        Some(WatchMsg::Changed(PathBuf::from(BOUND)))
    );
    assert_eq!(
        classify(vec![BOUND], rename_kind(RenameMode::To)),
        Some(WatchMsg::Changed(PathBuf::from(BOUND)))
    );
    // The matching "to" half is what gets reported.
    assert_eq!(classify(vec![BOUND], rename_kind(RenameMode::From)), None);
}

// ============================================================================
// path helpers
// ============================================================================

#[test]
fn test_same_path() {
    assert!(same_path(Path::new("/a/B.xml"), Path::new("/a/b.XML")));
    assert!(!same_path(Path::new("/a/b.xml"), Path::new("/a/c.xml")));
}

#[test]
fn test_normalize_path_relative() {
    let normalized = normalize_path(Path::new("relative/path/file.xml"));
    assert!(normalized.is_absolute());
}

// ============================================================================
// OsFileStat
// ============================================================================

#[test]
fn test_os_stat_roundtrip_on_real_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.xml");
    std::fs::write(&path, "<a/>").unwrap();

    let stat = OsFileStat;
    assert!(stat.exists(&path));
    assert!(!stat.exists(&dir.path().join("missing.xml")));
    assert!(stat.modified(&path).is_ok());
    assert!(stat.probe_shared_read(&path).is_ok());
    assert!(stat.probe_shared_read(&dir.path().join("missing.xml")).is_err());
}

#[test]
fn test_os_stat_read_only_toggle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.xml");
    std::fs::write(&path, "<a/>").unwrap();

    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_readonly(true);
    std::fs::set_permissions(&path, permissions).unwrap();

    let stat = OsFileStat;
    assert!(stat.is_read_only(&path).unwrap());
    stat.set_read_write(&path).unwrap();
    assert!(!stat.is_read_only(&path).unwrap());
}

// ============================================================================
// FileWatcher
// ============================================================================

#[test]
fn test_watcher_requires_existing_file() {
    let dir = TempDir::new().unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut watcher = FileWatcher::new(tx, true);

    assert!(!watcher.arm(&dir.path().join("missing.xml")).unwrap());
    assert!(!watcher.is_armed());
}

#[test]
fn test_watcher_disabled_never_arms() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.xml");
    std::fs::write(&path, "<a/>").unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let mut watcher = FileWatcher::new(tx, false);
    assert!(!watcher.arm(&path).unwrap());
}

#[test]
fn test_watcher_pause_rearms_on_drop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.xml");
    std::fs::write(&path, "<a/>").unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let mut watcher = FileWatcher::new(tx, true);
    assert!(watcher.arm(&path).unwrap());

    {
        let _pause = watcher.pause();
    }
    assert_eq!(watcher.armed_path(), Some(path.as_path()));
}

#[test]
fn test_watcher_pause_retarget() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.xml");
    let second = dir.path().join("b.xml");
    std::fs::write(&first, "<a/>").unwrap();
    std::fs::write(&second, "<b/>").unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let mut watcher = FileWatcher::new(tx, true);
    watcher.arm(&first).unwrap();

    {
        let mut pause = watcher.pause();
        pause.retarget(&second);
    }
    assert_eq!(watcher.armed_path(), Some(second.as_path()));
}

#[test]
fn test_watcher_disable_disarms() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.xml");
    std::fs::write(&path, "<a/>").unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let mut watcher = FileWatcher::new(tx, true);
    watcher.arm(&path).unwrap();
    watcher.set_enabled(false);
    assert!(!watcher.is_armed());
    assert_eq!(watcher.disarm(), None);
}
