use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// File metadata collaborator.
///
/// The reload protocol only talks to the disk through this trait so it
/// can be driven by scripted fakes.
pub trait FileStat: Send {
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    fn exists(&self, path: &Path) -> bool;

    fn is_read_only(&self, path: &Path) -> io::Result<bool>;

    fn set_read_write(&self, path: &Path) -> io::Result<()>;

    /// Open for shared reading without blocking.
    ///
    /// An error means another process still holds the file.
    fn probe_shared_read(&self, path: &Path) -> io::Result<()>;
}

/// [`FileStat`] over the real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileStat;

impl FileStat for OsFileStat {
    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_read_only(&self, path: &Path) -> io::Result<bool> {
        Ok(fs::metadata(path)?.permissions().readonly())
    }

    #[cfg(unix)]
    fn set_read_write(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)?.permissions();
        // Owner write only
        permissions.set_mode(permissions.mode() | 0o200);
        fs::set_permissions(path, permissions)
    }

    #[cfg(not(unix))]
    #[allow(clippy::permissions_set_readonly_false)]
    fn set_read_write(&self, path: &Path) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)
    }

    fn probe_shared_read(&self, path: &Path) -> io::Result<()> {
        let file = File::open(path)?;
        file.try_lock_shared().map_err(io::Error::from)?;
        file.unlock()
    }
}
