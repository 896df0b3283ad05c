use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use nix::unistd;
use tracing::{debug, warn};

use crate::err::DockError;

/// Where the dispatcher runs.
pub enum Context {
    /// In the invoking process, attached to its terminal.
    Inline,
    /// Detached, holding the pid file lock until dropped.
    Daemon(PidLock),
}

/// Runs inline for `foreground`, otherwise detaches and takes the pid file.
pub fn enter(foreground: bool, pidfile: &Path) -> Result<Context, DockError> {
    if foreground {
        return Ok(Context::Inline);
    }
    unistd::daemon(false, false).map_err(DockError::Daemon)?;
    Ok(Context::Daemon(PidLock::acquire(pidfile)?))
}

/// Exclusive `flock` on a pid file holding our pid.
pub struct PidLock {
    path: PathBuf,
    _lock: Flock<File>,
}

impl PidLock {
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self, DockError> {
        let path = path.as_ref();
        let pid_err = |source| DockError::PidFile {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(pid_err)?;
        let mut lock = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => lock,
            Err((_, Errno::EWOULDBLOCK)) => return Err(DockError::PidLocked(path.to_path_buf())),
            Err((_, errno)) => return Err(pid_err(errno.into())),
        };
        lock.set_len(0).map_err(pid_err)?;
        writeln!(lock, "{}", process::id()).map_err(pid_err)?;
        debug!(pidfile = %path.display(), pid = process::id(), "pid file locked");
        Ok(PidLock {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(pidfile = %self.path.display(), error = %e, "could not remove pid file");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::testutil::ScratchDir;

    #[test]
    fn test_foreground_runs_inline() {
        match enter(true, Path::new("/nonexistent/dockdetect.pid")).unwrap() {
            Context::Inline => (),
            Context::Daemon(_) => panic!("foreground run must not detach"),
        }
    }

    #[test]
    fn test_pid_lock_writes_pid_and_cleans_up() {
        let dir = ScratchDir::new();
        let path = dir.path().join("dockdetect");
        {
            let lock = PidLock::acquire(&path).unwrap();
            assert_eq!(lock.path(), path.as_path());
            let contents = fs::read_to_string(&path).unwrap();
            assert_eq!(contents.trim(), process::id().to_string());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_second_lock_is_refused() {
        let dir = ScratchDir::new();
        let path = dir.path().join("dockdetect");
        let _held = PidLock::acquire(&path).unwrap();
        match PidLock::acquire(&path) {
            Err(DockError::PidLocked(locked)) => assert_eq!(locked, path),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("pid file locked twice"),
        }
    }

    #[test]
    fn test_stale_pid_file_is_reused() {
        let dir = ScratchDir::new();
        let path = dir.path().join("dockdetect");
        fs::write(&path, "999999\n").unwrap();
        let _lock = PidLock::acquire(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), process::id().to_string());
    }
}
