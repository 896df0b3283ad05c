use std::fs::{self, File};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use nix::ioctl_read_buf;
use tracing::{debug, error};

use crate::err::DockError;

/// Directory holding the evdev character devices.
pub const INPUT_DIR: &str = "/dev/input";

const NAME_LEN: usize = 256;

const EVIO_IOC_MAGIC: u8 = b'E';
const EVIOCGNAME: u8 = 0x06;

ioctl_read_buf!(evdev_get_name, EVIO_IOC_MAGIC, EVIOCGNAME, u8);

/// Looks up the hardware name a device node reports.
pub trait NameQuery {
    fn device_name(&self, path: &Path) -> io::Result<String>;
}

/// Asks the evdev driver for the device name with `EVIOCGNAME`.
pub struct EvdevNameQuery;

impl NameQuery for EvdevNameQuery {
    fn device_name(&self, path: &Path) -> io::Result<String> {
        let file = File::open(path)?;
        let mut buf = [0u8; NAME_LEN];
        unsafe { evdev_get_name(file.as_raw_fd(), &mut buf) }.map_err(io::Error::from)?;
        Ok(trim_name(&buf))
    }
}

fn trim_name(buf: &[u8]) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Maps a hardware name to the device node reporting it.
pub struct DeviceResolver<Q> {
    dir: PathBuf,
    query: Q,
}

impl DeviceResolver<EvdevNameQuery> {
    pub fn new() -> Self {
        DeviceResolver::with_query(INPUT_DIR, EvdevNameQuery)
    }
}

impl Default for DeviceResolver<EvdevNameQuery> {
    fn default() -> Self {
        DeviceResolver::new()
    }
}

impl<Q: NameQuery> DeviceResolver<Q> {
    pub fn with_query<P: Into<PathBuf>>(dir: P, query: Q) -> Self {
        DeviceResolver {
            dir: dir.into(),
            query,
        }
    }

    /// Returns the first node in `dir` whose name is exactly `name`.
    ///
    /// Candidates are visited in directory-listing order, which the kernel and
    /// udev do not keep stable, so with duplicate names any of them may win.
    /// Nodes that cannot be opened or queried are logged and skipped.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, DockError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| DockError::Open {
            path: self.dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    error!(dir = %self.dir.display(), error = %e, "could not list input device");
                    continue;
                }
            };
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            match self.query.device_name(&path) {
                Ok(ref found) if found == name => {
                    debug!(device = %path.display(), name, "resolved input device");
                    return Ok(path);
                }
                Ok(_) => (),
                Err(e) => {
                    error!(device = %path.display(), error = %e, "could not query input device name");
                }
            }
        }
        Err(DockError::DeviceNotFound(name.to_string()))
    }
}
