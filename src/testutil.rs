use std::env;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::MakeWriter;

/// Held by tests that write scripts and then exec them. A script still open for
/// writing in a sibling thread's forked child fails to exec with `ETXTBSY`.
static SCRIPTS: Mutex<()> = Mutex::new(());

pub fn script_lock() -> MutexGuard<'static, ()> {
    SCRIPTS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Temporary directory removed on drop.
pub struct ScratchDir(PathBuf);

impl ScratchDir {
    pub fn new() -> Self {
        let path = env::temp_dir().join(format!("dockdetect-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&path).unwrap();
        ScratchDir(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Writes a `/bin/sh` script that appends `<name> <arg>` to `record` and exits
/// with `code`.
pub fn write_script(dir: &Path, name: &str, record: &Path, code: i32, mode: u32) -> PathBuf {
    let path = dir.join(name);
    let body = format!(
        "#!/bin/sh\necho \"{} $1\" >> \"{}\"\necho \"{} says hi\" >&2\nexit {}\n",
        name,
        record.display(),
        name,
        code
    );
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    path
}

/// Lines appended by scripts from `write_script`.
pub fn recorded(record: &Path) -> Vec<String> {
    match fs::read_to_string(record) {
        Ok(contents) => contents.lines().map(|l| l.to_string()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Shared in-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// A dispatch writing plain-text events at `debug` and above into this buffer.
    pub fn dispatch(&self) -> Dispatch {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(Level::DEBUG)
            .finish();
        Dispatch::new(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        let buf = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&buf)
            .lines()
            .map(|l| l.to_string())
            .collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
