use std::fs;
use std::io::{self, Read};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use nix::unistd::{access, AccessFlags};
use tracing::{debug, error, warn};

/// What happened to one target script.
#[derive(Debug)]
pub enum TargetStatus {
    Success,
    Failed(ExitStatus),
    SpawnFailed(io::Error),
}

#[derive(Debug)]
pub struct TargetOutcome {
    pub path: PathBuf,
    pub status: TargetStatus,
    /// Combined stdout and stderr.
    pub output: String,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TargetStatus::Success)
    }
}

/// Runs the executables in a script directory for every matched event.
pub struct TargetRunner {
    script_dir: PathBuf,
}

impl TargetRunner {
    pub fn new<P: Into<PathBuf>>(script_dir: P) -> Self {
        TargetRunner {
            script_dir: script_dir.into(),
        }
    }

    pub fn script_dir(&self) -> &Path {
        &self.script_dir
    }

    /// Executable files in the script directory, sorted by path. The listing is
    /// taken fresh on every call.
    pub fn discover(&self) -> io::Result<Vec<PathBuf>> {
        let mut targets = Vec::new();
        for entry in fs::read_dir(&self.script_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                continue;
            }
            if access(&path, AccessFlags::X_OK).is_ok() {
                targets.push(path);
            }
        }
        targets.sort();
        Ok(targets)
    }

    /// Runs every target in order with `value` as its only argument. Each one is
    /// awaited before the next starts and a failure never stops the rest.
    pub fn run(&self, value: i32) -> Vec<TargetOutcome> {
        let targets = match self.discover() {
            Ok(targets) => targets,
            Err(e) => {
                error!(scriptdir = %self.script_dir.display(), error = %e, "could not list targets");
                return Vec::new();
            }
        };
        let arg = value.to_string();
        targets
            .into_iter()
            .map(|path| {
                let outcome = run_target(path, &arg);
                report(&outcome);
                outcome
            })
            .collect()
    }
}

fn run_target(path: PathBuf, arg: &str) -> TargetOutcome {
    match spawn_and_wait(&path, arg) {
        Ok((status, output)) => TargetOutcome {
            path,
            status: if status.success() {
                TargetStatus::Success
            } else {
                TargetStatus::Failed(status)
            },
            output,
        },
        Err(e) => TargetOutcome {
            path,
            status: TargetStatus::SpawnFailed(e),
            output: String::new(),
        },
    }
}

fn spawn_and_wait(path: &Path, arg: &str) -> io::Result<(ExitStatus, String)> {
    let (mut recv, send) = io::pipe()?;
    let mut child = Command::new(path)
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(send.try_clone()?)
        .stderr(send)
        .spawn()?;
    let mut output = Vec::new();
    let read = recv.read_to_end(&mut output);
    let status = child.wait()?;
    read?;
    Ok((status, String::from_utf8_lossy(&output).into_owned()))
}

fn report(outcome: &TargetOutcome) {
    let script = outcome.path.display();
    match outcome.status {
        TargetStatus::Success => {
            debug!(script = %script, "target finished");
        }
        TargetStatus::Failed(status) => {
            match status.code() {
                Some(code) => warn!(script = %script, code, "target failed"),
                None => warn!(script = %script, signal = ?status.signal(), "target killed by signal"),
            }
        }
        TargetStatus::SpawnFailed(ref e) => {
            warn!(script = %script, error = %e, "target could not be started");
        }
    }
    if !outcome.is_success() && !outcome.output.is_empty() {
        debug!(script = %script, output = %outcome.output.trim_end(), "target output");
    }
}
