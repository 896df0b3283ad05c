use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::evdev::EVENT_SIZE;

/// Failure to turn raw bytes into an `InputEvent`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("input event record must be {} bytes, got {0}", EVENT_SIZE)]
    Length(usize),
    #[error("host struct input_event is {0} bytes, this build decodes {}", EVENT_SIZE)]
    Layout(usize),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not load config file {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },
    #[error("config key `{0}` is required")]
    MissingKey(&'static str),
    #[error("one of `device` or `devicename` is required")]
    MissingDevice,
    #[error("config key `{key}` has invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("config key `{key}` must be an absolute path, got {value:?}")]
    RelativePath { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum DockError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Usage(String),
    #[error("no input device named {0:?} found")]
    DeviceNotFound(String),
    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("event stream ended after {0} of {} bytes", EVENT_SIZE)]
    ShortRead(usize),
    #[error("event stream read failed: {0}")]
    Read(#[source] io::Error),
    #[error(transparent)]
    Decode(#[from] CodecError),
    #[error("could not detach from the terminal: {0}")]
    Daemon(#[source] nix::Error),
    #[error("pid file {0} is locked by another instance")]
    PidLocked(PathBuf),
    #[error("pid file {path}: {source}")]
    PidFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not set up logging: {0}")]
    Log(String),
}
