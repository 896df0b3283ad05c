use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process;

use getopts::Options;
use ini::{Ini, Properties};

use crate::err::{ConfigError, DockError};

const PID_DIR: &str = "/run";
const LOG_DIR: &str = "/var/log";

/// Where the input device comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSpec {
    Path(PathBuf),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub device: DeviceSpec,
    pub event_type: u16,
    pub event_code: u16,
    pub script_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub verbosity: usize,
    /// Always set once detached, since stderr then points at /dev/null.
    pub file: Option<PathBuf>,
}

pub struct PArgs {
    pub config: Config,
    pub foreground: bool,
    pub pidfile: PathBuf,
    pub log: LogOptions,
}

fn options() -> Options {
    let mut options = Options::new();
    options
        .reqopt("c", "conf", "Path to config file", "CONFIG_PATH")
        .optflag("i", "no-daemon", "Stay in the foreground")
        .optopt("p", "pidfile", "Path to pid file", "PID_PATH")
        .optopt("l", "log", "Log to this file, default /var/log/<name>.log when detached", "LOG_PATH")
        .optflagmulti("v", "verbose", "More log output, repeat for more")
        .optflag("h", "help", "Help text");
    options
}

pub fn parse_args() -> Result<PArgs, DockError> {
    let argv = env::args().collect::<Vec<_>>();
    let program = argv.first().map(|s| s.as_str()).unwrap_or("dockdetect");
    let options = options();
    let usage = options.usage(&format!("USAGE: {} -c CONFIG_PATH [OPTIONS]", program));

    if argv.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        println!("{}", usage);
        process::exit(0);
    }

    parse_from(&options, program, &argv[1..])
        .map_err(|e| match e {
            DockError::Usage(msg) => DockError::Usage(format!("{}\n{}", msg, usage)),
            e => e,
        })
}

fn parse_from(options: &Options, program: &str, args: &[String]) -> Result<PArgs, DockError> {
    let matches = options
        .parse(args)
        .map_err(|e| DockError::Usage(e.to_string()))?;
    if !matches.free.is_empty() {
        return Err(DockError::Usage(format!(
            "unexpected argument {:?}",
            matches.free[0]
        )));
    }

    let config_path = matches
        .opt_str("c")
        .ok_or_else(|| DockError::Usage("-c CONFIG_PATH is required".to_string()))?;
    let config = parse_config(&config_path)?;

    let pidfile = matches
        .opt_str("p")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_pidfile(program));

    let foreground = matches.opt_present("i");
    let log_file = match matches.opt_str("l") {
        Some(path) => Some(PathBuf::from(path)),
        None if foreground => None,
        None => Some(default_logfile(program)),
    };

    Ok(PArgs {
        config,
        foreground,
        pidfile,
        log: LogOptions {
            verbosity: matches.opt_count("v"),
            file: log_file,
        },
    })
}

fn program_stem(program: &str) -> &OsStr {
    Path::new(program)
        .file_stem()
        .unwrap_or_else(|| OsStr::new("dockdetect"))
}

/// `/run/<program>`, named after the executable without its extension.
pub fn default_pidfile(program: &str) -> PathBuf {
    Path::new(PID_DIR).join(program_stem(program))
}

/// `/var/log/<program>.log`, where a detached daemon logs without `-l`.
pub fn default_logfile(program: &str) -> PathBuf {
    Path::new(LOG_DIR)
        .join(program_stem(program))
        .with_extension("log")
}

pub fn parse_config<P: AsRef<Path>>(config_path: P) -> Result<Config, DockError> {
    let config_path = config_path.as_ref();
    let ini = Ini::load_from_file(config_path).map_err(|source| ConfigError::Load {
        path: config_path.to_path_buf(),
        source,
    })?;
    Ok(parse_ini(&ini)?)
}

/// Reads the section-less keys of a loaded config file.
pub fn parse_ini(ini: &Ini) -> Result<Config, ConfigError> {
    let props = ini.general_section();
    Ok(Config {
        device: parse_device(props)?,
        event_type: parse_number(props, "eventtype")?,
        event_code: parse_number(props, "eventcode")?,
        script_dir: absolute_path(props, "scriptdir")?,
    })
}

fn parse_device(props: &Properties) -> Result<DeviceSpec, ConfigError> {
    if props.contains_key("device") {
        return Ok(DeviceSpec::Path(absolute_path(props, "device")?));
    }
    match props.get("devicename").map(str::trim) {
        Some(name) if !name.is_empty() => Ok(DeviceSpec::Name(name.to_string())),
        Some(name) => Err(ConfigError::InvalidValue {
            key: "devicename",
            value: name.to_string(),
        }),
        None => Err(ConfigError::MissingDevice),
    }
}

fn parse_number(props: &Properties, key: &'static str) -> Result<u16, ConfigError> {
    let value = props.get(key).ok_or(ConfigError::MissingKey(key))?.trim();
    parse_int(value).ok_or_else(|| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Decimal, or hex with a `0x` prefix as event codes are usually written.
fn parse_int(value: &str) -> Option<u16> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => value.parse::<u16>().ok(),
    }
}

fn absolute_path(props: &Properties, key: &'static str) -> Result<PathBuf, ConfigError> {
    let value = props.get(key).ok_or(ConfigError::MissingKey(key))?.trim();
    let path = PathBuf::from(value);
    if value.is_empty() || !path.is_absolute() {
        return Err(ConfigError::RelativePath {
            key,
            value: value.to_string(),
        });
    }
    Ok(path)
}
