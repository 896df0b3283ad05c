//! # dockdetect
//! ## Dock event daemon
//!
//! ### Notes
//! Reads `-c CONFIG_PATH`, opens the input device, detaches unless `-i` is
//! given, and runs until the device goes away.

#![deny(missing_docs)]

use std::process;

use tracing::{dispatcher, error, info, Dispatch};

use dockdetect::args::{self, PArgs};
use dockdetect::daemon;
use dockdetect::err::DockError;
use dockdetect::event;
use dockdetect::logging;
use dockdetect::resolve::DeviceResolver;

fn serve(args: &PArgs, log: &Dispatch) -> Result<(), DockError> {
    info!(
        foreground = args.foreground,
        scriptdir = %args.config.script_dir.display(),
        "dockdetect starting"
    );
    event::run(&args.config, &DeviceResolver::new(), log.clone(), || {
        daemon::enter(args.foreground, &args.pidfile)
    })
}

/// Main function
pub fn main() {
    let args = match args::parse_args() {
        Ok(args) => args,
        Err(e @ DockError::Usage(_)) => {
            eprintln!("{}", e);
            process::exit(2);
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    let log = match logging::build(&args.log) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    let code = dispatcher::with_default(&log, || match serve(&args, &log) {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "dockdetect stopped");
            1
        }
    });
    process::exit(code);
}
