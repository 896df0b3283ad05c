use std::fs::File;
use std::path::PathBuf;

use tracing::{dispatcher, info, Dispatch};

use crate::args::{Config, DeviceSpec};
use crate::err::DockError;
use crate::evdev::{EvdevStream, InputEvent};
use crate::filter::EvdevFilter;
use crate::resolve::{DeviceResolver, NameQuery};
use crate::targets::TargetRunner;

/// Receives the value of every event that passed the filter.
pub trait Handler {
    fn on_match(&mut self, value: i32);
}

impl Handler for TargetRunner {
    fn on_match(&mut self, value: i32) {
        self.run(value);
    }
}

/// Feeds events through an `EvdevFilter` into a `Handler`.
pub struct Dispatcher<H> {
    filter: EvdevFilter,
    handler: H,
    log: Dispatch,
}

impl<H: Handler> Dispatcher<H> {
    pub fn new(filter: EvdevFilter, handler: H, log: Dispatch) -> Self {
        Dispatcher {
            filter,
            handler,
            log,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Consumes `events` until it ends or yields an error. Non-matching events
    /// are dropped without a trace.
    pub fn dispatch<I>(&mut self, events: I) -> Result<(), DockError>
    where
        I: IntoIterator<Item = Result<InputEvent, DockError>>,
    {
        let log = self.log.clone();
        dispatcher::with_default(&log, || -> Result<(), DockError> {
            info!(
                eventtype = self.filter.event_type(),
                eventcode = self.filter.event_code(),
                "dispatcher started"
            );
            for event in events {
                let event = event?;
                if self.filter.matches(&event) {
                    info!(value = event.event_value(), "event matched");
                    self.handler.on_match(event.event_value());
                }
            }
            Ok(())
        })
    }
}

/// Picks the device node named by the configuration.
pub fn device_path<Q: NameQuery>(
    config: &Config,
    resolver: &DeviceResolver<Q>,
) -> Result<PathBuf, DockError> {
    match config.device {
        DeviceSpec::Path(ref path) => Ok(path.clone()),
        DeviceSpec::Name(ref name) => resolver.resolve(name),
    }
}

/// Resolves and opens the device named by the configuration.
pub fn open_device<Q: NameQuery>(
    config: &Config,
    resolver: &DeviceResolver<Q>,
) -> Result<EvdevStream<File>, DockError> {
    let path = device_path(config, resolver)?;
    EvdevStream::open(&path)
}

/// Opens the device, calls `enter` to set up the process context, then
/// dispatches to the script directory until the device goes away. Device
/// failures surface before `enter` runs. Only ever returns with an error.
pub fn run<Q, F, C>(
    config: &Config,
    resolver: &DeviceResolver<Q>,
    log: Dispatch,
    enter: F,
) -> Result<(), DockError>
where
    Q: NameQuery,
    F: FnOnce() -> Result<C, DockError>,
{
    let stream = dispatcher::with_default(&log, || open_device(config, resolver))?;
    let _context = enter()?;
    let filter = EvdevFilter::new(config.event_type, config.event_code);
    let mut dispatcher = Dispatcher::new(filter, TargetRunner::new(&config.script_dir), log);
    dispatcher.dispatch(stream)
}
