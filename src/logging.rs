use std::io::{self, IsTerminal};

use tracing::{Dispatch, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::registry::{LookupSpan, Registry};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

use crate::args::LogOptions;
use crate::err::DockError;

fn default_level(verbosity: usize) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Compact human-readable lines; colored only when `ansi` is set.
fn console_layer<S, W>(writer: W, ansi: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .compact()
}

/// Builds the logging collaborator handed to the dispatcher.
///
/// Output goes to stderr, and to `opts.file` without rotation when that is set.
/// A detached daemon keeps only the file, as its stderr is /dev/null. `RUST_LOG` overrides the level picked by `-v`.
/// Nothing is installed as the global default; callers scope it with
/// `tracing::dispatcher::with_default`.
pub fn build(opts: &LogOptions) -> Result<Dispatch, DockError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(opts.verbosity)));

    let console =
        console_layer::<Layered<EnvFilter, Registry>, _>(io::stderr, io::stderr().is_terminal());

    let file_layer = match opts.file {
        Some(ref path) => {
            let name = path
                .file_name()
                .ok_or_else(|| DockError::Log(format!("{} is not a file path", path.display())))?;
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => std::path::Path::new("."),
            };
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(name.to_string_lossy())
                .build(dir)
                .map_err(|e| DockError::Log(format!("{}: {}", path.display(), e)))?;
            Some(
                fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer);
    Ok(Dispatch::new(subscriber))
}
