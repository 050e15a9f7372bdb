use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mzroier::{MZRoier, MZRoierError};

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Log to STDERR and, when given, to `log_file`. The returned guard must outlive
/// the program's last log message.
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, MZRoierError> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(fs::File::create(path)?);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).with_filter(
                EnvFilter::builder()
                    .with_default_directive(tracing::Level::DEBUG.into())
                    .from_env_lossy(),
            );
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer().compact().with_writer(io::stderr).with_filter(
                EnvFilter::builder()
                    .with_default_directive(tracing::Level::INFO.into())
                    .from_env_lossy(),
            ),
        )
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| MZRoierError::LoggingError(e.to_string()))?;
    tracing_log::LogTracer::init().map_err(|e| MZRoierError::LoggingError(e.to_string()))?;
    Ok(guard)
}

fn main() -> Result<(), MZRoierError> {
    let args = MZRoier::from_command_line()?;
    let _guard = init_logging(args.log_file.as_deref())?;
    args.main()
}
