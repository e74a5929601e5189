//! Log output for the command line tool.

use std::{fs::OpenOptions, path::Path, sync::Arc};

use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::Error;

/// Install the global tracing subscriber.
///
/// Human readable logs go to stderr so that command output on stdout stays
/// machine readable. The level is taken from `RUST_LOG` and defaults to
/// `info`. When `log_file` is given, everything at debug level and above is
/// also appended to that file.
///
/// # Errors
/// Returns [Error::IoError] if the log file cannot be opened and
/// [Error::LoggingError] if a subscriber has already been installed.
pub fn setup_logging(log_file: Option<&Path>) -> Result<(), Error> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let debug_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_log)
        .with(debug_log)
        .try_init()
        .map_err(|error| Error::LoggingError(error.to_string()))
}
