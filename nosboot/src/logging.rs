//! Log output for the launcher.
//!
//! `RUST_LOG` wins when set. Otherwise this crate logs at `debug`, or at
//! `trace` with `--trace`, which includes raw console output.

use nosboot_shared::{NosbootError, NosbootResult};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// File name prefix of rolling log files.
const LOG_FILE_PREFIX: &str = "nosboot.log";

fn default_directives(trace: bool) -> String {
    let level = if trace { "trace" } else { "debug" };
    format!("nosboot={level},nosboot_launch={level},qemu={level},warn")
}

/// Install the global subscriber.
///
/// With `log_dir`, logs are also written to a daily rolling file there. Keep
/// the returned guard alive until exit or buffered lines are lost.
pub fn init_logging(trace: bool, log_dir: Option<&Path>) -> NosbootResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(trace)));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                NosbootError::Config(format!(
                    "Failed to create log directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| NosbootError::Internal(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert!(default_directives(false).starts_with("nosboot=debug"));
        assert!(default_directives(true).contains("qemu=trace"));
        assert!(EnvFilter::try_new(default_directives(true)).is_ok());
    }
}
