//! Tracing setup.
//!
//! A compact layer on stderr plus, for runs, a plain-text layer appended to
//! the entity's log file. The terminal shows warnings only unless `-v` is
//! given; per-case lines come from the progress reporter. The file always
//! records the per-case events. `RUST_LOG` overrides the terminal level.

use crate::config::{CliConfig, Verbosity};
use crate::error::CliResult;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter from `RUST_LOG`, falling back to the verbosity default
fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()))
}

/// The log file is at least as detailed as `info`
fn file_filter(verbosity: Verbosity) -> EnvFilter {
    let level = if verbosity.is_verbose() {
        verbosity.log_filter()
    } else {
        "info"
    };
    EnvFilter::new(level)
}

/// Install the global subscriber.
///
/// With `log_file`, events are also appended to that file without colors.
/// Returns `false` when a subscriber was already installed; the existing one
/// stays in place.
pub fn init_logging(config: &CliConfig, log_file: Option<&Path>) -> CliResult<bool> {
    let terminal_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.color.should_color())
        .with_target(false)
        .compact()
        .with_filter(env_filter(config.verbosity));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(file_filter(config.verbosity)),
            )
        }
        None => None,
    };

    match tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => Ok(true),
        Err(e) => {
            debug!("tracing subscriber already installed: {e}");
            Ok(false)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libro_tests.log");
        init_logging(&CliConfig::new(), Some(&path)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_second_init_keeps_existing_subscriber() {
        let _ = init_logging(&CliConfig::new(), None).unwrap();
        assert!(!init_logging(&CliConfig::new(), None).unwrap());
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let result = init_logging(&CliConfig::new(), Some(Path::new("/nonexistent/dir/x.log")));
        assert!(result.is_err());
    }
}
