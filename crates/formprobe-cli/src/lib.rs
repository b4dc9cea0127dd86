//! Formprobe CLI Library
//!
//! Command-line interface for running form-validation case tables.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{CheckArgs, Cli, ColorArg, Commands, EntityArgs, RunArgs, SchemaArgs, TimeoutArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_logging;
pub use output::ProgressReporter;
pub use runner::{CommandRunner, RunStatus, EXECUTION_FAILED};
