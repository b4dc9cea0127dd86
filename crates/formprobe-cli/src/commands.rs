//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use formprobe::{EntityConfig, Timeouts};
use std::path::PathBuf;

use crate::error::{CliError, CliResult};

/// Formprobe: data-driven black-box testing of web-form validation
#[derive(Parser, Debug)]
#[command(name = "formprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a case table against the live form
    Run(RunArgs),

    /// Check a case table against the schema and audit the documented rules
    Check(CheckArgs),

    /// List the built-in entity presets
    Entities,

    /// Print a preset's descriptor as YAML
    Schema(SchemaArgs),
}

/// Which entity the cases target
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct EntityArgs {
    /// Built-in entity preset (libro, ejemplar, lector)
    #[arg(short, long)]
    pub entity: Option<String>,

    /// Entity descriptor file (YAML)
    #[arg(long, value_name = "FILE")]
    pub schema: Option<PathBuf>,
}

impl EntityArgs {
    /// Load the selected entity descriptor
    pub fn load(&self) -> CliResult<EntityConfig> {
        match (&self.entity, &self.schema) {
            (Some(name), None) => Ok(EntityConfig::preset(name)?),
            (None, Some(path)) => Ok(EntityConfig::from_path(path)?),
            _ => Err(CliError::invalid_argument(
                "exactly one of --entity or --schema is required",
            )),
        }
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Target entity
    #[command(flatten)]
    pub target: EntityArgs,

    /// Case table (CSV)
    #[arg(short, long, value_name = "FILE")]
    pub cases: PathBuf,

    /// Application base URL
    #[arg(long, env = "FORMPROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// CSV report path (defaults to the entity's report file)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write a JSON report
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Log file path (defaults to the entity's log file)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Run the browser headless
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub headless: bool,

    /// Path to the chromium binary
    #[arg(long, value_name = "PATH")]
    pub chromium_path: Option<String>,

    /// Disable the chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Timeout overrides
    #[command(flatten)]
    pub timeouts: TimeoutArgs,
}

/// Per-operation timeout overrides, in milliseconds
#[derive(Args, Debug, Clone, Default)]
pub struct TimeoutArgs {
    /// Navigation timeout
    #[arg(long, value_name = "MS")]
    pub navigation_timeout: Option<u64>,

    /// Element lookup timeout
    #[arg(long, value_name = "MS")]
    pub element_timeout: Option<u64>,

    /// Post-submit settle timeout
    #[arg(long, value_name = "MS")]
    pub settle_timeout: Option<u64>,

    /// Fixed delay after clicking submit
    #[arg(long, value_name = "MS")]
    pub settle_delay: Option<u64>,

    /// Pause between cases
    #[arg(long, value_name = "MS")]
    pub case_delay: Option<u64>,
}

impl TimeoutArgs {
    /// Apply the overrides on top of `base`
    #[must_use]
    pub fn apply(&self, base: Timeouts) -> Timeouts {
        Timeouts {
            navigation_ms: self.navigation_timeout.unwrap_or(base.navigation_ms),
            element_ms: self.element_timeout.unwrap_or(base.element_ms),
            settle_ms: self.settle_timeout.unwrap_or(base.settle_ms),
            settle_delay_ms: self.settle_delay.unwrap_or(base.settle_delay_ms),
            case_delay_ms: self.case_delay.unwrap_or(base.case_delay_ms),
        }
    }
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Target entity
    #[command(flatten)]
    pub target: EntityArgs,

    /// Case table (CSV)
    #[arg(short, long, value_name = "FILE")]
    pub cases: PathBuf,
}

/// Arguments for the schema command
#[derive(Parser, Debug)]
pub struct SchemaArgs {
    /// Preset name
    pub preset: String,
}

/// Color argument for CLI
#[derive(ValueEnum, Debug, Clone, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
