//! Formprobe CLI: data-driven black-box testing of web forms
//!
//! ## Usage
//!
//! ```bash
//! formprobe run --entity libro --cases libro.csv   # Run a case table
//! formprobe check --entity lector --cases lector.csv
//! formprobe entities                              # List presets
//! formprobe schema ejemplar > ejemplar.yaml       # Dump a preset
//! ```
//!
//! Exit codes: 0 every case passed, 1 some case failed, 2 the run could not
//! execute.

use clap::Parser;
use formprobe_cli::{
    Cli, CliConfig, CliResult, ColorChoice, CommandRunner, Commands, RunStatus, Verbosity,
    EXECUTION_FAILED,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(status) => status.into(),
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(hint) = e.hint() {
                eprintln!("  hint: {hint}");
            }
            ExitCode::from(EXECUTION_FAILED)
        }
    }
}

fn run() -> CliResult<RunStatus> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    let mut runner = CommandRunner::new(config);

    match cli.command {
        Commands::Run(args) => runner.run(&args),
        Commands::Check(args) => runner.check(&args),
        Commands::Entities => {
            runner.list_entities()?;
            Ok(RunStatus::AllPassed)
        }
        Commands::Schema(args) => {
            runner.print_schema(&args)?;
            Ok(RunStatus::AllPassed)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new().with_verbosity(verbosity).with_color(color)
}
