//! Command orchestration: load the entity and table, drive the run, write
//! the reports and map the outcome to an exit status.

use crate::commands::{CheckArgs, RunArgs, SchemaArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::logging::init_logging;
use crate::output::ProgressReporter;
use formprobe::{
    audit_case, log_summary, preset_names, BrowserConfig, CaseTable, CsvReportSink, EntityConfig,
    FormRunner, JsonReportSink, ReportSink, RunReport,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// How a completed command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every case passed, or nothing needed checking
    AllPassed,
    /// The run finished with at least one mismatch or errored case
    AssertionsFailed,
}

impl RunStatus {
    /// Process exit code for this status
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::AllPassed => 0,
            Self::AssertionsFailed => 1,
        }
    }
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        Self::from(status.exit_code())
    }
}

/// Exit code for a command that could not execute
pub const EXECUTION_FAILED: u8 = 2;

/// Executes CLI commands
#[derive(Debug)]
pub struct CommandRunner {
    config: CliConfig,
    reporter: ProgressReporter,
}

impl CommandRunner {
    /// Create a new command runner
    #[must_use]
    pub fn new(config: CliConfig) -> Self {
        let reporter =
            ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
        Self { config, reporter }
    }

    /// `run`: execute a case table in the browser
    pub fn run(&mut self, args: &RunArgs) -> CliResult<RunStatus> {
        let entity = resolve_entity(args)?;
        let log_file = args
            .log_file
            .clone()
            .or_else(|| entity.report.log.as_ref().map(PathBuf::from));
        init_logging(&self.config, log_file.as_deref())?;

        let table = CaseTable::from_path(&args.cases, &entity.table)?;
        info!(
            entity = %entity.name,
            cases = table.len(),
            url = %entity.create_url(),
            "starting run"
        );
        self.reporter.header(&format!(
            "Formprobe: {} ({} cases) against {}",
            entity.name,
            table.len(),
            entity.create_url()
        ));
        if table.skipped_rows > 0 {
            self.reporter.info(&format!(
                "skipped {} rows without a case identifier",
                table.skipped_rows
            ));
        }

        let browser = browser_config(args);
        let rt = tokio::runtime::Runtime::new().map_err(|e| {
            CliError::test_execution(format!("failed to start async runtime: {e}"))
        })?;

        self.reporter.start_progress(table.len() as u64, &entity.name);
        let outcome = rt.block_on(execute(&entity, &table, browser, &mut self.reporter));
        self.reporter.finish();
        let report = outcome?;

        self.write_reports(&entity, args, &report)?;
        log_summary(&report);
        self.reporter.summary(&report);

        Ok(if report.all_passed() {
            RunStatus::AllPassed
        } else {
            RunStatus::AssertionsFailed
        })
    }

    fn write_reports(
        &self,
        entity: &EntityConfig,
        args: &RunArgs,
        report: &RunReport,
    ) -> CliResult<()> {
        let csv_path = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&entity.report.csv));
        let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(CsvReportSink::new(csv_path))];

        let json_path = args
            .json
            .clone()
            .or_else(|| entity.report.json.as_ref().map(PathBuf::from));
        if let Some(path) = json_path {
            sinks.push(Box::new(JsonReportSink::new(path)));
        }

        for sink in &sinks {
            sink.write(report)?;
            self.reporter
                .info(&format!("results saved to {}", sink.target().display()));
        }
        Ok(())
    }

    /// `check`: validate the table against the schema and audit the rules
    pub fn check(&self, args: &CheckArgs) -> CliResult<RunStatus> {
        init_logging(&self.config, None)?;
        let entity = args.target.load()?;
        let table = CaseTable::from_path(&args.cases, &entity.table)?;
        FormRunner::new(&entity).preflight(&table)?;

        self.reporter.header(&format!(
            "Formprobe check: {} ({} cases)",
            entity.name,
            table.len()
        ));

        let mut disagreements = 0usize;
        for case in &table.cases {
            let audit = audit_case(case, &entity.fields)?;
            if !audit.agrees() {
                disagreements += 1;
                self.reporter.audit_disagreement(&audit);
            }
        }

        let message = format!(
            "{} cases match the schema; {} agree with the documented rules, {} disagree",
            table.len(),
            table.len() - disagreements,
            disagreements
        );
        if disagreements == 0 {
            self.reporter.success(&message);
        } else {
            self.reporter.warning(&message);
        }
        Ok(RunStatus::AllPassed)
    }

    /// `entities`: list the presets
    pub fn list_entities(&self) -> CliResult<()> {
        for name in preset_names() {
            let entity = EntityConfig::preset(name)?;
            println!(
                "{name:<10} {:<18} {} fields",
                entity.create_path,
                entity.fields.len()
            );
        }
        Ok(())
    }

    /// `schema <preset>`: print a preset descriptor
    pub fn print_schema(&self, args: &SchemaArgs) -> CliResult<()> {
        let entity = EntityConfig::preset(&args.preset)?;
        print!("{}", entity.to_yaml()?);
        Ok(())
    }
}

fn resolve_entity(args: &RunArgs) -> CliResult<EntityConfig> {
    let mut entity = args.target.load()?;
    if let Some(ref base_url) = args.base_url {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CliError::config(format!(
                "base URL must start with http:// or https://, got '{base_url}'"
            )));
        }
        entity = entity.with_base_url(base_url.clone());
    }
    let timeouts = args.timeouts.apply(entity.timeouts);
    Ok(entity.with_timeouts(timeouts))
}

fn browser_config(args: &RunArgs) -> BrowserConfig {
    let mut config = BrowserConfig::default().with_headless(args.headless);
    if let Some(ref path) = args.chromium_path {
        config = config.with_chromium_path(path.clone());
    }
    if args.no_sandbox {
        config = config.with_no_sandbox();
    }
    config
}

#[cfg(feature = "browser")]
async fn execute(
    entity: &EntityConfig,
    table: &CaseTable,
    browser: BrowserConfig,
    reporter: &mut ProgressReporter,
) -> CliResult<RunReport> {
    use formprobe::ChromiumFormDriver;

    let timeouts = entity.timeouts;
    let report = FormRunner::new(entity)
        .run_session(
            table,
            || ChromiumFormDriver::launch(browser, timeouts),
            reporter,
        )
        .await?;
    Ok(report)
}

#[cfg(not(feature = "browser"))]
async fn execute(
    entity: &EntityConfig,
    table: &CaseTable,
    _browser: BrowserConfig,
    _reporter: &mut ProgressReporter,
) -> CliResult<RunReport> {
    FormRunner::new(entity).preflight(table)?;
    Err(CliError::test_execution(
        "browser support not compiled in; rebuild with --features browser",
    ))
}
