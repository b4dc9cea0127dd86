//! Report sinks.
//!
//! The CSV sink writes one row per case (`caso, expected, actual, passed,
//! notes`) in execution order. The JSON sink keeps everything, field errors
//! and timing included.

use crate::result::ProbeResult;
use crate::runner::RunReport;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Header of the CSV report
pub const CSV_HEADER: [&str; 5] = ["caso", "expected", "actual", "passed", "notes"];

/// Destination for a finished run
pub trait ReportSink {
    /// Persist the report
    fn write(&self, report: &RunReport) -> ProbeResult<()>;

    /// Where the report goes
    fn target(&self) -> &Path;
}

/// Tabular CSV report
#[derive(Debug, Clone)]
pub struct CsvReportSink {
    path: PathBuf,
}

impl CsvReportSink {
    /// Create a sink writing to `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for CsvReportSink {
    fn write(&self, report: &RunReport) -> ProbeResult<()> {
        let file = File::create(&self.path)?;
        write_csv(BufWriter::new(file), report)?;
        info!(path = %self.path.display(), rows = report.results.len(), "CSV report written");
        Ok(())
    }

    fn target(&self) -> &Path {
        &self.path
    }
}

/// Write the CSV report to any writer
pub fn write_csv<W: Write>(writer: W, report: &RunReport) -> ProbeResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for result in &report.results {
        csv.write_record([
            result.case_id.as_str(),
            result.expected.label(),
            result.actual.label(),
            result.status_label(),
            result.note.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Full JSON report
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    path: PathBuf,
}

impl JsonReportSink {
    /// Create a sink writing to `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for JsonReportSink {
    fn write(&self, report: &RunReport) -> ProbeResult<()> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;
        info!(path = %self.path.display(), "JSON report written");
        Ok(())
    }

    fn target(&self) -> &Path {
        &self.path
    }
}

/// Summary block: totals with one-decimal percentages, then the failed cases
#[must_use]
pub fn summary_lines(report: &RunReport) -> Vec<String> {
    let summary = &report.summary;
    let mut lines = vec![
        format!("Entity: {}", report.entity),
        format!("Total cases: {}", summary.total),
        format!("Passed: {} ({:.1}%)", summary.passed, summary.pass_rate),
        format!("Failed: {} ({:.1}%)", summary.failed, summary.fail_rate()),
        format!("Duration: {:.2}s", report.duration.as_secs_f64()),
    ];

    if summary.failed > 0 {
        lines.push(String::new());
        lines.push("Failed cases:".to_string());
        for result in report.failures() {
            lines.push(format!(
                "  - {}: expected={}, actual={}",
                result.case_id, result.expected, result.actual
            ));
            lines.push(format!("    notes: {}", result.note));
        }
    }
    lines
}

/// Emit the summary block through tracing
pub fn log_summary(report: &RunReport) {
    for line in summary_lines(report) {
        if !line.is_empty() {
            info!("{line}");
        }
    }
}
