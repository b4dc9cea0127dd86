//! Output formatting and progress reporting

use console::{style, Style, Term};
use formprobe::{CaseAudit, RunObserver, RunReport, TestCase, TestResult};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporter for a run
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` cases
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn write_line(&self, line: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.println(line);
        } else {
            let _ = self.term.write_line(line);
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };

        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        self.write_line("");
        self.write_line(&styled);
    }

    /// Print the run summary and the failed cases
    pub fn summary(&self, report: &RunReport) {
        if self.quiet && report.all_passed() {
            return;
        }

        let lines = formprobe::summary_lines(report);
        let _ = self.term.write_line("");

        if !self.use_color {
            for line in &lines {
                let _ = self.term.write_line(line);
            }
            return;
        }

        let passed_style = Style::new().green().bold();
        let failed_style = Style::new().red().bold();
        let status = if report.all_passed() {
            passed_style.apply_to("PASSED")
        } else {
            failed_style.apply_to("FAILED")
        };
        let _ = self.term.write_line(&format!(
            "{status} {} cases in {:.2}s",
            report.summary.total,
            report.duration.as_secs_f64()
        ));
        for line in &lines {
            let styled = if line.starts_with("Passed:") {
                passed_style.apply_to(line).to_string()
            } else if line.starts_with("Failed:") && report.summary.failed > 0 {
                failed_style.apply_to(line).to_string()
            } else {
                line.clone()
            };
            let _ = self.term.write_line(&styled);
        }
    }

    /// Print one rule-audit disagreement
    pub fn audit_disagreement(&self, audit: &CaseAudit) {
        self.warning(&format!(
            "{}: expected {}, documented rules predict {}",
            audit.case_id, audit.expected, audit.predicted
        ));
        if self.quiet {
            return;
        }
        for finding in &audit.findings {
            let message = finding
                .message
                .clone()
                .unwrap_or_else(|| finding.violation.to_string());
            self.write_line(&format!("    {}: {message}", finding.field));
        }
    }
}

impl RunObserver for ProgressReporter {
    fn case_started(&mut self, _index: usize, _total: usize, case: &TestCase) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(case.case_id.clone());
        }
    }

    fn case_finished(&mut self, result: &TestResult) {
        let line = format!(
            "{} expected={} actual={} ({:.1}s)",
            result.case_id,
            result.expected,
            result.actual,
            result.duration.as_secs_f64()
        );
        if result.passed {
            self.success(&line);
        } else {
            self.failure(&format!("{line}: {}", result.note));
        }
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reporter() {
        let reporter = ProgressReporter::default();
        assert!(reporter.use_color);
        assert!(!reporter.quiet);
    }

    #[test]
    fn test_quiet_reporter_has_no_progress_bar() {
        let mut reporter = ProgressReporter::new(false, true);
        reporter.start_progress(10, "libro");
        assert!(reporter.progress_bar.is_none());
    }

    #[test]
    fn test_progress_bar_advances_per_case() {
        let mut reporter = ProgressReporter::new(false, false);
        reporter.start_progress(2, "libro");
        let result = TestResult {
            case_id: "CP-01".to_string(),
            expected: formprobe::Verdict::Accepted,
            actual: formprobe::Outcome::Accepted,
            passed: true,
            field_errors: std::collections::BTreeMap::new(),
            note: String::new(),
            duration: std::time::Duration::from_millis(10),
        };
        reporter.case_finished(&result);
        assert_eq!(reporter.progress_bar.as_ref().unwrap().position(), 1);
        reporter.finish();
    }
}
