//! Run aggregation.
//!
//! A run executes every case of a table in order against one driver session
//! and folds the results into a [`RunReport`]. The session is closed when the
//! run ends, whether the cases finished or a configuration error stopped it.

use crate::case_table::{CaseTable, TestCase};
use crate::config::EntityConfig;
use crate::driver::FormDriver;
use crate::executor::{CaseExecutor, TestResult};
use crate::result::ProbeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Progress callbacks for a run
pub trait RunObserver {
    /// A case is about to run; `index` is zero-based
    fn case_started(&mut self, _index: usize, _total: usize, _case: &TestCase) {}

    /// A case finished
    fn case_finished(&mut self, _result: &TestResult) {}
}

/// Observer that ignores progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Pass/fail counts of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Cases executed
    pub total: usize,
    /// Cases whose outcome matched
    pub passed: usize,
    /// Cases that did not match or errored
    pub failed: usize,
    /// `passed / total * 100`, 0 for an empty run
    pub pass_rate: f64,
}

impl RunSummary {
    /// Summarize a sequence of results
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_results(results: &[TestResult]) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let pass_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };
        Self {
            total,
            passed,
            failed: total - passed,
            pass_rate,
        }
    }

    /// `failed / total * 100`, 0 for an empty run
    #[must_use]
    pub fn fail_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 - self.pass_rate
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Entity under test
    pub entity: String,
    /// When the first case started
    pub started_at: DateTime<Utc>,
    /// Wall time of the whole run
    pub duration: Duration,
    /// One result per case, in table order
    pub results: Vec<TestResult>,
    /// Counts over `results`
    pub summary: RunSummary,
}

impl RunReport {
    /// Results that did not pass
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Whether every case passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }
}

/// Runs a case table for one entity
#[derive(Debug, Clone, Copy)]
pub struct FormRunner<'a> {
    config: &'a EntityConfig,
}

impl<'a> FormRunner<'a> {
    /// Create a runner
    #[must_use]
    pub const fn new(config: &'a EntityConfig) -> Self {
        Self { config }
    }

    /// Check every case against the schema before a browser is started
    pub fn preflight(&self, table: &CaseTable) -> ProbeResult<()> {
        let executor = CaseExecutor::new(self.config);
        for case in &table.cases {
            executor.plan(case)?;
        }
        Ok(())
    }

    /// Run cases in order on an open driver
    pub async fn run_cases<D, O>(
        &self,
        driver: &mut D,
        cases: &[TestCase],
        observer: &mut O,
    ) -> ProbeResult<RunReport>
    where
        D: FormDriver + ?Sized,
        O: RunObserver + ?Sized,
    {
        let executor = CaseExecutor::new(self.config);
        let started_at = Utc::now();
        let start = Instant::now();
        let total = cases.len();

        info!(entity = %self.config.name, cases = total, "starting run");

        let mut results = Vec::with_capacity(total);
        for (index, case) in cases.iter().enumerate() {
            if index > 0 && !self.config.timeouts.case_delay().is_zero() {
                tokio::time::sleep(self.config.timeouts.case_delay()).await;
            }
            observer.case_started(index, total, case);
            let result = executor.execute(driver, case).await?;
            observer.case_finished(&result);
            results.push(result);
        }

        let summary = RunSummary::from_results(&results);
        info!(
            entity = %self.config.name,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            "run finished"
        );

        Ok(RunReport {
            entity: self.config.name.clone(),
            started_at,
            duration: start.elapsed(),
            results,
            summary,
        })
    }

    /// Validate, acquire a session, run every case and release the session.
    ///
    /// `launch` is only called once the table passed [`Self::preflight`].
    pub async fn run_session<D, F, Fut, O>(
        &self,
        table: &CaseTable,
        launch: F,
        observer: &mut O,
    ) -> ProbeResult<RunReport>
    where
        D: FormDriver,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProbeResult<D>>,
        O: RunObserver + ?Sized,
    {
        self.preflight(table)?;
        let mut driver = launch().await?;
        let outcome = self.run_cases(&mut driver, &table.cases, observer).await;
        if let Err(e) = driver.close().await {
            warn!(error = %e, "failed to close browser session");
        }
        outcome
    }
}
