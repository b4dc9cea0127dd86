//! Formprobe: data-driven black-box testing of web-form validation
//!
//! A case table lists input values for a form's fields and the outcome the
//! application should produce. Formprobe fills the live form with each row,
//! submits it, watches what the page does and reports which rows behaved as
//! expected.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    FORMPROBE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Case table │    │ Case       │    │ FormDriver │            │
//! │   │ (CSV)      │───►│ Executor   │───►│ (chromium) │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │         ▲                 │                                      │
//! │   ┌─────┴──────┐    ┌─────▼──────┐    ┌────────────┐            │
//! │   │ Entity     │    │ Classifier │───►│ Report     │            │
//! │   │ (YAML)     │    │            │    │ sinks      │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

mod browser;
mod case_table;
mod classifier;
mod codec;
mod config;
mod driver;
mod executor;
mod reporter;
mod result;
mod rules;
mod runner;
mod schema;

pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::ChromiumFormDriver;
pub use case_table::{CaseTable, FieldValue, TestCase};
pub use classifier::{classify, ObservedOutcome, Outcome, UnknownVerdict, Verdict};
pub use codec::decode;
pub use config::{
    preset_names, EntityConfig, ReportFiles, SuccessView, TableLayout, Timeouts,
    DEFAULT_BASE_URL, DEFAULT_WAIT_TIMEOUT_MS,
};
pub use driver::{FormDriver, MockFailure, MockFormDriver, MockResponse, MockStep};
pub use executor::{CaseExecutor, FieldAssignment, TestResult};
pub use reporter::{
    log_summary, summary_lines, write_csv, CsvReportSink, JsonReportSink, ReportSink, CSV_HEADER,
};
pub use result::{ProbeError, ProbeResult};
pub use rules::{audit_case, CaseAudit, FieldFinding, RuleViolation, ValidationRule};
pub use runner::{FormRunner, NoopObserver, RunObserver, RunReport, RunSummary};
pub use schema::{ErrorProbe, FieldKind, FieldSchema, FieldSpec};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::browser::*;
    pub use super::case_table::*;
    pub use super::classifier::*;
    pub use super::codec::*;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::executor::*;
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::rules::*;
    pub use super::runner::*;
    pub use super::schema::*;
}
