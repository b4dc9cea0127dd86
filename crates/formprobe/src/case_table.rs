//! Case-table loading.
//!
//! A case table is a CSV export with one row per case: an identifier column,
//! an expected-outcome column and one column per form field. Rows without an
//! identifier are spacer rows and are skipped.

use crate::classifier::Verdict;
use crate::config::TableLayout;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

const BOM: char = '\u{feff}';

/// One raw cell bound to its column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Column header as written in the table
    pub column: String,
    /// Raw cell text, still encoded
    pub raw: String,
}

impl FieldValue {
    /// Create a field value
    #[must_use]
    pub fn new(column: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            raw: raw.into(),
        }
    }
}

/// One row of the case table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Case identifier, unique within a run
    pub case_id: String,
    /// Field cells in column order
    pub field_values: Vec<FieldValue>,
    /// Outcome the case expects
    pub expected: Verdict,
}

impl TestCase {
    /// Raw cell for a column (case-insensitive)
    #[must_use]
    pub fn raw(&self, column: &str) -> Option<&str> {
        self.field_values
            .iter()
            .find(|v| v.column.eq_ignore_ascii_case(column.trim()))
            .map(|v| v.raw.as_str())
    }
}

/// Cases loaded from one table, in table order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseTable {
    /// Cases with an identifier
    pub cases: Vec<TestCase>,
    /// Rows skipped for lacking an identifier
    pub skipped_rows: usize,
}

impl CaseTable {
    /// Load a CSV case table from disk
    pub fn from_path(path: &Path, layout: &TableLayout) -> ProbeResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            ProbeError::case_table(format!("cannot open {}: {e}", path.display()))
        })?;
        Self::from_reader(file, layout)
    }

    /// Load a CSV case table from any reader
    pub fn from_reader<R: Read>(reader: R, layout: &TableLayout) -> ProbeResult<Self> {
        let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = csv
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches(BOM).trim().to_string())
            .collect();

        let id_index = find_column(&headers, &layout.case_id_column)?;
        let expected_index = find_column(&headers, &layout.expected_column)?;

        let mut table = Self::default();
        for record in csv.records() {
            let record = record?;
            let case_id = record.get(id_index).unwrap_or_default().trim();
            if case_id.is_empty() {
                table.skipped_rows += 1;
                continue;
            }

            let expected_label = record.get(expected_index).unwrap_or_default();
            let expected: Verdict = expected_label
                .parse()
                .map_err(|e| ProbeError::case_table(format!("case {case_id}: {e}")))?;

            let field_values = headers
                .iter()
                .enumerate()
                .filter(|(i, header)| {
                    *i != id_index
                        && *i != expected_index
                        && !header.is_empty()
                        && !layout.is_ignored(header)
                })
                .map(|(i, header)| FieldValue::new(header, record.get(i).unwrap_or_default()))
                .collect();

            table.cases.push(TestCase {
                case_id: case_id.to_string(),
                field_values,
                expected,
            });
        }

        table.ensure_unique_ids()?;
        Ok(table)
    }

    /// Number of runnable cases
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the table has no runnable case
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    fn ensure_unique_ids(&self) -> ProbeResult<()> {
        let mut seen = std::collections::HashSet::new();
        for case in &self.cases {
            if !seen.insert(case.case_id.as_str()) {
                return Err(ProbeError::case_table(format!(
                    "duplicate case identifier '{}'",
                    case.case_id
                )));
            }
        }
        Ok(())
    }
}

fn find_column(headers: &[String], wanted: &str) -> ProbeResult<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(wanted.trim()))
        .ok_or_else(|| {
            ProbeError::case_table(format!(
                "missing column '{wanted}' (found: {})",
                headers.join(", ")
            ))
        })
}
