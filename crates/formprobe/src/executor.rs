//! Case executor: one case, end to end.
//!
//! open → seed → fill → submit → observe → classify → compare. A browser
//! failure anywhere in that sequence is recorded as an `Error` outcome for
//! this case only. A case that references a column the schema does not know
//! is a configuration error and propagates.

use crate::case_table::TestCase;
use crate::classifier::{ObservedOutcome, Outcome, Verdict};
use crate::codec::decode;
use crate::config::EntityConfig;
use crate::driver::FormDriver;
use crate::result::{ProbeError, ProbeResult};
use crate::schema::FieldSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Longest value echoed verbatim into the log
const LOG_PREVIEW_CHARS: usize = 50;

/// Result of one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Case identifier
    pub case_id: String,
    /// Outcome the table expected
    pub expected: Verdict,
    /// Outcome observed
    pub actual: Outcome,
    /// `actual == expected`
    pub passed: bool,
    /// Field errors shown after submit
    pub field_errors: BTreeMap<String, String>,
    /// Why the outcome is what it is
    pub note: String,
    /// Wall time spent on the case
    pub duration: Duration,
}

impl TestResult {
    /// Result of a case whose outcome was observed
    #[must_use]
    pub fn observed(case: &TestCase, observed: ObservedOutcome, duration: Duration) -> Self {
        let actual = Outcome::from(observed.verdict());
        let note = observed.note();
        Self {
            case_id: case.case_id.clone(),
            expected: case.expected,
            actual,
            passed: actual == Outcome::from(case.expected),
            field_errors: observed.field_errors,
            note,
            duration,
        }
    }

    /// Result of a case the driver could not complete
    #[must_use]
    pub fn errored(case: &TestCase, cause: &ProbeError, duration: Duration) -> Self {
        Self {
            case_id: case.case_id.clone(),
            expected: case.expected,
            actual: Outcome::Error,
            passed: false,
            field_errors: BTreeMap::new(),
            note: format!("Exception: {cause}"),
            duration,
        }
    }

    /// `PASS` or `FAIL`
    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        if self.passed {
            "PASS"
        } else {
            "FAIL"
        }
    }
}

/// A decoded, translated value bound to its field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignment<'a> {
    /// Target field
    pub field: &'a FieldSpec,
    /// Value the driver applies
    pub value: String,
}

/// Runs single cases against one entity's form
#[derive(Debug, Clone, Copy)]
pub struct CaseExecutor<'a> {
    config: &'a EntityConfig,
}

impl<'a> CaseExecutor<'a> {
    /// Create an executor for an entity
    #[must_use]
    pub const fn new(config: &'a EntityConfig) -> Self {
        Self { config }
    }

    /// Resolve every non-blank cell of a case to a field assignment.
    ///
    /// Fails with a configuration error when a non-blank cell sits in a
    /// column the schema does not know.
    pub fn plan(&self, case: &TestCase) -> ProbeResult<Vec<FieldAssignment<'a>>> {
        let mut plan = Vec::new();
        for cell in &case.field_values {
            let decoded = decode(&cell.raw);
            if decoded.is_empty() {
                continue;
            }
            let field = self.config.fields.resolve(&cell.column).ok_or_else(|| {
                ProbeError::config(format!(
                    "case {}: column '{}' has no field in entity '{}'",
                    case.case_id, cell.column, self.config.name
                ))
            })?;
            plan.push(FieldAssignment {
                field,
                value: field.input_value(&decoded),
            });
        }
        Ok(plan)
    }

    /// Execute one case
    pub async fn execute<D>(&self, driver: &mut D, case: &TestCase) -> ProbeResult<TestResult>
    where
        D: FormDriver + ?Sized,
    {
        let plan = self.plan(case)?;

        info!(
            case_id = %case.case_id,
            expected = %case.expected,
            fields = plan.len(),
            "running case"
        );

        let start = Instant::now();
        let result = match self.drive(driver, &plan).await {
            Ok(observed) => TestResult::observed(case, observed, start.elapsed()),
            Err(e) if e.is_infrastructure() => {
                error!(case_id = %case.case_id, error = %e, "case aborted by driver failure");
                TestResult::errored(case, &e, start.elapsed())
            }
            Err(e) => return Err(e),
        };

        info!(
            case_id = %result.case_id,
            expected = %result.expected,
            actual = %result.actual,
            passed = result.passed,
            note = %result.note,
            "case finished"
        );
        Ok(result)
    }

    async fn drive<D>(&self, driver: &mut D, plan: &[FieldAssignment<'_>]) -> ProbeResult<ObservedOutcome>
    where
        D: FormDriver + ?Sized,
    {
        let config = self.config;

        driver.open(&config.create_url()).await?;

        for field in config.fields.auto_seeded() {
            match driver.select_first_option(&field.selector).await {
                Ok(true) => debug!(field = %field.name, "seeded first option"),
                Ok(false) => warn!(field = %field.name, "no option to seed beyond the placeholder"),
                Err(e) => warn!(field = %field.name, error = %e, "could not seed first option"),
            }
        }

        for assignment in plan {
            debug!(
                field = %assignment.field.name,
                value = %preview(&assignment.value),
                "setting field"
            );
            driver
                .set_field(
                    &assignment.field.selector,
                    assignment.field.kind,
                    &assignment.value,
                )
                .await?;
        }

        driver.submit(&config.submit_selector).await?;

        let field_errors = driver
            .current_errors(&config.fields.error_probes())
            .await?;
        let landed_on_success_view = driver.is_on_success_view(&config.success_view).await;

        Ok(ObservedOutcome {
            field_errors,
            landed_on_success_view,
        })
    }
}

fn preview(value: &str) -> String {
    if value.chars().count() > LOG_PREVIEW_CHARS {
        let head: String = value.chars().take(LOG_PREVIEW_CHARS).collect();
        format!("{head}... ({} chars)", value.chars().count())
    } else {
        value.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::case_table::FieldValue;
    use crate::config::Timeouts;
    use crate::driver::{MockFailure, MockFormDriver, MockResponse, MockStep};

    const INDEX: &str = "http://localhost:5183/Libro/Index";
    const CREATE: &str = "http://localhost:5183/Libro/Create";

    fn libro() -> EntityConfig {
        EntityConfig::preset("libro")
            .unwrap()
            .with_timeouts(Timeouts::immediate())
    }

    fn case(id: &str, cells: &[(&str, &str)], expected: Verdict) -> TestCase {
        TestCase {
            case_id: id.to_string(),
            field_values: cells.iter().map(|(c, v)| FieldValue::new(*c, *v)).collect(),
            expected,
        }
    }

    /// Libro form that enforces the title rule only
    fn libro_app() -> MockFormDriver {
        MockFormDriver::new(|form| match form.get("[data-testid='titulo']") {
            None => MockResponse::stay(CREATE)
                .with_error("[data-testid='titulo-error']", "El título es obligatorio"),
            Some(t) if t.chars().count() > 50 => MockResponse::stay(CREATE).with_error(
                "[data-testid='titulo-error']",
                "El título debe contener entre 1 y 50 caracteres",
            ),
            Some(_) => MockResponse::redirect(INDEX),
        })
    }

    mod plan_tests {
        use super::*;

        #[test]
        fn test_blank_cells_skipped() {
            let config = libro();
            let c = case(
                "CP-01",
                &[("TITULO", "Rayuela"), ("ISBN", "\"\""), ("Sinopsis", "")],
                Verdict::Accepted,
            );
            let plan = CaseExecutor::new(&config).plan(&c).unwrap();
            assert_eq!(plan.len(), 1);
            assert_eq!(plan[0].field.name, "titulo");
        }

        #[test]
        fn test_values_are_decoded() {
            let config = libro();
            let c = case("CP-02", &[("Sinopsis", "\"A\" x 201")], Verdict::Rejected);
            let plan = CaseExecutor::new(&config).plan(&c).unwrap();
            assert_eq!(plan[0].value.len(), 201);
        }

        #[test]
        fn test_unknown_column_with_value_is_config_error() {
            let config = libro();
            let c = case("CP-03", &[("Autor", "Cortázar")], Verdict::Accepted);
            let err = CaseExecutor::new(&config).plan(&c).unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
            assert!(err.to_string().contains("Autor"));
        }

        #[test]
        fn test_unknown_column_left_blank_is_fine() {
            let config = libro();
            let c = case("CP-04", &[("Autor", "")], Verdict::Rejected);
            assert!(CaseExecutor::new(&config).plan(&c).unwrap().is_empty());
        }

        #[test]
        fn test_select_values_translated() {
            let config = EntityConfig::preset("ejemplar").unwrap();
            let c = case("E-01", &[("Disponible", "No Disponible")], Verdict::Accepted);
            let plan = CaseExecutor::new(&config).plan(&c).unwrap();
            assert_eq!(plan[0].value, "false");
        }
    }

    mod execute_tests {
        use super::*;

        #[tokio::test]
        async fn test_valid_case_accepted() {
            let config = libro();
            let mut driver = libro_app();
            let c = case("CP-01", &[("TITULO", "Rayuela")], Verdict::Accepted);

            let result = CaseExecutor::new(&config)
                .execute(&mut driver, &c)
                .await
                .unwrap();

            assert_eq!(result.actual, Outcome::Accepted);
            assert!(result.passed);
            assert!(result.field_errors.is_empty());
            assert!(result.note.contains("creation succeeded"));
            assert!(driver.was_called(&format!("open:{CREATE}")));
        }

        #[tokio::test]
        async fn test_required_field_rejected() {
            let config = libro();
            let mut driver = libro_app();
            let c = case("CP-02", &[("TITULO", "\"\"")], Verdict::Rejected);

            let result = CaseExecutor::new(&config)
                .execute(&mut driver, &c)
                .await
                .unwrap();

            assert_eq!(result.actual, Outcome::Rejected);
            assert!(result.passed);
            assert_eq!(
                result.field_errors.get("titulo").unwrap(),
                "El título es obligatorio"
            );
            assert!(result.note.starts_with("Validation errors: titulo:"));
        }

        #[tokio::test]
        async fn test_boundary_length_rejected() {
            let config = libro();
            let mut driver = libro_app();
            let c = case("CP-03", &[("TITULO", "\"A\" x 51")], Verdict::Rejected);

            let result = CaseExecutor::new(&config)
                .execute(&mut driver, &c)
                .await
                .unwrap();

            assert_eq!(result.actual, Outcome::Rejected);
            assert!(result.passed);
            assert_eq!(
                driver.form.get("[data-testid='titulo']").unwrap().len(),
                51
            );
        }

        #[tokio::test]
        async fn test_expectation_mismatch_fails() {
            let config = libro();
            let mut driver = libro_app();
            let c = case("CP-04", &[("TITULO", "Rayuela")], Verdict::Rejected);

            let result = CaseExecutor::new(&config)
                .execute(&mut driver, &c)
                .await
                .unwrap();

            assert_eq!(result.actual, Outcome::Accepted);
            assert!(!result.passed);
            assert_eq!(result.status_label(), "FAIL");
        }

        #[tokio::test]
        async fn test_silent_stay_is_rejected_and_flagged() {
            let config = libro();
            let mut driver = MockFormDriver::new(|_| MockResponse::stay(CREATE));
            let c = case("CP-05", &[("TITULO", "Rayuela")], Verdict::Accepted);

            let result = CaseExecutor::new(&config)
                .execute(&mut driver, &c)
                .await
                .unwrap();

            assert_eq!(result.actual, Outcome::Rejected);
            assert!(!result.passed);
            assert!(result.note.contains("remained on form"));
        }

        #[tokio::test]
        async fn test_submit_timeout_is_error_outcome() {
            let config = libro();
            let mut driver = libro_app();
            driver.fail_next(MockStep::Submit, MockFailure::Timeout);
            let c = case("CP-06", &[("TITULO", "Rayuela")], Verdict::Accepted);

            let result = CaseExecutor::new(&config)
                .execute(&mut driver, &c)
                .await
                .unwrap();

            assert_eq!(result.actual, Outcome::Error);
            assert!(!result.passed);
            assert!(result.note.starts_with("Exception:"));
            assert!(result.note.contains("timed out"));
        }

        #[tokio::test]
        async fn test_missing_field_element_is_error_outcome() {
            let config = libro();
            let mut driver = libro_app();
            driver.fail_next(MockStep::SetField, MockFailure::ElementNotFound);
            let c = case("CP-07", &[("TITULO", "Rayuela")], Verdict::Accepted);

            let result = CaseExecutor::new(&config)
                .execute(&mut driver, &c)
                .await
                .unwrap();

            assert_eq!(result.actual, Outcome::Error);
            assert!(result.note.contains("Element not found"));
        }

        #[tokio::test]
        async fn test_config_error_propagates_before_driving() {
            let config = libro();
            let mut driver = libro_app();
            let c = case("CP-08", &[("Autor", "Cortázar")], Verdict::Accepted);

            let err = CaseExecutor::new(&config)
                .execute(&mut driver, &c)
                .await
                .unwrap_err();

            assert!(matches!(err, ProbeError::Config { .. }));
            assert!(driver.history.is_empty());
        }
    }

    mod seed_tests {
        use super::*;

        fn ejemplar_app() -> MockFormDriver {
            MockFormDriver::new(|form| {
                if form.contains_key("[data-testid='idlibro']") {
                    MockResponse::redirect("http://localhost:5183/Ejemplar/Index")
                } else {
                    MockResponse::stay("http://localhost:5183/Ejemplar/Create")
                        .with_error("[data-testid='idlibro-error']", "Debe seleccionar un libro")
                }
            })
            .with_select_options("[data-testid='disponible']", &["", "true", "false"])
        }

        #[tokio::test]
        async fn test_seeds_before_filling() {
            let config = EntityConfig::preset("ejemplar")
                .unwrap()
                .with_timeouts(Timeouts::immediate());
            let mut driver = ejemplar_app()
                .with_select_options("[data-testid='idlibro']", &["", "7"]);
            let c = case(
                "E-01",
                &[("Descripcion", "Buen estado"), ("Disponible", "No Disponible")],
                Verdict::Accepted,
            );

            let result = CaseExecutor::new(&config)
                .execute(&mut driver, &c)
                .await
                .unwrap();

            assert!(result.passed);
            assert_eq!(driver.form.get("[data-testid='idlibro']").unwrap(), "7");
            assert_eq!(driver.form.get("[data-testid='disponible']").unwrap(), "false");
            let seed = driver.history.iter().position(|h| h.starts_with("seed:")).unwrap();
            let fill = driver.history.iter().position(|h| h.starts_with("set:")).unwrap();
            assert!(seed < fill);
        }

        #[tokio::test]
        async fn test_seed_failure_does_not_abort_case() {
            let config = EntityConfig::preset("ejemplar")
                .unwrap()
                .with_timeouts(Timeouts::immediate());
            let mut driver = ejemplar_app();
            let c = case("E-02", &[("Descripcion", "Buen estado")], Verdict::Rejected);

            let result = CaseExecutor::new(&config)
                .execute(&mut driver, &c)
                .await
                .unwrap();

            assert_eq!(result.actual, Outcome::Rejected);
            assert!(result.passed);
            assert!(result.field_errors.contains_key("idlibro"));
        }
    }

    #[test]
    fn test_preview_truncates_long_values() {
        let long = "A".repeat(201);
        let shown = preview(&long);
        assert!(shown.starts_with(&"A".repeat(50)));
        assert!(shown.ends_with("(201 chars)"));
        assert_eq!(preview("Rayuela"), "Rayuela");
    }
}
