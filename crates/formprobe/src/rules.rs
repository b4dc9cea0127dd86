//! Documented validation rules and the offline case-table audit.
//!
//! Rules never drive classification during a run; the verdict comes only
//! from what the live form shows. They exist so `formprobe check` can flag
//! table rows whose expected outcome contradicts the rules the entity
//! model documents, before anyone points a browser at the application.

use crate::case_table::TestCase;
use crate::classifier::Verdict;
use crate::codec::decode;
use crate::result::{ProbeError, ProbeResult};
use crate::schema::FieldSchema;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Documented constraints of one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Field must be non-blank
    #[serde(default)]
    pub required: bool,
    /// Minimum length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regular expression a non-blank value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Application messages keyed by `required`, `length`, `pattern`, ...
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<String, String>,
}

/// A documented rule a value breaks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleViolation {
    /// Blank value for a required field
    Required,
    /// Value shorter than `min`
    TooShort {
        /// Minimum length
        min: usize,
        /// Observed length
        actual: usize,
    },
    /// Value longer than `max`
    TooLong {
        /// Maximum length
        max: usize,
        /// Observed length
        actual: usize,
    },
    /// Value does not match the pattern
    Pattern {
        /// Pattern source
        pattern: String,
    },
}

impl RuleViolation {
    /// Key into [`ValidationRule::messages`]
    #[must_use]
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::TooShort { .. } | Self::TooLong { .. } => "length",
            Self::Pattern { .. } => "pattern",
        }
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::TooShort { min, actual } => write!(f, "{actual} chars, minimum {min}"),
            Self::TooLong { max, actual } => write!(f, "{actual} chars, maximum {max}"),
            Self::Pattern { pattern } => write!(f, "does not match {pattern}"),
        }
    }
}

impl ValidationRule {
    /// Whether no constraint is documented
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.required
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.messages.is_empty()
    }

    /// Mark the field required
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the length bounds
    #[must_use]
    pub const fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// Set the pattern
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Check a decoded value; blank optional values satisfy every rule.
    pub fn check(&self, value: &str) -> ProbeResult<Vec<RuleViolation>> {
        let mut violations = Vec::new();

        if value.is_empty() {
            if self.required {
                violations.push(RuleViolation::Required);
            }
            return Ok(violations);
        }

        let length = value.chars().count();
        if let Some(min) = self.min_length {
            if length < min {
                violations.push(RuleViolation::TooShort {
                    min,
                    actual: length,
                });
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                violations.push(RuleViolation::TooLong {
                    max,
                    actual: length,
                });
            }
        }
        if let Some(ref pattern) = self.pattern {
            let regex = Regex::new(pattern).map_err(|e| {
                ProbeError::config(format!("invalid rule pattern '{pattern}': {e}"))
            })?;
            if !regex.is_match(value) {
                violations.push(RuleViolation::Pattern {
                    pattern: pattern.clone(),
                });
            }
        }

        Ok(violations)
    }

    /// The application's message for a violation, if documented
    #[must_use]
    pub fn message_for(&self, violation: &RuleViolation) -> Option<&str> {
        self.messages
            .get(violation.message_key())
            .map(String::as_str)
    }
}

/// A field-level finding of the audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFinding {
    /// Field name
    pub field: String,
    /// Broken rule
    pub violation: RuleViolation,
    /// Documented application message
    pub message: Option<String>,
}

/// Audit of one case against the documented rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseAudit {
    /// Case identifier
    pub case_id: String,
    /// Outcome the table expects
    pub expected: Verdict,
    /// Outcome the documented rules predict
    pub predicted: Verdict,
    /// Every broken rule
    pub findings: Vec<FieldFinding>,
}

impl CaseAudit {
    /// Whether the table and the documented rules agree
    #[must_use]
    pub fn agrees(&self) -> bool {
        self.expected == self.predicted
    }
}

/// Predict a case's outcome from the documented rules.
///
/// Auto-seeded fields are assumed filled by the seed. Rules the entity model
/// cannot express here (uniqueness, dates in the future) make some expected
/// rejections look unexplained; the audit is advisory for that reason.
pub fn audit_case(case: &TestCase, schema: &FieldSchema) -> ProbeResult<CaseAudit> {
    let mut findings = Vec::new();

    for field in schema.fields() {
        let decoded = case
            .field_values
            .iter()
            .find(|v| field.matches(&v.column))
            .map(|v| decode(&v.raw))
            .unwrap_or_default();

        if decoded.is_empty() && field.auto_seed_first_option {
            continue;
        }

        for violation in field.rules.check(&decoded)? {
            findings.push(FieldFinding {
                field: field.name.clone(),
                message: field.rules.message_for(&violation).map(str::to_string),
                violation,
            });
        }
    }

    let predicted = if findings.is_empty() {
        Verdict::Accepted
    } else {
        Verdict::Rejected
    };

    Ok(CaseAudit {
        case_id: case.case_id.clone(),
        expected: case.expected,
        predicted,
        findings,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::case_table::FieldValue;
    use crate::schema::{FieldKind, FieldSpec};

    fn titulo_rule() -> ValidationRule {
        ValidationRule::default().required().length(Some(1), Some(50))
    }

    mod rule_tests {
        use super::*;

        #[test]
        fn test_required_blank() {
            assert_eq!(
                titulo_rule().check("").unwrap(),
                vec![RuleViolation::Required]
            );
        }

        #[test]
        fn test_optional_blank_passes() {
            let rule = ValidationRule::default().length(Some(2), Some(20));
            assert!(rule.check("").unwrap().is_empty());
        }

        #[test]
        fn test_too_long_counts_chars() {
            let value = "ñ".repeat(51);
            assert_eq!(
                titulo_rule().check(&value).unwrap(),
                vec![RuleViolation::TooLong {
                    max: 50,
                    actual: 51
                }]
            );
        }

        #[test]
        fn test_too_short() {
            let rule = ValidationRule::default().length(Some(6), Some(10));
            assert_eq!(
                rule.check("123").unwrap(),
                vec![RuleViolation::TooShort { min: 6, actual: 3 }]
            );
        }

        #[test]
        fn test_pattern() {
            let rule = ValidationRule::default().pattern(r"^\d+$");
            assert!(rule.check("0123456").unwrap().is_empty());
            assert_eq!(rule.check("12a").unwrap().len(), 1);
        }

        #[test]
        fn test_invalid_pattern_is_config_error() {
            let rule = ValidationRule::default().pattern("([");
            let err = rule.check("x").unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
        }

        #[test]
        fn test_message_lookup() {
            let mut rule = titulo_rule();
            rule.messages
                .insert("required".to_string(), "El título es obligatorio".to_string());
            assert_eq!(
                rule.message_for(&RuleViolation::Required),
                Some("El título es obligatorio")
            );
            assert_eq!(
                rule.message_for(&RuleViolation::TooShort { min: 1, actual: 0 }),
                None
            );
        }

        #[test]
        fn test_violation_display() {
            let v = RuleViolation::TooLong { max: 13, actual: 14 };
            assert_eq!(v.to_string(), "14 chars, maximum 13");
        }
    }

    mod audit_tests {
        use super::*;

        fn schema() -> FieldSchema {
            FieldSchema::new(vec![
                FieldSpec::new("idlibro", "#idlibro")
                    .with_kind(FieldKind::Select)
                    .with_auto_seed()
                    .with_rules(ValidationRule::default().required()),
                FieldSpec::new("titulo", "#titulo")
                    .with_column("TITULO")
                    .with_rules(titulo_rule()),
            ])
            .unwrap()
        }

        fn case(value: &str, expected: Verdict) -> TestCase {
            TestCase {
                case_id: "CP-01".to_string(),
                field_values: vec![FieldValue::new("TITULO", value)],
                expected,
            }
        }

        #[test]
        fn test_valid_case_agrees() {
            let audit = audit_case(&case("Rayuela", Verdict::Accepted), &schema()).unwrap();
            assert_eq!(audit.predicted, Verdict::Accepted);
            assert!(audit.agrees());
        }

        #[test]
        fn test_boundary_case_predicted_rejected() {
            let audit = audit_case(&case("\"A\" x 51", Verdict::Accepted), &schema()).unwrap();
            assert_eq!(audit.predicted, Verdict::Rejected);
            assert!(!audit.agrees());
            assert_eq!(audit.findings[0].field, "titulo");
        }

        #[test]
        fn test_missing_column_counts_as_blank() {
            let c = TestCase {
                case_id: "CP-02".to_string(),
                field_values: vec![],
                expected: Verdict::Rejected,
            };
            let audit = audit_case(&c, &schema()).unwrap();
            assert_eq!(audit.findings.len(), 1);
            assert_eq!(audit.findings[0].violation, RuleViolation::Required);
            assert!(audit.agrees());
        }
    }
}
