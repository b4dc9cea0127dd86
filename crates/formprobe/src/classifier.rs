//! Outcome classification.
//!
//! Only an observed transition to the success view with no field errors
//! counts as acceptance. "No errors, still on the form" is rejected too:
//! a silent server-side rejection and a slow redirect look the same from
//! the outside, and case tables are authored against that policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Binary verdict about a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The application created the resource
    Accepted,
    /// The application refused the submission
    Rejected,
}

impl Verdict {
    /// Localized label used in case tables and reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Accepted => "Aceptado",
            Self::Rejected => "Rechazado",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a label is neither accepted nor rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVerdict(pub String);

impl fmt::Display for UnknownVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown expected outcome '{}' (use Aceptado or Rechazado)",
            self.0
        )
    }
}

impl std::error::Error for UnknownVerdict {}

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_lowercase();
        match label.as_str() {
            "aceptado" | "accepted" => Ok(Self::Accepted),
            "rechazado" | "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownVerdict(s.trim().to_string())),
        }
    }
}

/// Actual outcome of a case, including infrastructure failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Classified as accepted
    Accepted,
    /// Classified as rejected
    Rejected,
    /// The driver failed before the outcome could be observed
    Error,
}

impl Outcome {
    /// Localized label used in reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Accepted => Verdict::Accepted.label(),
            Self::Rejected => Verdict::Rejected.label(),
            Self::Error => "Error",
        }
    }
}

impl From<Verdict> for Outcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Accepted => Self::Accepted,
            Verdict::Rejected => Self::Rejected,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a submission from what the page shows after it settles
#[must_use]
pub fn classify(field_errors: &BTreeMap<String, String>, landed_on_success_view: bool) -> Verdict {
    if landed_on_success_view && field_errors.is_empty() {
        Verdict::Accepted
    } else {
        Verdict::Rejected
    }
}

/// What the page showed after submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedOutcome {
    /// Field name to non-empty error text
    pub field_errors: BTreeMap<String, String>,
    /// Location matched the entity's list view
    pub landed_on_success_view: bool,
}

impl ObservedOutcome {
    /// Classify this observation
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        classify(&self.field_errors, self.landed_on_success_view)
    }

    /// Human-readable explanation of the verdict
    #[must_use]
    pub fn note(&self) -> String {
        if self.landed_on_success_view {
            "Redirected to list view (creation succeeded)".to_string()
        } else if !self.field_errors.is_empty() {
            let summary = self
                .field_errors
                .iter()
                .map(|(field, message)| format!("{field}: {message}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("Validation errors: {summary}")
        } else {
            "No errors detected, remained on form".to_string()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn errors(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    mod classify_tests {
        use super::*;

        #[test]
        fn test_success_view_without_errors_is_accepted() {
            assert_eq!(classify(&errors(&[]), true), Verdict::Accepted);
        }

        #[test]
        fn test_success_view_with_errors_is_rejected() {
            assert_eq!(classify(&errors(&[("x", "e")]), true), Verdict::Rejected);
        }

        #[test]
        fn test_form_without_errors_is_rejected() {
            assert_eq!(classify(&errors(&[]), false), Verdict::Rejected);
        }

        #[test]
        fn test_form_with_errors_is_rejected() {
            assert_eq!(classify(&errors(&[("x", "e")]), false), Verdict::Rejected);
        }
    }

    mod note_tests {
        use super::*;

        #[test]
        fn test_success_note() {
            let observed = ObservedOutcome {
                field_errors: BTreeMap::new(),
                landed_on_success_view: true,
            };
            assert!(observed.note().contains("creation succeeded"));
        }

        #[test]
        fn test_error_note_lists_fields_in_order() {
            let observed = ObservedOutcome {
                field_errors: errors(&[
                    ("titulo", "El título es obligatorio"),
                    ("isbn", "El ISBN no puede superar 13 caracteres"),
                ]),
                landed_on_success_view: false,
            };
            assert_eq!(
                observed.note(),
                "Validation errors: isbn: El ISBN no puede superar 13 caracteres, \
                 titulo: El título es obligatorio"
            );
        }

        #[test]
        fn test_landing_note_wins_over_errors() {
            let observed = ObservedOutcome {
                field_errors: errors(&[("titulo", "x")]),
                landed_on_success_view: true,
            };
            assert_eq!(observed.verdict(), Verdict::Rejected);
            assert!(observed.note().contains("creation succeeded"));
        }

        #[test]
        fn test_ambiguous_note_is_flagged() {
            let observed = ObservedOutcome::default();
            assert_eq!(observed.verdict(), Verdict::Rejected);
            assert!(observed.note().contains("remained on form"));
        }
    }

    mod label_tests {
        use super::*;

        #[test]
        fn test_parse_localized_labels() {
            assert_eq!("Aceptado".parse::<Verdict>().unwrap(), Verdict::Accepted);
            assert_eq!(" RECHAZADO ".parse::<Verdict>().unwrap(), Verdict::Rejected);
            assert_eq!("accepted".parse::<Verdict>().unwrap(), Verdict::Accepted);
        }

        #[test]
        fn test_parse_unknown_label() {
            let err = "Pendiente".parse::<Verdict>().unwrap_err();
            assert!(err.to_string().contains("Pendiente"));
        }

        #[test]
        fn test_outcome_labels() {
            assert_eq!(Outcome::from(Verdict::Accepted).label(), "Aceptado");
            assert_eq!(Outcome::Error.to_string(), "Error");
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_classify_is_pure(
                pairs in proptest::collection::btree_map("[a-z]{1,8}", "[a-z ]{1,20}", 0..4),
                landed in any::<bool>(),
            ) {
                let first = classify(&pairs, landed);
                prop_assert_eq!(first, classify(&pairs, landed));
                prop_assert_eq!(first == Verdict::Accepted, landed && pairs.is_empty());
            }
        }
    }
}
