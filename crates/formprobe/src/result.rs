//! Result and error types for Formprobe.

use thiserror::Error;

/// Result type for Formprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur in Formprobe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Entity schema or descriptor is inconsistent with the case table
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Case table could not be read or is malformed
    #[error("Case table error: {message}")]
    CaseTable {
        /// Error message
        message: String,
    },

    /// Browser executable could not be launched
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page-level CDP failure
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Locator matched nothing on the page
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector that matched nothing
        selector: String,
    },

    /// Operation timed out
    #[error("{operation} timed out after {ms}ms")]
    Timeout {
        /// Operation that was waiting
        operation: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ProbeError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a case table error
    #[must_use]
    pub fn case_table(message: impl Into<String>) -> Self {
        Self::CaseTable {
            message: message.into(),
        }
    }

    /// Create an element-not-found error
    #[must_use]
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            ms: timeout.as_millis() as u64,
        }
    }

    /// Whether the error came from the browser session rather than from
    /// configuration or input files
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::BrowserLaunch { .. }
                | Self::Page { .. }
                | Self::Navigation { .. }
                | Self::ElementNotFound { .. }
                | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_config_error_message() {
        let err = ProbeError::config("column 'Autor' has no field");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("Autor"));
    }

    #[test]
    fn test_timeout_reports_operation_and_ms() {
        let err = ProbeError::timeout("submit", Duration::from_secs(10));
        assert_eq!(err.to_string(), "submit timed out after 10000ms");
    }

    #[test]
    fn test_infrastructure_classification() {
        assert!(ProbeError::timeout("open", Duration::from_millis(5)).is_infrastructure());
        assert!(ProbeError::element_not_found("#x").is_infrastructure());
        assert!(ProbeError::Navigation {
            url: "http://localhost".to_string(),
            message: "refused".to_string(),
        }
        .is_infrastructure());
        assert!(!ProbeError::config("bad").is_infrastructure());
        assert!(!ProbeError::case_table("bad").is_infrastructure());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: ProbeError = io_err.into();
        assert!(err.to_string().contains("I/O"));
        assert!(!err.is_infrastructure());
    }
}
