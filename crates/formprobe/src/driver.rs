//! FormDriver - the narrow browser capability the engine consumes.
//!
//! The engine never touches a browser directly. It opens the creation view,
//! fills fields, submits and reads back errors and location through this
//! trait, so the same engine runs against Chromium or a scripted form.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  FormDriver (trait)                                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ChromiumFormDriver (feature `browser`)  │  MockFormDriver    │
//! │  CDP via chromiumoxide                   │  scripted app      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::config::SuccessView;
use crate::result::{ProbeError, ProbeResult};
use crate::schema::{ErrorProbe, FieldKind};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Browser capabilities required by the engine.
///
/// Every operation may fail with [`ProbeError::ElementNotFound`] or
/// [`ProbeError::Timeout`]; the executor turns either into an `Error` case.
#[async_trait]
pub trait FormDriver: Send {
    /// Navigate to `url` and wait until the page is interactive
    async fn open(&mut self, url: &str) -> ProbeResult<()>;

    /// Select the first non-placeholder option; `false` if there is none
    async fn select_first_option(&mut self, selector: &str) -> ProbeResult<bool>;

    /// Apply a value to one field. An empty value leaves the field untouched.
    async fn set_field(&mut self, selector: &str, kind: FieldKind, value: &str)
        -> ProbeResult<()>;

    /// Click submit and wait for the page to settle
    async fn submit(&mut self, selector: &str) -> ProbeResult<()>;

    /// Non-empty error texts, keyed by field
    async fn current_errors(
        &mut self,
        probes: &[ErrorProbe],
    ) -> ProbeResult<BTreeMap<String, String>>;

    /// Current location
    async fn current_url(&mut self) -> ProbeResult<String>;

    /// Whether the current location is the success view.
    ///
    /// A location that cannot be read counts as "not on the success view".
    async fn is_on_success_view(&mut self, view: &SuccessView) -> bool {
        match self.current_url().await {
            Ok(url) => view.matches(&url),
            Err(e) => {
                tracing::debug!(error = %e, "could not read current location");
                false
            }
        }
    }

    /// Release the session
    async fn close(&mut self) -> ProbeResult<()>;
}

// ============================================================================
// Scripted driver
// ============================================================================

/// Driver step a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockStep {
    /// `open`
    Open,
    /// `select_first_option`
    SeedOption,
    /// `set_field`
    SetField,
    /// `submit`
    Submit,
    /// `current_errors`
    ReadErrors,
    /// `current_url`
    ReadUrl,
}

/// Failure injected into a scripted step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// The step times out
    Timeout,
    /// The step's element is missing
    ElementNotFound,
}

/// What the scripted application does with a submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockResponse {
    /// Location after submit
    pub location: String,
    /// Error selector to error text
    pub errors: BTreeMap<String, String>,
}

impl MockResponse {
    /// Redirect to `location` with no errors
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            errors: BTreeMap::new(),
        }
    }

    /// Remain on `location`; chain [`Self::with_error`] to show errors
    #[must_use]
    pub fn stay(location: impl Into<String>) -> Self {
        Self::redirect(location)
    }

    /// Add an error under an error selector
    #[must_use]
    pub fn with_error(mut self, selector: impl Into<String>, text: impl Into<String>) -> Self {
        self.errors.insert(selector.into(), text.into());
        self
    }
}

type Responder = Box<dyn Fn(&BTreeMap<String, String>) -> MockResponse + Send + Sync>;

/// Scripted form for engine tests.
///
/// Field assignments are recorded per selector; on submit the responder sees
/// the form state and decides where the page lands and which errors show.
pub struct MockFormDriver {
    /// Current location
    pub location: String,
    /// Selector to applied value, reset on every `open`
    pub form: BTreeMap<String, String>,
    /// Call history for verification
    pub history: Vec<String>,
    /// Options available per select (placeholder included)
    pub select_options: HashMap<String, Vec<String>>,
    errors: BTreeMap<String, String>,
    failures: HashMap<MockStep, Vec<MockFailure>>,
    responder: Responder,
    closed: bool,
}

impl fmt::Debug for MockFormDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockFormDriver")
            .field("location", &self.location)
            .field("form", &self.form)
            .field("history", &self.history)
            .field("errors", &self.errors)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl MockFormDriver {
    /// Create a driver whose application answers every submit with `responder`
    #[must_use]
    pub fn new(
        responder: impl Fn(&BTreeMap<String, String>) -> MockResponse + Send + Sync + 'static,
    ) -> Self {
        Self {
            location: "about:blank".to_string(),
            form: BTreeMap::new(),
            history: Vec::new(),
            select_options: HashMap::new(),
            errors: BTreeMap::new(),
            failures: HashMap::new(),
            responder: Box::new(responder),
            closed: false,
        }
    }

    /// Declare the options of a select, placeholder first
    #[must_use]
    pub fn with_select_options(mut self, selector: impl Into<String>, options: &[&str]) -> Self {
        self.select_options.insert(
            selector.into(),
            options.iter().map(|o| (*o).to_string()).collect(),
        );
        self
    }

    /// Fail the next call of `step`
    pub fn fail_next(&mut self, step: MockStep, failure: MockFailure) {
        self.failures.entry(step).or_default().push(failure);
    }

    /// Whether `close` was called
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether a method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.history.iter().any(|c| c.starts_with(method))
    }

    fn check(&mut self, step: MockStep, target: &str) -> ProbeResult<()> {
        let failure = self
            .failures
            .get_mut(&step)
            .and_then(|queue| (!queue.is_empty()).then(|| queue.remove(0)));
        match failure {
            None => Ok(()),
            Some(MockFailure::Timeout) => Err(ProbeError::Timeout {
                operation: format!("{step:?}"),
                ms: 0,
            }),
            Some(MockFailure::ElementNotFound) => Err(ProbeError::element_not_found(target)),
        }
    }
}

#[async_trait]
impl FormDriver for MockFormDriver {
    async fn open(&mut self, url: &str) -> ProbeResult<()> {
        self.history.push(format!("open:{url}"));
        self.check(MockStep::Open, url)?;
        self.location = url.to_string();
        self.form.clear();
        self.errors.clear();
        Ok(())
    }

    async fn select_first_option(&mut self, selector: &str) -> ProbeResult<bool> {
        self.history.push(format!("seed:{selector}"));
        self.check(MockStep::SeedOption, selector)?;
        let options = self
            .select_options
            .get(selector)
            .ok_or_else(|| ProbeError::element_not_found(selector))?;
        match options.get(1) {
            Some(first) => {
                self.form.insert(selector.to_string(), first.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_field(
        &mut self,
        selector: &str,
        kind: FieldKind,
        value: &str,
    ) -> ProbeResult<()> {
        self.history.push(format!("set:{selector}={value}"));
        self.check(MockStep::SetField, selector)?;
        if value.is_empty() {
            return Ok(());
        }
        if kind.is_select() {
            if let Some(options) = self.select_options.get(selector) {
                if !options.iter().any(|o| o == value) {
                    return Err(ProbeError::element_not_found(format!(
                        "{selector} option '{value}'"
                    )));
                }
            }
        }
        self.form.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn submit(&mut self, selector: &str) -> ProbeResult<()> {
        self.history.push(format!("submit:{selector}"));
        self.check(MockStep::Submit, selector)?;
        let response = (self.responder)(&self.form);
        self.location = response.location;
        self.errors = response.errors;
        Ok(())
    }

    async fn current_errors(
        &mut self,
        probes: &[ErrorProbe],
    ) -> ProbeResult<BTreeMap<String, String>> {
        self.history.push("errors".to_string());
        self.check(MockStep::ReadErrors, "errors")?;
        Ok(probes
            .iter()
            .filter_map(|probe| {
                self.errors
                    .get(&probe.selector)
                    .map(|text| text.trim())
                    .filter(|text| !text.is_empty())
                    .map(|text| (probe.field.clone(), text.to_string()))
            })
            .collect())
    }

    async fn current_url(&mut self) -> ProbeResult<String> {
        self.check(MockStep::ReadUrl, "location")?;
        Ok(self.location.clone())
    }

    async fn close(&mut self) -> ProbeResult<()> {
        self.history.push("close".to_string());
        self.closed = true;
        Ok(())
    }
}
