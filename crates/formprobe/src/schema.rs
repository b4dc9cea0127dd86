//! Field schema: the declarative description of one entity's create form.
//!
//! Each [`FieldSpec`] ties a logical field (and the case-table column that
//! feeds it) to the locator the driver types into and the locator where the
//! application renders that field's validation error.

use crate::result::{ProbeError, ProbeResult};
use crate::rules::ValidationRule;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// How a field receives its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text input, typed key by key
    #[default]
    Text,
    /// Date input, assigned as `yyyy-mm-dd`
    Date,
    /// Single-select, assigned by option value
    Select,
}

impl FieldKind {
    /// Whether the field is a `<select>`
    #[must_use]
    pub const fn is_select(self) -> bool {
        matches!(self, Self::Select)
    }
}

/// One field of an entity form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Logical field name, also the key of reported field errors
    pub name: String,
    /// Case-table column label (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Locator of the input element
    pub selector: String,
    /// Locator of the element that presents this field's validation error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_selector: Option<String>,
    /// Input kind
    #[serde(default)]
    pub kind: FieldKind,
    /// Display text to option value, for selects
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
    /// Option value used when the display text is not in `options`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_fallback: Option<String>,
    /// Select the first real option after opening the form
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_seed_first_option: bool,
    /// Documented validation rule (advisory)
    #[serde(default, skip_serializing_if = "ValidationRule::is_empty")]
    pub rules: ValidationRule,
}

impl FieldSpec {
    /// Create a text field
    #[must_use]
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
            selector: selector.into(),
            error_selector: None,
            kind: FieldKind::Text,
            options: BTreeMap::new(),
            option_fallback: None,
            auto_seed_first_option: false,
            rules: ValidationRule::default(),
        }
    }

    /// Set the case-table column label
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Set the error locator
    #[must_use]
    pub fn with_error_selector(mut self, selector: impl Into<String>) -> Self {
        self.error_selector = Some(selector.into());
        self
    }

    /// Set the input kind
    #[must_use]
    pub const fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Map a display text to an option value
    #[must_use]
    pub fn with_option(mut self, display: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(display.into(), value.into());
        self
    }

    /// Set the option value for unmapped display texts
    #[must_use]
    pub fn with_option_fallback(mut self, value: impl Into<String>) -> Self {
        self.option_fallback = Some(value.into());
        self
    }

    /// Seed the first real option when the form opens
    #[must_use]
    pub const fn with_auto_seed(mut self) -> Self {
        self.auto_seed_first_option = true;
        self
    }

    /// Attach the documented rule
    #[must_use]
    pub fn with_rules(mut self, rules: ValidationRule) -> Self {
        self.rules = rules;
        self
    }

    /// Case-table column label
    #[must_use]
    pub fn column_label(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    /// Whether a case-table header refers to this field
    #[must_use]
    pub fn matches(&self, header: &str) -> bool {
        let header = header.trim();
        header.eq_ignore_ascii_case(self.column_label()) || header.eq_ignore_ascii_case(&self.name)
    }

    /// Translate a decoded cell into the value the driver applies.
    ///
    /// Selects with an option table map display text to the underlying token;
    /// every other field passes the value through.
    #[must_use]
    pub fn input_value(&self, decoded: &str) -> String {
        if !self.kind.is_select() || self.options.is_empty() {
            return decoded.to_string();
        }

        let wanted = decoded.trim();
        if let Some(value) = self.options.get(wanted) {
            return value.clone();
        }
        if let Some((_, value)) = self
            .options
            .iter()
            .find(|(display, _)| display.eq_ignore_ascii_case(wanted))
        {
            return value.clone();
        }
        self.option_fallback
            .clone()
            .unwrap_or_else(|| decoded.to_string())
    }
}

/// Locator for one field's error presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorProbe {
    /// Field the error belongs to
    pub field: String,
    /// Error element locator
    pub selector: String,
}

/// Ordered, validated set of fields for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldSpec>", into = "Vec<FieldSpec>")]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    /// Build a schema, rejecting blank or duplicate names and columns
    pub fn new(fields: Vec<FieldSpec>) -> ProbeResult<Self> {
        let mut names = HashSet::new();
        let mut columns = HashSet::new();

        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(ProbeError::config("field with an empty name"));
            }
            if field.selector.trim().is_empty() {
                return Err(ProbeError::config(format!(
                    "field '{}' has an empty selector",
                    field.name
                )));
            }
            if !names.insert(field.name.to_ascii_lowercase()) {
                return Err(ProbeError::config(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
            if !columns.insert(field.column_label().to_ascii_lowercase()) {
                return Err(ProbeError::config(format!(
                    "duplicate column '{}'",
                    field.column_label()
                )));
            }
            if field.auto_seed_first_option && !field.kind.is_select() {
                return Err(ProbeError::config(format!(
                    "field '{}' auto-seeds an option but is not a select",
                    field.name
                )));
            }
        }

        Ok(Self { fields })
    }

    /// Look up the field a case-table header refers to
    #[must_use]
    pub fn resolve(&self, header: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.matches(header))
    }

    /// All fields in declaration order
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields whose first real option is selected before filling
    pub fn auto_seeded(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.auto_seed_first_option)
    }

    /// Error locators for every field that has one
    #[must_use]
    pub fn error_probes(&self) -> Vec<ErrorProbe> {
        self.fields
            .iter()
            .filter_map(|f| {
                f.error_selector.as_ref().map(|selector| ErrorProbe {
                    field: f.name.clone(),
                    selector: selector.clone(),
                })
            })
            .collect()
    }
}

impl TryFrom<Vec<FieldSpec>> for FieldSchema {
    type Error = ProbeError;

    fn try_from(fields: Vec<FieldSpec>) -> ProbeResult<Self> {
        Self::new(fields)
    }
}

impl From<FieldSchema> for Vec<FieldSpec> {
    fn from(schema: FieldSchema) -> Self {
        schema.fields
    }
}
