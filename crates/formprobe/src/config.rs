//! Per-entity configuration descriptors.
//!
//! One [`EntityConfig`] instantiates the engine for one create form: where it
//! lives, how to recognise success, how the case table is laid out and which
//! fields the form has. The bundled presets live in `entities/*.yaml`.

use crate::result::{ProbeError, ProbeResult};
use crate::schema::FieldSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default application root
pub const DEFAULT_BASE_URL: &str = "http://localhost:5183";

/// Default wait bound for every operation (milliseconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

const PRESETS: &[(&str, &str)] = &[
    ("libro", include_str!("../entities/libro.yaml")),
    ("ejemplar", include_str!("../entities/ejemplar.yaml")),
    ("lector", include_str!("../entities/lector.yaml")),
];

/// Names of the bundled entity presets
#[must_use]
pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|(name, _)| *name).collect()
}

/// Location patterns that identify the entity's list view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessView {
    /// URL substrings, e.g. `/Libro/Index`
    #[serde(default)]
    pub contains: Vec<String>,
    /// URL suffixes, e.g. `/Libro`
    #[serde(default)]
    pub ends_with: Vec<String>,
}

impl SuccessView {
    /// Whether a location is the success view
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.contains.iter().any(|p| url.contains(p.as_str()))
            || self.ends_with.iter().any(|p| url.ends_with(p.as_str()))
    }
}

/// Case-table column layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    /// Case identifier column
    #[serde(default = "default_case_id_column")]
    pub case_id_column: String,
    /// Expected outcome column (matched case-insensitively)
    #[serde(default = "default_expected_column")]
    pub expected_column: String,
    /// Documentation columns that carry no field value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_columns: Vec<String>,
}

fn default_case_id_column() -> String {
    "CASO".to_string()
}

fn default_expected_column() -> String {
    "Resultado Esperado".to_string()
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            case_id_column: default_case_id_column(),
            expected_column: default_expected_column(),
            ignored_columns: Vec::new(),
        }
    }
}

impl TableLayout {
    /// Whether a header is listed in `ignored_columns`
    #[must_use]
    pub fn is_ignored(&self, header: &str) -> bool {
        self.ignored_columns
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(header.trim()))
    }
}

/// Output file names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFiles {
    /// Per-case CSV report
    pub csv: String,
    /// Full JSON report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<String>,
    /// Run log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl Default for ReportFiles {
    fn default() -> Self {
        Self {
            csv: "test_results.csv".to_string(),
            json: None,
            log: None,
        }
    }
}

/// Wait bounds, one per suspension point (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Page load after navigation
    pub navigation_ms: u64,
    /// Element lookup
    pub element_ms: u64,
    /// Post-submit settle
    pub settle_ms: u64,
    /// Fixed pause after clicking submit
    pub settle_delay_ms: u64,
    /// Pause between cases
    pub case_delay_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: DEFAULT_WAIT_TIMEOUT_MS,
            element_ms: DEFAULT_WAIT_TIMEOUT_MS,
            settle_ms: DEFAULT_WAIT_TIMEOUT_MS,
            settle_delay_ms: 2_000,
            case_delay_ms: 1_000,
        }
    }
}

impl Timeouts {
    /// No pauses and short waits, for scripted drivers
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            navigation_ms: 100,
            element_ms: 100,
            settle_ms: 100,
            settle_delay_ms: 0,
            case_delay_ms: 0,
        }
    }

    /// Navigation bound
    #[must_use]
    pub const fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    /// Element lookup bound
    #[must_use]
    pub const fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    /// Post-submit settle bound
    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Pause after submit
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Pause between cases
    #[must_use]
    pub const fn case_delay(&self) -> Duration {
        Duration::from_millis(self.case_delay_ms)
    }
}

/// Complete descriptor for one entity's create form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Entity name, e.g. `libro`
    pub name: String,
    /// Application root
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the creation view, e.g. `/Libro/Create`
    pub create_path: String,
    /// Locations that count as success
    pub success_view: SuccessView,
    /// Submit button locator
    #[serde(default = "default_submit_selector")]
    pub submit_selector: String,
    /// Case-table layout
    #[serde(default)]
    pub table: TableLayout,
    /// Output file names
    #[serde(default)]
    pub report: ReportFiles,
    /// Wait bounds
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Form fields
    pub fields: FieldSchema,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_submit_selector() -> String {
    "[data-testid='submit-button']".to_string()
}

impl EntityConfig {
    /// Load a bundled preset by name
    pub fn preset(name: &str) -> ProbeResult<Self> {
        let (_, yaml) = PRESETS
            .iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ProbeError::config(format!(
                    "unknown entity '{name}' (available: {})",
                    preset_names().join(", ")
                ))
            })?;
        Self::from_yaml(yaml)
    }

    /// Parse a descriptor from YAML
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a descriptor file
    pub fn from_path(path: &Path) -> ProbeResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read schema {}: {e}", path.display()))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Serialize the descriptor to YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Override the application root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the wait bounds
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Absolute URL of the creation view
    #[must_use]
    pub fn create_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.create_path.trim_start_matches('/')
        )
    }

    fn validate(&self) -> ProbeResult<()> {
        if self.name.trim().is_empty() {
            return Err(ProbeError::config("entity name is empty"));
        }
        if self.fields.is_empty() {
            return Err(ProbeError::config(format!(
                "entity '{}' declares no fields",
                self.name
            )));
        }
        if self.success_view.contains.is_empty() && self.success_view.ends_with.is_empty() {
            return Err(ProbeError::config(format!(
                "entity '{}' has no success view pattern",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod preset_tests {
        use super::*;

        #[test]
        fn test_all_presets_parse() {
            for name in preset_names() {
                let config = EntityConfig::preset(name).unwrap();
                assert_eq!(config.name, name);
                assert!(!config.fields.is_empty());
            }
        }

        #[test]
        fn test_preset_lookup_is_case_insensitive() {
            assert_eq!(EntityConfig::preset("LIBRO").unwrap().name, "libro");
        }

        #[test]
        fn test_unknown_preset() {
            let err = EntityConfig::preset("autor").unwrap_err();
            assert!(err.to_string().contains("libro"));
        }

        #[test]
        fn test_libro_layout() {
            let libro = EntityConfig::preset("libro").unwrap();
            assert_eq!(libro.create_url(), "http://localhost:5183/Libro/Create");
            assert_eq!(libro.table.expected_column, "RESULTADO ESPERADO");
            assert_eq!(libro.fields.resolve("FechaPub").unwrap().name, "fecha_publicacion");
            assert_eq!(libro.fields.error_probes().len(), 6);
        }

        #[test]
        fn test_ejemplar_seeds_book() {
            let ejemplar = EntityConfig::preset("ejemplar").unwrap();
            let seeded: Vec<_> = ejemplar.fields.auto_seeded().map(|f| &f.name).collect();
            assert_eq!(seeded, vec!["idlibro"]);
            let disponible = ejemplar.fields.resolve("Disponible").unwrap();
            assert_eq!(disponible.input_value("No Disponible"), "false");
            assert_eq!(disponible.input_value("Disponible"), "true");
        }

        #[test]
        fn test_lector_success_view() {
            let lector = EntityConfig::preset("lector").unwrap();
            assert!(lector
                .success_view
                .matches("http://localhost:5183/Usuario/Index"));
            assert!(lector.success_view.matches("http://localhost:5183/Usuario"));
            assert!(!lector
                .success_view
                .matches("http://localhost:5183/Usuario/Create"));
        }

        #[test]
        fn test_yaml_round_trip_preserves_preset() {
            let libro = EntityConfig::preset("libro").unwrap();
            let reparsed = EntityConfig::from_yaml(&libro.to_yaml().unwrap()).unwrap();
            assert_eq!(reparsed, libro);
        }
    }

    mod descriptor_tests {
        use super::*;

        const MINIMAL: &str = r##"
name: autor
create_path: /Autor/Create
success_view:
  contains: ["/Autor/Index"]
fields:
  - name: nombre
    selector: "#nombre"
"##;

        #[test]
        fn test_defaults_applied() {
            let config = EntityConfig::from_yaml(MINIMAL).unwrap();
            assert_eq!(config.base_url, DEFAULT_BASE_URL);
            assert_eq!(config.table.case_id_column, "CASO");
            assert_eq!(config.submit_selector, "[data-testid='submit-button']");
            assert_eq!(config.timeouts, Timeouts::default());
            assert_eq!(config.report.csv, "test_results.csv");
        }

        #[test]
        fn test_base_url_override_trims_slash() {
            let config = EntityConfig::from_yaml(MINIMAL)
                .unwrap()
                .with_base_url("http://10.0.0.5:8080/");
            assert_eq!(config.create_url(), "http://10.0.0.5:8080/Autor/Create");
        }

        #[test]
        fn test_missing_success_view_rejected() {
            let yaml = MINIMAL.replace("  contains: [\"/Autor/Index\"]\n", "  contains: []\n");
            let err = EntityConfig::from_yaml(&yaml).unwrap_err();
            assert!(err.to_string().contains("success view"));
        }

        #[test]
        fn test_partial_timeouts() {
            let yaml = format!("{MINIMAL}timeouts:\n  settle_ms: 500\n");
            let config = EntityConfig::from_yaml(&yaml).unwrap();
            assert_eq!(config.timeouts.settle(), Duration::from_millis(500));
            assert_eq!(config.timeouts.navigation_ms, DEFAULT_WAIT_TIMEOUT_MS);
        }

        #[test]
        fn test_from_missing_path() {
            let err = EntityConfig::from_path(Path::new("/nonexistent/autor.yaml")).unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
        }

        #[test]
        fn test_ignored_columns() {
            let layout = TableLayout {
                ignored_columns: vec!["Descripción del caso".to_string()],
                ..TableLayout::default()
            };
            assert!(layout.is_ignored(" Descripción del caso"));
            assert!(!layout.is_ignored("TITULO"));
        }
    }
}
