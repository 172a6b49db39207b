// Analysis configuration
//
// Thresholds, column names and narrative claims live here so a rerun of the
// report is fully described by one TOML file plus the input data.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating an [`AnalysisConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Header names for each required input column
///
/// Matching is case-insensitive and ignores surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub participant_id: String,
    pub gender: String,
    pub age: String,
    pub aq_score: String,
    pub platform: String,
    pub dominant: String,
    pub non_dominant: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            participant_id: "participant_id".to_string(),
            gender: "gender".to_string(),
            age: "age".to_string(),
            aq_score: "aq_score".to_string(),
            platform: "platform".to_string(),
            dominant: "ftt_dominant".to_string(),
            non_dominant: "ftt_nondominant".to_string(),
        }
    }
}

impl ColumnNames {
    /// (field label, header name) pairs in schema order
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("participant_id", &self.participant_id),
            ("gender", &self.gender),
            ("age", &self.age),
            ("aq_score", &self.aq_score),
            ("platform", &self.platform),
            ("dominant", &self.dominant),
            ("non_dominant", &self.non_dominant),
        ]
    }
}

/// Figures quoted in hand-written prose that must agree with the fitted models
///
/// Values are whole percentages of explained variance (R² x 100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeClaims {
    pub dominant_r2_percent: Option<f64>,
    pub nondominant_r2_percent: Option<f64>,
    /// Allowed absolute difference in percentage points
    pub tolerance_percent: f64,
}

impl Default for NarrativeClaims {
    fn default() -> Self {
        Self {
            dominant_r2_percent: None,
            nondominant_r2_percent: None,
            tolerance_percent: 0.5,
        }
    }
}

/// Configuration for one run of the analysis
///
/// # Example
/// ```
/// use aqtap::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.significance_level, 0.05);
/// assert_eq!(config.min_dominant_taps, 3.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rows whose dominant-hand score is at or below this value are dropped
    ///
    /// Fewer than this many taps means the participant did not attempt the
    /// task properly.
    pub min_dominant_taps: f64,

    /// Alpha used for the normality-driven test choice and Johnson-Neyman
    /// boundaries
    ///
    /// Correlation stars keep the conventional .05/.01/.001 cut-offs.
    pub significance_level: f64,

    /// Coverage of coefficient and simple-slope confidence intervals
    pub confidence_level: f64,

    /// Field delimiter of the input file
    pub delimiter: char,

    /// Seed for the jitter applied to point clouds in figures
    pub jitter_seed: u64,

    pub columns: ColumnNames,

    pub narrative: NarrativeClaims,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_dominant_taps: 3.0,
            significance_level: 0.05,
            confidence_level: 0.95,
            delimiter: ',',
            jitter_seed: 42,
            columns: ColumnNames::default(),
            narrative: NarrativeClaims::default(),
        }
    }
}

impl AnalysisConfig {
    /// Stricter inference: 99% confidence, alpha 0.01
    pub fn strict() -> Self {
        Self {
            significance_level: 0.01,
            confidence_level: 0.99,
            ..Self::default()
        }
    }

    /// Load and validate a TOML configuration file
    ///
    /// Keys absent from the file keep their defaults.
    ///
    /// # Example TOML
    /// ```toml
    /// min_dominant_taps = 3
    /// significance_level = 0.05
    ///
    /// [columns]
    /// aq_score = "AQ10"
    ///
    /// [narrative]
    /// dominant_r2_percent = 22
    /// nondominant_r2_percent = 12
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            )));
        }

        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }

        if !self.min_dominant_taps.is_finite() || self.min_dominant_taps < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_dominant_taps must be a non-negative number, got {}",
                self.min_dominant_taps
            )));
        }

        if self.delimiter == '"' || self.delimiter == '\n' || self.delimiter == '\r' {
            return Err(ConfigError::Invalid(format!(
                "delimiter {:?} cannot be used",
                self.delimiter
            )));
        }

        for (field, header) in self.columns.entries() {
            if header.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "column name for '{}' must not be empty",
                    field
                )));
            }
        }

        if self.narrative.tolerance_percent < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "narrative.tolerance_percent must be non-negative, got {}",
                self.narrative.tolerance_percent
            )));
        }

        Ok(())
    }
}
