//! Run configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional TOML file, then command-line flags (applied by the binary).
//!
//! ```toml
//! input_path = "data/Superstore_Cleaned.csv"
//! output_path = "data/Superstore_Final_Cleaned.csv"
//! report_path = "data/validation_report.txt"
//! delimiter = ","
//! encoding = "auto"
//! date_formats = ["%m/%d/%Y", "%Y-%m-%d"]
//! extreme_loss_margin = -2.0
//! max_examples = 10
//! report_format = "text"
//!
//! [sales_tiers]
//! mode = "fixed"
//! low_max = 50.0
//! medium_max = 250.0
//! ```

use crate::model::DEFAULT_DATE_FORMATS;
use crate::prelude::*;
use crate::sources::{CsvOptions, InputEncoding};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// How sales tier thresholds are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SalesTierPolicy {
    /// Thresholds at the given quantiles of the observed sales.
    Quantile { low: f64, high: f64 },
    /// Fixed inclusive upper bounds for Low and Medium.
    Fixed { low_max: f64, medium_max: f64 },
}

impl Default for SalesTierPolicy {
    fn default() -> Self {
        SalesTierPolicy::Quantile {
            low: 0.33,
            high: 0.67,
        }
    }
}

/// Output format of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    /// Cleaned input CSV
    pub input_path: PathBuf,
    /// Enriched output CSV
    pub output_path: PathBuf,
    /// Validation and insight report
    pub report_path: PathBuf,
    /// Field delimiter of the input, reused for the enriched output
    pub delimiter: char,
    /// Input character encoding
    pub encoding: InputEncoding,
    /// `chrono` date formats, tried in order
    pub date_formats: Vec<String>,
    pub sales_tiers: SalesTierPolicy,
    /// Lines with a profit margin below this are extreme losses
    pub extreme_loss_margin: f64,
    /// Example row references kept per issue kind
    pub max_examples: usize,
    pub report_format: ReportFormat,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/Superstore_Cleaned.csv"),
            output_path: PathBuf::from("data/Superstore_Final_Cleaned.csv"),
            report_path: PathBuf::from("data/validation_report.txt"),
            delimiter: ',',
            encoding: InputEncoding::Auto,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            sales_tiers: SalesTierPolicy::default(),
            extreme_loss_margin: -2.0,
            max_examples: 10,
            report_format: ReportFormat::Text,
        }
    }
}

impl GuardConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GuardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    #[instrument]
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config file '{}'", path.display()))?;
        let config = Self::from_toml_str(&content)?;
        debug!(config.path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Reader options for the input file.
    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.delimiter as u8,
            encoding: self.encoding,
            ..CsvOptions::default()
        }
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '"' | '\n' | '\r') {
            return Err(GuardError::Configuration(format!(
                "delimiter must be a single ASCII character other than a quote or newline, got {:?}",
                self.delimiter
            )));
        }
        if self.date_formats.is_empty() {
            return Err(GuardError::Configuration(
                "at least one date format is required".to_string(),
            ));
        }
        if self.output_path == self.input_path || self.report_path == self.input_path {
            return Err(GuardError::Configuration(format!(
                "outputs must not overwrite the input file '{}'",
                self.input_path.display()
            )));
        }
        if !self.extreme_loss_margin.is_finite() {
            return Err(GuardError::Configuration(
                "extreme_loss_margin must be a finite number".to_string(),
            ));
        }
        match self.sales_tiers {
            SalesTierPolicy::Quantile { low, high } => {
                if !(0.0 < low && low < high && high < 1.0) {
                    return Err(GuardError::Configuration(format!(
                        "sales tier quantiles must satisfy 0 < low < high < 1, got {low} and {high}"
                    )));
                }
            }
            SalesTierPolicy::Fixed {
                low_max,
                medium_max,
            } => {
                if !(0.0 <= low_max && low_max < medium_max && medium_max.is_finite()) {
                    return Err(GuardError::Configuration(format!(
                        "sales tier thresholds must satisfy 0 <= low_max < medium_max, got {low_max} and {medium_max}"
                    )));
                }
            }
        }
        Ok(())
    }
}
