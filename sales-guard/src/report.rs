//! The validation report: everything one run found, ready for a formatter.

use crate::checks::{IssueClass, IssueLedger};
use crate::enrich::SalesTierThresholds;
use crate::insights::Insights;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;

/// Row and column counts of the enriched output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataSummary {
    pub rows: usize,
    pub input_columns: usize,
    pub output_columns: usize,
}

/// A check that ran over every line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub generated_at: DateTime<Local>,
    pub input: PathBuf,
    pub output: PathBuf,
    pub summary: DataSummary,
    pub checks: Vec<CheckSummary>,
    /// Thresholds used for the Sales Tier column, if any could be resolved
    pub sales_tiers: Option<SalesTierThresholds>,
    pub issues: IssueLedger,
    pub insights: Insights,
}

impl ValidationReport {
    /// Whether any structural or range issue was counted.
    ///
    /// Derivation failures are expected on real data and do not count.
    pub fn has_blocking_issues(&self) -> bool {
        self.issues.class_total(IssueClass::Structural) > 0
            || self.issues.class_total(IssueClass::Range) > 0
    }
}
