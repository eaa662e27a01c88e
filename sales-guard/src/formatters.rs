//! Report formatting.
//!
//! A [`ValidationReport`] renders either as the sectioned plain-text report
//! (the default, written next to the enriched CSV) or as JSON for other
//! tools to consume.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sales_guard::formatters::{FormatterConfig, HumanFormatter, ReportFormatter};
//! # fn example(report: &sales_guard::report::ValidationReport) -> sales_guard::prelude::Result<()> {
//! let formatter = HumanFormatter::with_config(FormatterConfig::minimal());
//! println!("{}", formatter.format(report)?);
//! # Ok(())
//! # }
//! ```

use crate::checks::{IssueClass, IssueKind};
use crate::config::ReportFormat;
use crate::insights::GroupPerformance;
use crate::model::RowRef;
use crate::prelude::*;
use crate::report::ValidationReport;
use std::fmt::Write;

const RULE_WIDTH: usize = 70;

/// Configuration options for rendering a report.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Example row references shown per issue kind
    pub max_examples: usize,
    /// Include the regional, category, volume and yearly insights
    pub include_supplemental: bool,
    /// Include the generation timestamp
    pub include_timestamp: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_examples: 5,
            include_supplemental: true,
            include_timestamp: true,
        }
    }
}

impl FormatterConfig {
    /// Counts and the core insights only, without a timestamp.
    ///
    /// Output under this preset is stable across runs on the same input.
    pub fn minimal() -> Self {
        Self {
            max_examples: 0,
            include_supplemental: false,
            include_timestamp: false,
        }
    }

    pub fn with_max_examples(mut self, max: usize) -> Self {
        self.max_examples = max;
        self
    }

    pub fn with_supplemental(mut self, include: bool) -> Self {
        self.include_supplemental = include;
        self
    }

    pub fn with_timestamp(mut self, include: bool) -> Self {
        self.include_timestamp = include;
        self
    }
}

/// Renders a validation report into a string.
pub trait ReportFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String>;
}

/// Returns the formatter for `format`.
pub fn formatter_for(format: ReportFormat, config: FormatterConfig) -> Box<dyn ReportFormatter> {
    match format {
        ReportFormat::Text => Box::new(HumanFormatter::with_config(config)),
        ReportFormat::Json => Box::new(JsonFormatter::with_config(config)),
    }
}

/// Formats reports as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        let mut value = serde_json::to_value(report)?;
        if let Some(object) = value.as_object_mut() {
            if !self.config.include_timestamp {
                object.remove("generated_at");
            }
            if !self.config.include_supplemental {
                if let Some(insights) = object.get_mut("insights").and_then(|v| v.as_object_mut()) {
                    for key in ["regions", "categories", "high_volume_losses", "years"] {
                        insights.remove(key);
                    }
                }
            }
        }

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(rendered)
    }
}

/// Formats reports as sectioned plain text.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn write_header(&self, out: &mut String, report: &ValidationReport) -> Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(out, "{rule}")?;
        writeln!(out, "SUPERSTORE DATA VALIDATION & INSIGHTS REPORT")?;
        if self.config.include_timestamp {
            writeln!(
                out,
                "Generated: {}",
                report.generated_at.format("%Y-%m-%d %H:%M:%S")
            )?;
        }
        writeln!(out, "{rule}")?;
        writeln!(out)?;

        writeln!(out, "INPUT FILE:")?;
        writeln!(out, "  {}", report.input.display())?;
        writeln!(out)?;
        writeln!(out, "OUTPUT FILE:")?;
        writeln!(out, "  {}", report.output.display())?;
        writeln!(out)?;
        writeln!(out, "DATA SUMMARY:")?;
        writeln!(out, "  Total rows: {}", thousands(report.summary.rows as f64, 0))?;
        writeln!(
            out,
            "  Total columns: {} ({} input + {} derived)",
            report.summary.output_columns,
            report.summary.input_columns,
            report.summary.output_columns - report.summary.input_columns
        )?;
        if let Some(tiers) = report.sales_tiers {
            writeln!(
                out,
                "  Sales tiers: Low <= {}, Medium <= {}, High above",
                currency(tiers.low_max, 2),
                currency(tiers.medium_max, 2)
            )?;
        }
        Ok(())
    }

    fn write_validation(&self, out: &mut String, report: &ValidationReport) -> Result<()> {
        section(out, "VALIDATION RESULTS")?;
        writeln!(out, "Checks run: {}", report.checks.len())?;
        for check in &report.checks {
            writeln!(out, "   • {}: {}", check.name, check.description)?;
        }
        writeln!(out)?;

        let issues = &report.issues;
        for kind in IssueKind::ALL {
            let count = issues.count(kind);
            if count == 0 {
                writeln!(out, "✅ No {}", kind.describe())?;
                continue;
            }
            writeln!(
                out,
                "⚠️  {} {} ({})",
                thousands(count as f64, 0),
                kind.describe(),
                kind.class().label()
            )?;
            for (column, n) in issues.by_column(kind) {
                writeln!(out, "   • {}: {}", column, thousands(n as f64, 0))?;
            }
            let examples = issues.examples(kind);
            if self.config.max_examples > 0 && !examples.is_empty() {
                let shown = &examples[..examples.len().min(self.config.max_examples)];
                writeln!(out, "   Examples: {}", join_rows(shown))?;
            }
        }

        writeln!(out)?;
        let totals: Vec<String> = IssueClass::ALL
            .iter()
            .map(|class| format!("{} {}", class.label(), issues.class_total(*class)))
            .collect();
        writeln!(out, "Issue totals: {}", totals.join(" | "))?;
        if report.has_blocking_issues() {
            writeln!(
                out,
                "⚠️  Found {} structural or range issues (review recommended)",
                thousands(
                    (issues.class_total(IssueClass::Structural)
                        + issues.class_total(IssueClass::Range)) as f64,
                    0
                )
            )?;
        } else {
            writeln!(out, "✅ No structural or range issues")?;
        }
        Ok(())
    }

    fn write_insights(&self, out: &mut String, report: &ValidationReport) -> Result<()> {
        let insights = &report.insights;
        section(out, "AUTOMATED BUSINESS INSIGHTS")?;

        writeln!(out)?;
        writeln!(out, "📉 Average Profit Margin by Discount Band:")?;
        if insights.band_margins.is_empty() {
            writeln!(out, "   (no lines with a defined margin and discount band)")?;
        }
        for margin in &insights.band_margins {
            let status = if margin.mean_margin > 0.0 { "✅" } else { "❌" };
            writeln!(
                out,
                "   {status} {}: {:.2}% ({} lines)",
                margin.band,
                margin.mean_margin * 100.0,
                thousands(margin.lines as f64, 0)
            )?;
        }
        writeln!(out, "   Breakeven: {}", insights.breakeven)?;

        writeln!(out)?;
        writeln!(out, "🔴 Loss-Making Sub-Categories:")?;
        if insights.loss_sub_categories.is_empty() {
            writeln!(out, "   (none)")?;
        }
        for loss in &insights.loss_sub_categories {
            writeln!(out, "   • {}: {}", loss.sub_category, currency(loss.total_profit, 2))?;
        }

        writeln!(out)?;
        writeln!(
            out,
            "🔥 Extreme Losses (margin below {:.0}%): {}",
            insights.extreme_loss_margin * 100.0,
            thousands(insights.extreme_losses.len() as f64, 0)
        )?;
        if !insights.extreme_losses.is_empty() {
            let rows: Vec<RowRef> = insights.extreme_losses.iter().map(|loss| loss.row).collect();
            writeln!(out, "   {}", join_rows(&rows))?;
        }

        if !self.config.include_supplemental {
            return Ok(());
        }

        writeln!(out)?;
        writeln!(out, "🌎 Regional Performance (ranked by profit):")?;
        for region in &insights.regions {
            writeln!(out, "   • {}", group_line(region, false))?;
        }

        writeln!(out)?;
        writeln!(out, "📦 Category Performance:")?;
        for category in &insights.categories {
            writeln!(out, "   • {}", group_line(category, true))?;
        }

        let volume = &insights.high_volume_losses;
        if !volume.sub_categories.is_empty() {
            writeln!(out)?;
            writeln!(out, "⚠️  High-Volume but Loss-Making Sub-Categories:")?;
            for loss in &volume.sub_categories {
                writeln!(
                    out,
                    "   • {}: {} units sold but {} loss",
                    loss.sub_category,
                    thousands(loss.total_quantity as f64, 0),
                    currency(loss.total_profit, 2)
                )?;
            }
        }

        if !insights.years.is_empty() {
            writeln!(out)?;
            writeln!(out, "📅 Yearly Totals:")?;
            for year in &insights.years {
                writeln!(
                    out,
                    "   • {}: {} lines | Sales {} | Profit {}",
                    year.year,
                    thousands(year.lines as f64, 0),
                    currency(year.total_sales, 0),
                    currency(year.total_profit, 0)
                )?;
            }
        }
        Ok(())
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        let mut out = String::new();
        self.write_header(&mut out, report)?;
        self.write_validation(&mut out, report)?;
        self.write_insights(&mut out, report)?;
        writeln!(out)?;
        writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
        Ok(out)
    }
}

fn section(out: &mut String, title: &str) -> Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{rule}")?;
    Ok(())
}

fn group_line(group: &GroupPerformance, with_margin: bool) -> String {
    let mut line = format!(
        "{}: Sales {} | Profit {}",
        group.name,
        currency(group.total_sales, 0),
        currency(group.total_profit, 0)
    );
    if with_margin {
        match group.mean_margin {
            Some(margin) => line.push_str(&format!(" | Avg Margin {:.2}%", margin * 100.0)),
            None => line.push_str(" | Avg Margin n/a"),
        }
    }
    line
}

fn join_rows(rows: &[RowRef]) -> String {
    rows.iter()
        .map(RowRef::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats `value` with `decimals` places and comma thousands separators.
fn thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    if value < 0.0 && grouped.chars().any(|c| c.is_ascii_digit() && c != '0') {
        grouped.insert(0, '-');
    }
    grouped
}

fn currency(value: f64, decimals: usize) -> String {
    let amount = thousands(value, decimals);
    match amount.strip_prefix('-') {
        Some(positive) => format!("-${positive}"),
        None => format!("${amount}"),
    }
}
