//! The validation and enrichment run.
//!
//! ```text
//! CSV ──register──▶ raw lines ──parse──▶ typed lines ──checks──▶ IssueLedger
//!                                             │
//!                                          enrich
//!                                             ▼
//!                           enriched lines ──insights──▶ Insights
//!                                   │
//!                       enriched CSV + report
//! ```
//!
//! [`Validator::validate_and_enrich`] is the synchronous core: it is total,
//! so every input line comes out enriched and every anomaly ends up in the
//! ledger. [`Validator::run`] wraps it with the file I/O and the insight
//! queries.

use crate::checks::{standard_checks, IssueClass, IssueKind, IssueLedger};
use crate::config::GuardConfig;
use crate::enrich::batch::output_batch;
use crate::enrich::{EnrichedLine, Enricher, SalesTierThresholds};
use crate::formatters::{formatter_for, FormatterConfig};
use crate::insights::InsightEngine;
use crate::model::{DateParser, OrderLine, RawOrderLine, COLUMN_COUNT};
use crate::prelude::*;
use crate::report::{CheckSummary, DataSummary, ValidationReport};
use crate::sinks::{write_report, CsvSink};
use crate::sources::{load_raw_lines, CsvSource, DataSource};
use chrono::Local;
use datafusion::prelude::{SessionConfig, SessionContext};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Name under which the input file is registered.
pub const INPUT_TABLE: &str = "order_lines";

/// Output of the synchronous validation and enrichment pass.
#[derive(Debug, Clone)]
pub struct ValidatedLines {
    /// One per input line, in input order
    pub lines: Vec<EnrichedLine>,
    pub ledger: IssueLedger,
    pub checks: Vec<CheckSummary>,
    pub sales_tiers: Option<SalesTierThresholds>,
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: ValidationReport,
    pub lines: Vec<EnrichedLine>,
    /// The report as written to the report path
    pub rendered: String,
}

/// Runs validation and enrichment for one configuration.
#[derive(Debug, Clone)]
pub struct Validator {
    config: GuardConfig,
}

impl Validator {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// A session that keeps rows in file order.
    pub fn session() -> SessionContext {
        SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1))
    }

    /// Parses, checks and enriches `raw` in a single pass.
    #[instrument(skip(self, raw), fields(lines = raw.len()))]
    pub fn validate_and_enrich(&self, raw: Vec<RawOrderLine>) -> ValidatedLines {
        let dates = DateParser::new(&self.config.date_formats);
        let typed: Vec<OrderLine> = raw
            .into_iter()
            .map(|line| OrderLine::parse(line, &dates))
            .collect();

        let mut checks = standard_checks();
        let mut ledger = IssueLedger::new(self.config.max_examples);
        for line in &typed {
            ledger.inspected();
            for check in checks.iter_mut() {
                check.inspect(line, &mut ledger);
            }
        }

        let sales_tiers = SalesTierThresholds::resolve(
            &self.config.sales_tiers,
            typed.iter().filter_map(|line| line.sales.get()),
        );
        debug!(sales_tiers = ?sales_tiers, "Resolved sales tier thresholds");

        let enricher = Enricher::new(sales_tiers);
        let lines: Vec<EnrichedLine> = typed
            .into_iter()
            .map(|line| {
                let enriched = enricher.enrich(line);
                if enriched.derived.profit_margin.is_none() {
                    ledger.record(IssueKind::UndefinedMargin, enriched.line.row_ref());
                }
                enriched
            })
            .collect();

        info!(
            ledger.inspected = ledger.records_inspected(),
            ledger.structural = ledger.class_total(IssueClass::Structural),
            ledger.range = ledger.class_total(IssueClass::Range),
            ledger.derivation = ledger.class_total(IssueClass::Derivation),
            "Validation pass completed"
        );

        ValidatedLines {
            lines,
            ledger,
            checks: checks
                .iter()
                .map(|check| CheckSummary {
                    name: check.name().to_string(),
                    description: check.description().to_string(),
                })
                .collect(),
            sales_tiers,
        }
    }

    /// Reads the input, writes the enriched CSV and the report.
    ///
    /// Record-level anomalies never fail the run; only file-level problems
    /// (missing input, malformed header, unwritable outputs) return an error.
    #[instrument(skip(self), fields(
        input.path = %self.config.input_path.display(),
        output.path = %self.config.output_path.display(),
    ))]
    pub async fn run(&self) -> Result<RunOutcome> {
        info!("Starting validation run");
        let start_time = Instant::now();
        self.config.validate()?;

        let ctx = Self::session();
        let options = self.config.csv_options();
        let source = CsvSource::with_options(&self.config.input_path, options);
        source.register(&ctx, INPUT_TABLE).await?;
        let raw = load_raw_lines(&ctx, INPUT_TABLE).await?;
        info!(
            source = %source.description(),
            rows = raw.len(),
            "Loaded input"
        );

        let validated = self.validate_and_enrich(raw);
        let insights = InsightEngine::new(self.config.extreme_loss_margin)
            .run(&ctx, &validated.lines)
            .await?;

        let batch = output_batch(&validated.lines)?;
        let report = ValidationReport {
            generated_at: Local::now(),
            input: self.config.input_path.clone(),
            output: self.config.output_path.clone(),
            summary: DataSummary {
                rows: validated.lines.len(),
                input_columns: COLUMN_COUNT,
                output_columns: batch.num_columns(),
            },
            checks: validated.checks,
            sales_tiers: validated.sales_tiers,
            issues: validated.ledger,
            insights,
        };

        // Render first so a formatting failure writes nothing.
        let formatter = formatter_for(
            self.config.report_format,
            FormatterConfig::default().with_max_examples(self.config.max_examples),
        );
        let rendered = formatter.format(&report)?;

        CsvSink::new(&self.config.output_path)
            .with_delimiter(options.delimiter)
            .write(&[batch])
            .await?;
        write_report(&self.config.report_path, &rendered).await?;

        info!(
            rows = report.summary.rows,
            issues.total = report.issues.total(),
            issues.blocking = report.has_blocking_issues(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Validation run completed"
        );
        Ok(RunOutcome {
            report,
            lines: validated.lines,
            rendered,
        })
    }
}
