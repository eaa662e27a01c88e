//! # sales-guard
//!
//! A validation and enrichment pass for retail "Superstore" order-line CSV
//! exports. One run reads a pre-cleaned file, counts every structural and
//! semantic anomaly, adds derived columns, computes a handful of business
//! insights and writes an enriched CSV plus a report.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sales_guard::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let config = GuardConfig {
//!     input_path: "data/Superstore_Cleaned.csv".into(),
//!     ..GuardConfig::default()
//! };
//! let outcome = Validator::new(config).run().await?;
//!
//! println!("{} rows, {} issues", outcome.report.summary.rows, outcome.report.issues.total());
//! println!("breakeven: {}", outcome.report.insights.breakeven);
//! # Ok(())
//! # }
//! ```
//!
//! ## Count, never abort
//!
//! Record-level problems are never errors. A missing cell, an unknown
//! region, a duplicate row id or a ship date before the order date is
//! counted in the [`IssueLedger`](checks::IssueLedger) and the line is kept.
//! A value that cannot be parsed leaves only the fields derived from it
//! undefined. [`GuardError`](error::GuardError) is reserved for file-level
//! failures: a missing input, a header with the wrong number of columns, an
//! unwritable output or an invalid configuration.
//!
//! ## Modules
//!
//! - [`sources`]: registers the input with DataFusion and decodes raw lines
//! - [`model`]: column layout, closed enums and typed order lines
//! - [`checks`]: record checks and the issue ledger
//! - [`enrich`]: derived columns and their Arrow views
//! - [`insights`]: grouped aggregates over the enriched lines
//! - [`formatters`], [`sinks`]: report rendering and output files
//! - [`pipeline`]: the end-to-end [`Validator`](pipeline::Validator)

pub mod checks;
pub mod config;
pub mod enrich;
pub mod error;
pub mod formatters;
pub mod insights;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod prelude;
pub mod report;
pub mod sinks;
pub mod sources;

#[cfg(test)]
mod test_fixtures;
