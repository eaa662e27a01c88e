//! `sales-guard` command-line entry point.
//!
//! Exit codes: 0 when the run completes, 1 on a file-level error, 2 when
//! `--strict` is set and any structural or range issue was counted.

use anyhow::{Context, Result};
use clap::Parser;
use sales_guard::config::{GuardConfig, ReportFormat};
use sales_guard::logging::{init_logging, LoggingConfig};
use sales_guard::pipeline::Validator;
use sales_guard::sources::InputEncoding;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, Level};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cleaned order-line CSV to validate
    #[arg(long, env = "SALES_GUARD_INPUT")]
    input: Option<PathBuf>,

    /// Where to write the enriched CSV
    #[arg(long, env = "SALES_GUARD_OUTPUT")]
    output: Option<PathBuf>,

    /// Where to write the report
    #[arg(long, env = "SALES_GUARD_REPORT")]
    report: Option<PathBuf>,

    /// TOML configuration file; flags override its values
    #[arg(long, env = "SALES_GUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Input encoding; `auto` falls back to Windows-1252 when the file is not UTF-8
    #[arg(long, value_enum)]
    encoding: Option<InputEncoding>,

    /// Field delimiter of the input and the enriched output
    #[arg(long)]
    delimiter: Option<char>,

    /// Log level for sales-guard (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Exit with status 2 if any structural or range issue is found
    #[arg(long)]
    strict: bool,
}

impl Args {
    async fn resolve_config(&self) -> Result<GuardConfig> {
        let mut config = match &self.config {
            Some(path) => GuardConfig::load(path)
                .await
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => GuardConfig::default(),
        };
        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(report) = &self.report {
            config.report_path = report.clone();
        }
        if let Some(format) = self.format {
            config.report_format = format;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = args.resolve_config().await?;
    let outcome = Validator::new(config.clone())
        .run()
        .await
        .with_context(|| format!("validating {}", config.input_path.display()))?;

    let report = &outcome.report;
    println!(
        "✅ Validated {} rows: {} issues counted",
        report.summary.rows,
        report.issues.total()
    );
    println!("📁 Enriched CSV: {}", config.output_path.display());
    println!("📁 Report: {}", config.report_path.display());

    if args.strict && report.has_blocking_issues() {
        println!("⚠️  Structural or range issues found (--strict)");
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let logging = LoggingConfig::default()
        .with_crate_level(args.log_level)
        .with_json_format(args.json_logs);
    if let Err(e) = init_logging(logging) {
        eprintln!("warning: {e}");
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("❌ {e:#}");
            ExitCode::from(1)
        }
    }
}
