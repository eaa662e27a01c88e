//! Logging setup for the `sales-guard` binary and helpers for log fields.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary (or a test) through [`init_logging`].

use crate::prelude::*;
use tracing::Level;

/// Configuration for the global subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for dependencies (DataFusion and friends)
    pub level: Level,
    /// Log level for sales-guard itself
    pub crate_level: Level,
    /// Whether to use JSON output format
    pub json_format: bool,
    /// Environment filter override
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            crate_level: Level::INFO,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Structured output for log shippers.
    pub fn production() -> Self {
        Self {
            level: Level::WARN,
            crate_level: Level::INFO,
            json_format: true,
            env_filter: None,
        }
    }

    /// Per-record anomalies included.
    pub fn development() -> Self {
        Self {
            level: Level::INFO,
            crate_level: Level::DEBUG,
            json_format: false,
            env_filter: None,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_crate_level(mut self, level: Level) -> Self {
        self.crate_level = level;
        self
    }

    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the environment filter string.
    pub fn env_filter(&self) -> String {
        match &self.env_filter {
            Some(filter) => filter.clone(),
            None => format!(
                "{},sales_guard={}",
                self.level.as_str().to_lowercase(),
                self.crate_level.as_str().to_lowercase()
            ),
        }
    }
}

/// Installs the global subscriber. `RUST_LOG`, when set, wins over `config`.
///
/// Fails if a subscriber is already installed.
///
/// # Examples
///
/// ```rust,no_run
/// use sales_guard::logging::{init_logging, LoggingConfig};
///
/// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
/// ```
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| GuardError::Configuration(format!("failed to install logger: {e}")))
}

/// Truncates a value for logging, never splitting a character.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter() {
        assert_eq!(LoggingConfig::default().env_filter(), "warn,sales_guard=info");
        assert_eq!(
            LoggingConfig::development().env_filter(),
            "info,sales_guard=debug"
        );
        assert_eq!(
            LoggingConfig::default()
                .with_env_filter("sales_guard::checks=trace")
                .env_filter(),
            "sales_guard::checks=trace"
        );
    }

    #[test]
    fn test_presets() {
        assert!(LoggingConfig::production().json_format);
        let config = LoggingConfig::default()
            .with_level(Level::ERROR)
            .with_crate_level(Level::TRACE);
        assert_eq!(config.env_filter(), "error,sales_guard=trace");
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text that should be truncated", 10),
            "this is a ...(truncated)"
        );
        // 'é' is two bytes; cutting at byte 2 would split it.
        assert_eq!(truncate_field("cé-lamp", 2), "c...(truncated)");
    }
}
