//! Prelude for commonly used types and traits in sales-guard.

pub use crate::config::GuardConfig;
pub use crate::error::{ErrorContext, GuardError, Result};
pub use crate::formatters::ReportFormatter;
pub use crate::pipeline::Validator;
