//! Numeric range checks.

use super::{IssueKind, IssueLedger, RecordCheck};
use crate::model::{Column, OrderLine};
use tracing::debug;

/// Flags a numeric column whose parsed value falls outside an allowed range.
///
/// Missing and malformed cells are left to the completeness and validity
/// checks; a range check only sees values that parsed.
#[derive(Debug, Clone)]
pub struct RangeCheck {
    name: &'static str,
    description: &'static str,
    column: Column,
    kind: IssueKind,
    value: fn(&OrderLine) -> Option<f64>,
    allowed: fn(f64) -> bool,
}

impl RangeCheck {
    /// Discount must be a fraction in `[0, 1]`.
    pub fn discount_fraction() -> Self {
        Self {
            name: "discount_range",
            description: "Discount lies within [0, 1]",
            column: Column::Discount,
            kind: IssueKind::DiscountOutOfRange,
            value: |line| line.discount.get(),
            allowed: |discount| (0.0..=1.0).contains(&discount),
        }
    }

    /// Sales must not be negative. Negative profit is legitimate and is not
    /// checked anywhere.
    pub fn non_negative_sales() -> Self {
        Self {
            name: "non_negative_sales",
            description: "Sales amount is not negative",
            column: Column::Sales,
            kind: IssueKind::NegativeSales,
            value: |line| line.sales.get(),
            allowed: |sales| sales >= 0.0,
        }
    }

    /// Quantity must be at least one.
    pub fn positive_quantity() -> Self {
        Self {
            name: "positive_quantity",
            description: "Quantity is a positive integer",
            column: Column::Quantity,
            kind: IssueKind::NonPositiveQuantity,
            value: |line| line.quantity.get().map(|quantity| quantity as f64),
            allowed: |quantity| quantity >= 1.0,
        }
    }

    /// The column this check reads.
    pub fn column(&self) -> Column {
        self.column
    }
}

impl RecordCheck for RangeCheck {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn inspect(&mut self, line: &OrderLine, ledger: &mut IssueLedger) {
        let Some(value) = (self.value)(line) else {
            return;
        };
        if !(self.allowed)(value) {
            debug!(
                check.name = %self.name,
                record = %line.row_ref(),
                column = %self.column,
                value,
                "Value out of range"
            );
            ledger.record_in_column(self.kind, self.column, line.row_ref());
        }
    }
}
