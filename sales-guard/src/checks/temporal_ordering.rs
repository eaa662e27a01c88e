//! Ship date versus order date.

use super::{IssueKind, IssueLedger, RecordCheck};
use crate::model::{Column, OrderLine};
use tracing::debug;

/// Flags lines shipped before they were ordered. Same-day shipping is fine.
/// Lines where either date did not parse are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShipAfterOrderCheck;

impl RecordCheck for ShipAfterOrderCheck {
    fn name(&self) -> &str {
        "ship_after_order"
    }

    fn description(&self) -> &str {
        "Ship date is on or after the order date"
    }

    fn inspect(&mut self, line: &OrderLine, ledger: &mut IssueLedger) {
        let (Some(ordered), Some(shipped)) = (line.order_date.get(), line.ship_date.get()) else {
            return;
        };
        if shipped < ordered {
            debug!(
                check.name = %self.name(),
                record = %line.row_ref(),
                order_date = %ordered,
                ship_date = %shipped,
                "Shipped before ordered"
            );
            ledger.record_in_column(IssueKind::ShipBeforeOrder, Column::ShipDate, line.row_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::line_with;

    fn flagged(order: Option<&str>, ship: Option<&str>) -> usize {
        let line = line_with(2, &[(Column::OrderDate, order), (Column::ShipDate, ship)]);
        let mut ledger = IssueLedger::new(5);
        ShipAfterOrderCheck.inspect(&line, &mut ledger);
        ledger.count(IssueKind::ShipBeforeOrder)
    }

    #[test]
    fn test_ship_before_order() {
        assert_eq!(flagged(Some("11/8/2016"), Some("11/7/2016")), 1);
    }

    #[test]
    fn test_same_day_and_later_pass() {
        assert_eq!(flagged(Some("11/8/2016"), Some("11/8/2016")), 0);
        assert_eq!(flagged(Some("11/8/2016"), Some("2016-11-11")), 0);
    }

    #[test]
    fn test_unparsed_dates_are_skipped() {
        assert_eq!(flagged(Some("garbage"), Some("11/7/2016")), 0);
        assert_eq!(flagged(None, Some("11/7/2016")), 0);
    }
}
