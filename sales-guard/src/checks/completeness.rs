//! Missing-value and record-shape detection.

use super::{IssueKind, IssueLedger, RecordCheck};
use crate::model::{Column, FieldState, OrderLine, COLUMN_COUNT};
use tracing::debug;

/// Counts empty cells in every required column.
///
/// All 21 input columns are required. A missing cell is counted once, under
/// its column, and the record is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletenessCheck;

impl RecordCheck for CompletenessCheck {
    fn name(&self) -> &str {
        "completeness"
    }

    fn description(&self) -> &str {
        "Every required column has a value"
    }

    fn inspect(&mut self, line: &OrderLine, ledger: &mut IssueLedger) {
        for column in Column::ALL {
            if line.state(column) == FieldState::Missing {
                debug!(
                    check.name = %self.name(),
                    record = %line.row_ref(),
                    column = %column,
                    "Missing value"
                );
                ledger.record_in_column(IssueKind::MissingValue, column, line.row_ref());
            }
        }
    }
}

/// Counts records whose field count differs from the header's.
///
/// Short records also show up as missing values in their trailing columns;
/// fields past the last column are dropped from the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldCountCheck;

impl RecordCheck for FieldCountCheck {
    fn name(&self) -> &str {
        "field_count"
    }

    fn description(&self) -> &str {
        "Every record has as many fields as the header"
    }

    fn inspect(&mut self, line: &OrderLine, ledger: &mut IssueLedger) {
        let found = line.raw.field_count();
        if found != COLUMN_COUNT {
            debug!(
                check.name = %self.name(),
                source_line = line.raw.source_line(),
                fields.expected = COLUMN_COUNT,
                fields.found = found,
                "Record has the wrong number of fields"
            );
            ledger.record(IssueKind::WrongFieldCount, line.row_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RowRef;
    use crate::model::{DateParser, RawOrderLine};
    use crate::test_fixtures::{line_with, sample_cells};

    #[test]
    fn test_counts_each_missing_cell() {
        let line = line_with(
            4,
            &[(Column::PostalCode, None), (Column::CustomerName, None)],
        );
        let mut ledger = IssueLedger::new(5);
        CompletenessCheck.inspect(&line, &mut ledger);

        assert_eq!(ledger.count(IssueKind::MissingValue), 2);
        assert_eq!(
            ledger.by_column(IssueKind::MissingValue),
            vec![(Column::CustomerName, 1), (Column::PostalCode, 1)]
        );
        assert_eq!(ledger.examples(IssueKind::MissingValue)[0], RowRef::RowId(1));
    }

    #[test]
    fn test_malformed_is_not_missing() {
        let line = line_with(2, &[(Column::Sales, Some("n/a"))]);
        let mut ledger = IssueLedger::new(5);
        CompletenessCheck.inspect(&line, &mut ledger);
        assert_eq!(ledger.count(IssueKind::MissingValue), 0);
    }

    #[test]
    fn test_short_record_counts_shape_and_missing_cells() {
        let mut cells = sample_cells();
        cells.truncate(COLUMN_COUNT - 1);
        let line = OrderLine::parse(RawOrderLine::new(3, cells), &DateParser::default());
        let mut ledger = IssueLedger::new(5);
        FieldCountCheck.inspect(&line, &mut ledger);
        CompletenessCheck.inspect(&line, &mut ledger);

        assert_eq!(ledger.count(IssueKind::WrongFieldCount), 1);
        assert_eq!(
            ledger.by_column(IssueKind::MissingValue),
            vec![(Column::Profit, 1)]
        );
    }

    #[test]
    fn test_long_record_is_counted_once() {
        let mut cells = sample_cells();
        cells.push(Some("extra".to_string()));
        cells.push(Some("more".to_string()));
        let line = OrderLine::parse(RawOrderLine::new(3, cells), &DateParser::default());
        let mut ledger = IssueLedger::new(5);
        FieldCountCheck.inspect(&line, &mut ledger);
        CompletenessCheck.inspect(&line, &mut ledger);

        assert_eq!(ledger.count(IssueKind::WrongFieldCount), 1);
        assert_eq!(ledger.count(IssueKind::MissingValue), 0);
        assert_eq!(ledger.examples(IssueKind::WrongFieldCount), &[RowRef::RowId(1)]);
    }

    #[test]
    fn test_full_record_has_the_right_shape() {
        let mut ledger = IssueLedger::new(5);
        FieldCountCheck.inspect(&line_with(2, &[]), &mut ledger);
        assert_eq!(ledger.total(), 0);
    }
}
