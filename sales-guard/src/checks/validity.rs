//! Detection of cells that are present but cannot be typed.

use super::{IssueKind, IssueLedger, RecordCheck};
use crate::logging::truncate_field;
use crate::model::{Column, FieldState, OrderLine};
use tracing::debug;

const MAX_LOGGED_CELL: usize = 64;

/// Counts cells whose text does not parse for their column.
///
/// Unknown labels in the closed-set columns (segment, region, category,
/// ship mode), non-numeric amounts and non-positive row ids are invalid
/// values. Dates that match none of the configured formats are counted
/// separately as unparseable dates, since they only affect date-derived
/// fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueValidityCheck;

impl RecordCheck for ValueValidityCheck {
    fn name(&self) -> &str {
        "value_validity"
    }

    fn description(&self) -> &str {
        "Every present value parses as its column type"
    }

    fn inspect(&mut self, line: &OrderLine, ledger: &mut IssueLedger) {
        for column in Column::ALL {
            if line.state(column) != FieldState::Malformed {
                continue;
            }
            let kind = if column.is_date() {
                IssueKind::UnparseableDate
            } else {
                IssueKind::InvalidValue
            };
            debug!(
                check.name = %self.name(),
                record = %line.row_ref(),
                column = %column,
                value = %truncate_field(line.raw.get(column).unwrap_or_default(), MAX_LOGGED_CELL),
                "Unparseable value"
            );
            ledger.record_in_column(kind, column, line.row_ref());
        }
    }
}
