//! Duplicate detection.
//!
//! Order ids are deliberately not checked: one order spans many lines.

use super::{IssueKind, IssueLedger, RecordCheck};
use crate::model::{Column, OrderLine};
use std::collections::HashSet;
use tracing::debug;

/// Counts row ids seen more than once. Every repeat is counted, the first
/// sighting is not.
#[derive(Debug, Clone, Default)]
pub struct RowIdUniquenessCheck {
    seen: HashSet<i64>,
}

impl RecordCheck for RowIdUniquenessCheck {
    fn name(&self) -> &str {
        "row_id_uniqueness"
    }

    fn description(&self) -> &str {
        "Row ids are unique"
    }

    fn inspect(&mut self, line: &OrderLine, ledger: &mut IssueLedger) {
        let Some(row_id) = line.row_id.get() else {
            return;
        };
        if !self.seen.insert(row_id) {
            debug!(
                check.name = %self.name(),
                row_id,
                source_line = line.raw.source_line(),
                "Duplicate row id"
            );
            ledger.record_in_column(
                IssueKind::DuplicateRowId,
                Column::RowId,
                line.row_ref(),
            );
        }
    }
}

/// Counts lines whose 21 cells all equal an earlier line's cells.
#[derive(Debug, Clone, Default)]
pub struct DuplicateRowCheck {
    seen: HashSet<Vec<Option<String>>>,
}

impl RecordCheck for DuplicateRowCheck {
    fn name(&self) -> &str {
        "duplicate_rows"
    }

    fn description(&self) -> &str {
        "No line repeats another line in full"
    }

    fn inspect(&mut self, line: &OrderLine, ledger: &mut IssueLedger) {
        if !self.seen.insert(line.raw.cells().to_vec()) {
            debug!(
                check.name = %self.name(),
                source_line = line.raw.source_line(),
                "Completely duplicate row"
            );
            ledger.record(IssueKind::DuplicateRow, line.row_ref());
        }
    }
}
