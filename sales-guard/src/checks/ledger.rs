//! The anomaly accumulator threaded through the validation pass.

use crate::model::{Column, RowRef};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Broad class of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueClass {
    /// Missing or unusable cells and duplicate keys.
    Structural,
    /// Values outside their allowed range.
    Range,
    /// A derived field could not be computed.
    Derivation,
}

impl IssueClass {
    /// All classes in report order.
    pub const ALL: [IssueClass; 3] = [
        IssueClass::Structural,
        IssueClass::Range,
        IssueClass::Derivation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IssueClass::Structural => "structural",
            IssueClass::Range => "range",
            IssueClass::Derivation => "derivation",
        }
    }
}

/// A kind of anomaly. Every kind is counted; none aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingValue,
    InvalidValue,
    DuplicateRowId,
    DuplicateRow,
    WrongFieldCount,
    DiscountOutOfRange,
    NegativeSales,
    NonPositiveQuantity,
    ShipBeforeOrder,
    UnparseableDate,
    UndefinedMargin,
}

impl IssueKind {
    /// All kinds in report order.
    pub const ALL: [IssueKind; 11] = [
        IssueKind::MissingValue,
        IssueKind::InvalidValue,
        IssueKind::DuplicateRowId,
        IssueKind::DuplicateRow,
        IssueKind::WrongFieldCount,
        IssueKind::DiscountOutOfRange,
        IssueKind::NegativeSales,
        IssueKind::NonPositiveQuantity,
        IssueKind::ShipBeforeOrder,
        IssueKind::UnparseableDate,
        IssueKind::UndefinedMargin,
    ];

    pub fn class(self) -> IssueClass {
        match self {
            IssueKind::MissingValue
            | IssueKind::InvalidValue
            | IssueKind::DuplicateRowId
            | IssueKind::DuplicateRow
            | IssueKind::WrongFieldCount => IssueClass::Structural,
            IssueKind::DiscountOutOfRange
            | IssueKind::NegativeSales
            | IssueKind::NonPositiveQuantity
            | IssueKind::ShipBeforeOrder => IssueClass::Range,
            IssueKind::UnparseableDate | IssueKind::UndefinedMargin => IssueClass::Derivation,
        }
    }

    /// Short human description used in reports.
    pub fn describe(self) -> &'static str {
        match self {
            IssueKind::MissingValue => "missing values",
            IssueKind::InvalidValue => "invalid values",
            IssueKind::DuplicateRowId => "duplicate row ids",
            IssueKind::DuplicateRow => "completely duplicate rows",
            IssueKind::WrongFieldCount => "records with the wrong number of fields",
            IssueKind::DiscountOutOfRange => "discounts outside [0, 1]",
            IssueKind::NegativeSales => "negative sales",
            IssueKind::NonPositiveQuantity => "non-positive quantities",
            IssueKind::ShipBeforeOrder => "ship dates before order dates",
            IssueKind::UnparseableDate => "unparseable dates",
            IssueKind::UndefinedMargin => "undefined profit margins",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Counts of every anomaly seen in one pass.
///
/// Checks write into the ledger; nothing reads it back until the pass is
/// over. Example row references are capped at `max_examples` per kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueLedger {
    records_inspected: usize,
    counts: BTreeMap<IssueKind, usize>,
    by_column: BTreeMap<IssueKind, BTreeMap<Column, usize>>,
    examples: BTreeMap<IssueKind, Vec<RowRef>>,
    #[serde(skip)]
    max_examples: usize,
}

impl IssueLedger {
    /// Creates an empty ledger keeping up to `max_examples` row references per kind.
    pub fn new(max_examples: usize) -> Self {
        Self {
            max_examples,
            ..Self::default()
        }
    }

    /// Marks one more record as inspected.
    pub fn inspected(&mut self) {
        self.records_inspected += 1;
    }

    /// Records one occurrence of `kind` at `at`.
    pub fn record(&mut self, kind: IssueKind, at: RowRef) {
        *self.counts.entry(kind).or_default() += 1;
        let examples = self.examples.entry(kind).or_default();
        if examples.len() < self.max_examples {
            examples.push(at);
        }
    }

    /// Records one occurrence of `kind` in `column` at `at`.
    pub fn record_in_column(&mut self, kind: IssueKind, column: Column, at: RowRef) {
        self.record(kind, at);
        *self
            .by_column
            .entry(kind)
            .or_default()
            .entry(column)
            .or_default() += 1;
    }

    pub fn records_inspected(&self) -> usize {
        self.records_inspected
    }

    /// Occurrences of `kind`.
    pub fn count(&self, kind: IssueKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Occurrences of every kind in `class`.
    pub fn class_total(&self, class: IssueClass) -> usize {
        self.counts
            .iter()
            .filter(|(kind, _)| kind.class() == class)
            .map(|(_, count)| count)
            .sum()
    }

    /// Occurrences of every kind.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Per-column breakdown for `kind`; empty for kinds not tied to a column.
    pub fn by_column(&self, kind: IssueKind) -> Vec<(Column, usize)> {
        self.by_column
            .get(&kind)
            .map(|columns| columns.iter().map(|(c, n)| (*c, *n)).collect())
            .unwrap_or_default()
    }

    /// Example row references for `kind`, in the order they were seen.
    pub fn examples(&self, kind: IssueKind) -> &[RowRef] {
        self.examples.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_one_class() {
        let structural: Vec<_> = IssueKind::ALL
            .iter()
            .filter(|kind| kind.class() == IssueClass::Structural)
            .collect();
        assert_eq!(structural.len(), 5);
        assert_eq!(IssueKind::ShipBeforeOrder.class(), IssueClass::Range);
        assert_eq!(IssueKind::UndefinedMargin.class(), IssueClass::Derivation);
    }

    #[test]
    fn test_ledger_counts_and_caps_examples() {
        let mut ledger = IssueLedger::new(2);
        for id in 1..=5 {
            ledger.record(IssueKind::NegativeSales, RowRef::RowId(id));
        }
        ledger.record_in_column(IssueKind::MissingValue, Column::City, RowRef::Line(9));
        ledger.record_in_column(IssueKind::MissingValue, Column::City, RowRef::Line(10));
        ledger.record_in_column(IssueKind::MissingValue, Column::State, RowRef::Line(10));

        assert_eq!(ledger.count(IssueKind::NegativeSales), 5);
        assert_eq!(
            ledger.examples(IssueKind::NegativeSales),
            &[RowRef::RowId(1), RowRef::RowId(2)]
        );
        assert_eq!(
            ledger.by_column(IssueKind::MissingValue),
            vec![(Column::City, 2), (Column::State, 1)]
        );
        assert_eq!(ledger.class_total(IssueClass::Structural), 3);
        assert_eq!(ledger.class_total(IssueClass::Range), 5);
        assert_eq!(ledger.total(), 8);
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = IssueLedger::new(10);
        assert_eq!(ledger.total(), 0);
        assert_eq!(ledger.count(IssueKind::DuplicateRowId), 0);
        assert!(ledger.examples(IssueKind::DuplicateRowId).is_empty());
        assert!(ledger.by_column(IssueKind::InvalidValue).is_empty());
    }
}
