//! Record-level validation checks.
//!
//! Each check inspects one typed [`OrderLine`] at a time and records what it
//! finds in the shared [`IssueLedger`]. Checks never reject a record: the
//! pass is total over its input and always produces a ledger.
//!
//! | Check                   | Issue kinds                                  |
//! |-------------------------|----------------------------------------------|
//! | [`CompletenessCheck`]   | missing value                                |
//! | [`FieldCountCheck`]     | wrong number of fields                       |
//! | [`ValueValidityCheck`]  | invalid value, unparseable date              |
//! | [`RowIdUniquenessCheck`]| duplicate row id                             |
//! | [`DuplicateRowCheck`]   | completely duplicate row                     |
//! | [`RangeCheck`]          | discount range, negative sales, quantity     |
//! | [`ShipAfterOrderCheck`] | ship date before order date                  |

use crate::model::OrderLine;
use std::fmt::Debug;

mod completeness;
mod ledger;
mod range;
mod temporal_ordering;
mod uniqueness;
mod validity;

pub use completeness::{CompletenessCheck, FieldCountCheck};
pub use ledger::{IssueClass, IssueKind, IssueLedger};
pub use range::RangeCheck;
pub use temporal_ordering::ShipAfterOrderCheck;
pub use uniqueness::{DuplicateRowCheck, RowIdUniquenessCheck};
pub use validity::ValueValidityCheck;

/// A validation rule applied to every order line in a single pass.
///
/// Checks may keep state across lines (uniqueness checks remember what they
/// have seen), which is why `inspect` takes `&mut self`.
pub trait RecordCheck: Debug + Send {
    /// Returns the name of the check.
    fn name(&self) -> &str;

    /// Returns a description of what this check validates.
    fn description(&self) -> &str;

    /// Inspects one line, recording anomalies in `ledger`.
    fn inspect(&mut self, line: &OrderLine, ledger: &mut IssueLedger);
}

/// A boxed check for use in collections.
pub type BoxedCheck = Box<dyn RecordCheck>;

/// The standard set of checks, in the order they run.
pub fn standard_checks() -> Vec<BoxedCheck> {
    vec![
        Box::new(FieldCountCheck),
        Box::new(CompletenessCheck),
        Box::new(ValueValidityCheck),
        Box::new(RowIdUniquenessCheck::default()),
        Box::new(DuplicateRowCheck::default()),
        Box::new(RangeCheck::discount_fraction()),
        Box::new(RangeCheck::non_negative_sales()),
        Box::new(RangeCheck::positive_quantity()),
        Box::new(ShipAfterOrderCheck),
    ]
}
