//! Closed value sets for the enumerated order-line columns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A column whose values must come from a fixed set of labels.
///
/// Parsing is case-insensitive and ignores surrounding whitespace; anything
/// else is rejected, which is how invalid domain values are detected.
pub trait ClosedSet: Sized + Copy + 'static {
    /// Every member, in display order.
    const ALL: &'static [Self];

    /// The canonical label as it appears in the source data.
    fn label(self) -> &'static str;

    /// Looks up a member by label.
    fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|member| member.label().eq_ignore_ascii_case(raw))
    }
}

/// Shipping service level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipMode {
    #[serde(rename = "Standard Class")]
    StandardClass,
    #[serde(rename = "Second Class")]
    SecondClass,
    #[serde(rename = "First Class")]
    FirstClass,
    #[serde(rename = "Same Day")]
    SameDay,
}

impl ClosedSet for ShipMode {
    const ALL: &'static [Self] = &[
        Self::StandardClass,
        Self::SecondClass,
        Self::FirstClass,
        Self::SameDay,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::StandardClass => "Standard Class",
            Self::SecondClass => "Second Class",
            Self::FirstClass => "First Class",
            Self::SameDay => "Same Day",
        }
    }
}

/// Customer segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Consumer,
    Corporate,
    #[serde(rename = "Home Office")]
    HomeOffice,
}

impl ClosedSet for Segment {
    const ALL: &'static [Self] = &[Self::Consumer, Self::Corporate, Self::HomeOffice];

    fn label(self) -> &'static str {
        match self {
            Self::Consumer => "Consumer",
            Self::Corporate => "Corporate",
            Self::HomeOffice => "Home Office",
        }
    }
}

/// Sales region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    West,
    East,
    Central,
    South,
}

impl ClosedSet for Region {
    const ALL: &'static [Self] = &[Self::West, Self::East, Self::Central, Self::South];

    fn label(self) -> &'static str {
        match self {
            Self::West => "West",
            Self::East => "East",
            Self::Central => "Central",
            Self::South => "South",
        }
    }
}

/// Top-level product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Furniture,
    #[serde(rename = "Office Supplies")]
    OfficeSupplies,
    Technology,
}

impl ClosedSet for Category {
    const ALL: &'static [Self] = &[Self::Furniture, Self::OfficeSupplies, Self::Technology];

    fn label(self) -> &'static str {
        match self {
            Self::Furniture => "Furniture",
            Self::OfficeSupplies => "Office Supplies",
            Self::Technology => "Technology",
        }
    }
}

macro_rules! display_by_label {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }
        )*
    };
}

display_by_label!(ShipMode, Segment, Region, Category);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_is_case_insensitive() {
        assert_eq!(Segment::from_label("home office"), Some(Segment::HomeOffice));
        assert_eq!(Region::from_label("  West "), Some(Region::West));
        assert_eq!(
            Category::from_label("OFFICE SUPPLIES"),
            Some(Category::OfficeSupplies)
        );
    }

    #[test]
    fn test_unknown_labels_are_rejected() {
        assert_eq!(Segment::from_label("Consumr"), None);
        assert_eq!(Region::from_label("North"), None);
        assert_eq!(ShipMode::from_label(""), None);
    }

    #[test]
    fn test_labels_round_trip() {
        for mode in ShipMode::ALL {
            assert_eq!(ShipMode::from_label(mode.label()), Some(*mode));
        }
        for category in Category::ALL {
            assert_eq!(category.to_string(), category.label());
        }
    }
}
