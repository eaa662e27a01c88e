//! Breakeven detection over discount-band margins.

use super::BandMargin;
use crate::enrich::DiscountBand;
use serde::Serialize;
use std::fmt;

/// Where, along increasing discount, mean margin turns negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Breakeven {
    /// Every band up to `last_profitable` is positive and every band from
    /// `first_unprofitable` on is negative.
    Crossing {
        last_profitable: DiscountBand,
        first_unprofitable: DiscountBand,
    },
    AlwaysProfitable,
    NeverProfitable,
    /// No data, a mean of exactly zero, or signs that flip more than once.
    NoClearThreshold,
}

impl Breakeven {
    /// Scans band means in ascending discount order.
    ///
    /// `margins` must be sorted by band; empty bands are simply absent.
    pub fn detect(margins: &[BandMargin]) -> Self {
        if margins.is_empty()
            || margins
                .iter()
                .any(|m| m.mean_margin == 0.0 || m.mean_margin.is_nan())
        {
            return Breakeven::NoClearThreshold;
        }

        let Some(first_negative) = margins.iter().position(|m| m.mean_margin < 0.0) else {
            return Breakeven::AlwaysProfitable;
        };
        if !margins[first_negative..].iter().all(|m| m.mean_margin < 0.0) {
            return Breakeven::NoClearThreshold;
        }
        if first_negative == 0 {
            return Breakeven::NeverProfitable;
        }
        Breakeven::Crossing {
            last_profitable: margins[first_negative - 1].band,
            first_unprofitable: margins[first_negative].band,
        }
    }
}

impl fmt::Display for Breakeven {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Breakeven::Crossing {
                last_profitable,
                first_unprofitable,
            } => write!(
                f,
                "profitable up to the {last_profitable} band, unprofitable from the {first_unprofitable} band"
            ),
            Breakeven::AlwaysProfitable => f.write_str("profitable at every discount level"),
            Breakeven::NeverProfitable => f.write_str("unprofitable at every discount level"),
            Breakeven::NoClearThreshold => f.write_str("no clear threshold"),
        }
    }
}
