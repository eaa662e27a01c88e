//! Discount bands and sales tiers.

use crate::config::SalesTierPolicy;
use serde::Serialize;
use std::fmt;

/// Bucketed discount range.
///
/// Bands are closed on the right: `(0, 0.10]`, `(0.10, 0.30]`,
/// `(0.30, 0.50]`, `(0.50, 1.0]`, with exactly zero in its own band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DiscountBand {
    #[serde(rename = "0%")]
    NoDiscount,
    #[serde(rename = "1-10%")]
    UpTo10,
    #[serde(rename = "11-30%")]
    UpTo30,
    #[serde(rename = "31-50%")]
    UpTo50,
    #[serde(rename = "50%+")]
    Over50,
}

impl DiscountBand {
    /// All bands in ascending discount order.
    pub const ALL: [DiscountBand; 5] = [
        DiscountBand::NoDiscount,
        DiscountBand::UpTo10,
        DiscountBand::UpTo30,
        DiscountBand::UpTo50,
        DiscountBand::Over50,
    ];

    /// The band for a discount fraction, or `None` outside `[0, 1]`.
    pub fn classify(discount: f64) -> Option<Self> {
        if !(0.0..=1.0).contains(&discount) {
            return None;
        }
        let band = if discount == 0.0 {
            DiscountBand::NoDiscount
        } else if discount <= 0.10 {
            DiscountBand::UpTo10
        } else if discount <= 0.30 {
            DiscountBand::UpTo30
        } else if discount <= 0.50 {
            DiscountBand::UpTo50
        } else {
            DiscountBand::Over50
        };
        Some(band)
    }

    pub fn label(self) -> &'static str {
        match self {
            DiscountBand::NoDiscount => "0%",
            DiscountBand::UpTo10 => "1-10%",
            DiscountBand::UpTo30 => "11-30%",
            DiscountBand::UpTo50 => "31-50%",
            DiscountBand::Over50 => "50%+",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|band| band.label() == label)
    }
}

impl fmt::Display for DiscountBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sales magnitude bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SalesTier {
    Low,
    Medium,
    High,
}

impl SalesTier {
    pub fn label(self) -> &'static str {
        match self {
            SalesTier::Low => "Low",
            SalesTier::Medium => "Medium",
            SalesTier::High => "High",
        }
    }
}

impl fmt::Display for SalesTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Upper bounds (inclusive) of the Low and Medium tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SalesTierThresholds {
    pub low_max: f64,
    pub medium_max: f64,
}

impl SalesTierThresholds {
    /// The tier for a sales amount; negative or non-finite sales have none.
    pub fn classify(&self, sales: f64) -> Option<SalesTier> {
        if !sales.is_finite() || sales < 0.0 {
            None
        } else if sales <= self.low_max {
            Some(SalesTier::Low)
        } else if sales <= self.medium_max {
            Some(SalesTier::Medium)
        } else {
            Some(SalesTier::High)
        }
    }

    /// Resolves thresholds for `policy` over the observed sales amounts.
    ///
    /// Quantile thresholds are computed over non-negative sales only; with
    /// no such sales there are no thresholds and no line gets a tier.
    pub fn resolve(policy: &SalesTierPolicy, sales: impl IntoIterator<Item = f64>) -> Option<Self> {
        match *policy {
            SalesTierPolicy::Fixed {
                low_max,
                medium_max,
            } => Some(Self {
                low_max,
                medium_max,
            }),
            SalesTierPolicy::Quantile { low, high } => {
                let mut values: Vec<f64> = sales
                    .into_iter()
                    .filter(|value| value.is_finite() && *value >= 0.0)
                    .collect();
                values.sort_by(f64::total_cmp);
                Some(Self {
                    low_max: quantile(&values, low)?,
                    medium_max: quantile(&values, high)?,
                })
            }
        }
    }
}

/// Quantile of sorted values with linear interpolation between closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
