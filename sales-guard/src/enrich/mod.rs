//! Derived columns.
//!
//! Enrichment is a pure function of one line plus the resolved sales-tier
//! thresholds. A derivation that cannot be computed (no order date, zero
//! sales, discount outside `[0, 1]`) leaves that field `None` and touches
//! nothing else.

use crate::model::OrderLine;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

mod bands;
pub mod batch;

pub use bands::{quantile, DiscountBand, SalesTier, SalesTierThresholds};

/// Profit over sales, undefined when sales are zero or either side is absent.
///
/// ```rust
/// use sales_guard::enrich::profit_margin;
///
/// assert_eq!(profit_margin(Some(100.0), Some(-50.0)), Some(-0.5));
/// assert_eq!(profit_margin(Some(0.0), Some(5.0)), None);
/// assert_eq!(profit_margin(None, Some(5.0)), None);
/// ```
pub fn profit_margin(sales: Option<f64>, profit: Option<f64>) -> Option<f64> {
    match (sales, profit) {
        (Some(sales), Some(profit)) if sales != 0.0 => {
            Some(profit / sales).filter(|margin| margin.is_finite())
        }
        _ => None,
    }
}

/// Date-derived fields of an order date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPeriod {
    pub year: i32,
    pub quarter: u32,
    pub month: u32,
    pub year_month: String,
    pub day_of_week: &'static str,
    pub month_name: &'static str,
}

impl OrderPeriod {
    pub fn of(date: NaiveDate) -> Self {
        let month = date.month();
        Self {
            year: date.year(),
            quarter: (month - 1) / 3 + 1,
            month,
            year_month: format!("{:04}-{:02}", date.year(), month),
            day_of_week: weekday_name(date.weekday()),
            month_name: MONTH_NAMES[(month - 1) as usize],
        }
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn weekday_name(weekday: chrono::Weekday) -> &'static str {
    use chrono::Weekday::*;
    match weekday {
        Mon => "Monday",
        Tue => "Tuesday",
        Wed => "Wednesday",
        Thu => "Thursday",
        Fri => "Friday",
        Sat => "Saturday",
        Sun => "Sunday",
    }
}

/// Every derived field of one line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Derived {
    pub period: Option<OrderPeriod>,
    pub profit_margin: Option<f64>,
    pub discount_band: Option<DiscountBand>,
    pub sales_tier: Option<SalesTier>,
}

/// A typed line with its derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedLine {
    pub line: OrderLine,
    pub derived: Derived,
}

/// Computes derived fields.
#[derive(Debug, Clone, Default)]
pub struct Enricher {
    tiers: Option<SalesTierThresholds>,
}

impl Enricher {
    /// Creates an enricher. Without thresholds no line gets a sales tier.
    pub fn new(tiers: Option<SalesTierThresholds>) -> Self {
        Self { tiers }
    }

    pub fn thresholds(&self) -> Option<SalesTierThresholds> {
        self.tiers
    }

    /// Derives every field for `line`.
    pub fn derive(&self, line: &OrderLine) -> Derived {
        let sales = line.sales.get();
        Derived {
            period: line.order_date.get().map(OrderPeriod::of),
            profit_margin: profit_margin(sales, line.profit.get()),
            discount_band: line.discount.get().and_then(DiscountBand::classify),
            sales_tier: self
                .tiers
                .zip(sales)
                .and_then(|(tiers, sales)| tiers.classify(sales)),
        }
    }

    /// Consumes `line`, attaching its derived fields.
    pub fn enrich(&self, line: OrderLine) -> EnrichedLine {
        let derived = self.derive(&line);
        EnrichedLine { line, derived }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;
    use crate::test_fixtures::line_with;

    fn fixed_tiers() -> Option<SalesTierThresholds> {
        Some(SalesTierThresholds {
            low_max: 50.0,
            medium_max: 250.0,
        })
    }

    #[test]
    fn test_order_period() {
        let period = OrderPeriod::of(NaiveDate::from_ymd_opt(2016, 11, 8).unwrap());
        assert_eq!(period.year, 2016);
        assert_eq!(period.quarter, 4);
        assert_eq!(period.month, 11);
        assert_eq!(period.year_month, "2016-11");
        assert_eq!(period.day_of_week, "Tuesday");
        assert_eq!(period.month_name, "November");

        let january = OrderPeriod::of(NaiveDate::from_ymd_opt(2017, 1, 1).unwrap());
        assert_eq!(january.quarter, 1);
        assert_eq!(january.year_month, "2017-01");
    }

    #[test]
    fn test_reference_loss_line() {
        let line = line_with(
            2,
            &[
                (Column::Sales, Some("100")),
                (Column::Profit, Some("-50")),
                (Column::Discount, Some("0.6")),
            ],
        );
        let derived = Enricher::new(fixed_tiers()).derive(&line);

        assert_eq!(derived.discount_band, Some(DiscountBand::Over50));
        assert_eq!(derived.profit_margin, Some(-0.5));
        assert_eq!(derived.sales_tier, Some(SalesTier::Medium));
    }

    #[test]
    fn test_zero_sales_has_no_margin() {
        let line = line_with(2, &[(Column::Sales, Some("0")), (Column::Profit, Some("-3"))]);
        let derived = Enricher::new(fixed_tiers()).derive(&line);
        assert_eq!(derived.profit_margin, None);
        assert_eq!(derived.sales_tier, Some(SalesTier::Low));
    }

    #[test]
    fn test_bad_date_only_affects_period() {
        let line = line_with(2, &[(Column::OrderDate, Some("someday"))]);
        let derived = Enricher::new(fixed_tiers()).derive(&line);
        assert_eq!(derived.period, None);
        assert!(derived.profit_margin.is_some());
        assert_eq!(derived.discount_band, Some(DiscountBand::NoDiscount));
    }

    #[test]
    fn test_out_of_range_discount_has_no_band() {
        let line = line_with(2, &[(Column::Discount, Some("1.5"))]);
        assert_eq!(Enricher::default().derive(&line).discount_band, None);
    }

    #[test]
    fn test_enrich_keeps_line() {
        let line = line_with(2, &[]);
        let enriched = Enricher::new(None).enrich(line.clone());
        assert_eq!(enriched.line, line);
        assert_eq!(enriched.derived.sales_tier, None);
    }
}
