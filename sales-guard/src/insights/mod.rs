//! Business insights over the enriched lines.
//!
//! The enriched set is registered as an in-memory table and every insight is
//! a grouped aggregate over it. Undefined derived values are SQL nulls, so a
//! line with an unparseable order date drops out of the yearly totals and a
//! line with an undefined margin drops out of the band means, while both
//! still count everywhere else.

use crate::enrich::batch::{analysis_batch, analysis_schema};
use crate::enrich::{quantile, DiscountBand, EnrichedLine};
use crate::model::RowRef;
use crate::prelude::*;
use arrow::array::{Array, Float64Array, Int64Array, PrimitiveArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{ArrowPrimitiveType, DataType};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

mod breakeven;

pub use breakeven::Breakeven;

/// Name under which the enriched lines are registered.
pub const ANALYSIS_TABLE: &str = "enriched_order_lines";

/// Mean profit margin of one discount band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandMargin {
    pub band: DiscountBand,
    pub mean_margin: f64,
    /// Lines with a defined margin in this band
    pub lines: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubCategoryProfit {
    pub sub_category: String,
    pub total_profit: f64,
}

/// A line whose margin is below the extreme-loss threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtremeLoss {
    pub row: RowRef,
    pub sales: Option<f64>,
    pub profit: Option<f64>,
    pub profit_margin: f64,
}

/// Totals for one region or category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPerformance {
    pub name: String,
    pub lines: u64,
    pub total_sales: f64,
    pub total_profit: f64,
    pub mean_margin: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeLoss {
    pub sub_category: String,
    pub total_quantity: i64,
    pub total_profit: f64,
}

/// Sub-categories that sell above the median quantity yet lose money.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HighVolumeLosses {
    /// Median of the per-sub-category quantity totals
    pub median_quantity: Option<f64>,
    pub sub_categories: Vec<VolumeLoss>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTotals {
    pub year: i32,
    pub lines: u64,
    pub total_sales: f64,
    pub total_profit: f64,
}

/// Every insight computed in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    /// In ascending discount order, empty bands omitted
    pub band_margins: Vec<BandMargin>,
    pub breakeven: Breakeven,
    /// Negative totals only, most negative first, ties by name
    pub loss_sub_categories: Vec<SubCategoryProfit>,
    pub extreme_loss_margin: f64,
    /// In input order
    pub extreme_losses: Vec<ExtremeLoss>,
    /// Ranked by total profit, highest first
    pub regions: Vec<GroupPerformance>,
    /// By category name
    pub categories: Vec<GroupPerformance>,
    pub high_volume_losses: HighVolumeLosses,
    pub years: Vec<YearTotals>,
}

/// Runs the insight queries.
#[derive(Debug, Clone)]
pub struct InsightEngine {
    extreme_loss_margin: f64,
}

impl InsightEngine {
    pub fn new(extreme_loss_margin: f64) -> Self {
        Self {
            extreme_loss_margin,
        }
    }

    /// Registers `lines` as [`ANALYSIS_TABLE`] in `ctx`, replacing any
    /// previous registration, and computes every insight.
    #[instrument(skip(self, ctx, lines), fields(lines = lines.len()))]
    pub async fn run(&self, ctx: &SessionContext, lines: &[EnrichedLine]) -> Result<Insights> {
        let batch = analysis_batch(lines)?;
        let table = MemTable::try_new(analysis_schema(), vec![vec![batch]])?;
        ctx.deregister_table(ANALYSIS_TABLE)?;
        ctx.register_table(ANALYSIS_TABLE, Arc::new(table))?;

        let band_margins = self.band_margins(ctx).await?;
        let breakeven = Breakeven::detect(&band_margins);
        let insights = Insights {
            breakeven,
            band_margins,
            loss_sub_categories: self.loss_sub_categories(ctx).await?,
            extreme_loss_margin: self.extreme_loss_margin,
            extreme_losses: self.extreme_losses(ctx).await?,
            regions: self.group_performance(ctx, "region", "total_profit DESC, name ASC").await?,
            categories: self.group_performance(ctx, "category", "name ASC").await?,
            high_volume_losses: self.high_volume_losses(ctx).await?,
            years: self.yearly_totals(ctx).await?,
        };

        info!(
            insights.bands = insights.band_margins.len(),
            insights.breakeven = %insights.breakeven,
            insights.loss_sub_categories = insights.loss_sub_categories.len(),
            insights.extreme_losses = insights.extreme_losses.len(),
            "Computed insights"
        );
        Ok(insights)
    }

    async fn band_margins(&self, ctx: &SessionContext) -> Result<Vec<BandMargin>> {
        let sql = format!(
            "SELECT discount_band, AVG(profit_margin) AS mean_margin, COUNT(*) AS lines \
             FROM {ANALYSIS_TABLE} \
             WHERE discount_band IS NOT NULL AND profit_margin IS NOT NULL \
             GROUP BY discount_band"
        );
        let mut margins = Vec::new();
        for batch in query(ctx, &sql).await? {
            let bands = strings(&batch, 0)?;
            let means = floats(&batch, 1)?;
            let counts = integers(&batch, 2)?;
            for row in 0..batch.num_rows() {
                let band = DiscountBand::from_label(bands.value(row)).ok_or_else(|| {
                    GuardError::Internal(format!("unknown discount band '{}'", bands.value(row)))
                })?;
                margins.push(BandMargin {
                    band,
                    mean_margin: means.value(row),
                    lines: counts.value(row) as u64,
                });
            }
        }
        margins.sort_by_key(|margin| margin.band);
        Ok(margins)
    }

    async fn loss_sub_categories(&self, ctx: &SessionContext) -> Result<Vec<SubCategoryProfit>> {
        let sql = format!(
            "SELECT sub_category, SUM(profit) AS total_profit \
             FROM {ANALYSIS_TABLE} \
             WHERE sub_category IS NOT NULL AND profit IS NOT NULL \
             GROUP BY sub_category \
             HAVING SUM(profit) < 0 \
             ORDER BY total_profit ASC, sub_category ASC"
        );
        let mut losses = Vec::new();
        for batch in query(ctx, &sql).await? {
            let names = strings(&batch, 0)?;
            let totals = floats(&batch, 1)?;
            for row in 0..batch.num_rows() {
                losses.push(SubCategoryProfit {
                    sub_category: names.value(row).to_string(),
                    total_profit: totals.value(row),
                });
            }
        }
        Ok(losses)
    }

    async fn extreme_losses(&self, ctx: &SessionContext) -> Result<Vec<ExtremeLoss>> {
        let batches = ctx
            .table(ANALYSIS_TABLE)
            .await?
            .filter(col("profit_margin").lt(lit(self.extreme_loss_margin)))?
            .sort(vec![col("source_line").sort(true, false)])?
            .select_columns(&["source_line", "row_id", "sales", "profit", "profit_margin"])?
            .collect()
            .await?;

        let mut losses = Vec::new();
        for batch in &batches {
            let source_lines = integers(batch, 0)?;
            let row_ids = integers(batch, 1)?;
            let sales = floats(batch, 2)?;
            let profit = floats(batch, 3)?;
            let margins = floats(batch, 4)?;
            for row in 0..batch.num_rows() {
                let at = match value(&row_ids, row) {
                    Some(id) => RowRef::RowId(id),
                    None => RowRef::Line(source_lines.value(row) as usize),
                };
                losses.push(ExtremeLoss {
                    row: at,
                    sales: value(&sales, row),
                    profit: value(&profit, row),
                    profit_margin: margins.value(row),
                });
            }
        }
        debug!(
            threshold = self.extreme_loss_margin,
            count = losses.len(),
            "Collected extreme losses"
        );
        Ok(losses)
    }

    async fn group_performance(
        &self,
        ctx: &SessionContext,
        column: &str,
        order_by: &str,
    ) -> Result<Vec<GroupPerformance>> {
        let sql = format!(
            "SELECT {column} AS name, COUNT(*) AS lines, SUM(sales) AS total_sales, \
                    SUM(profit) AS total_profit, AVG(profit_margin) AS mean_margin \
             FROM {ANALYSIS_TABLE} \
             WHERE {column} IS NOT NULL \
             GROUP BY {column} \
             ORDER BY {order_by}"
        );
        let mut groups = Vec::new();
        for batch in query(ctx, &sql).await? {
            let names = strings(&batch, 0)?;
            let counts = integers(&batch, 1)?;
            let sales = floats(&batch, 2)?;
            let profit = floats(&batch, 3)?;
            let margins = floats(&batch, 4)?;
            for row in 0..batch.num_rows() {
                groups.push(GroupPerformance {
                    name: names.value(row).to_string(),
                    lines: counts.value(row) as u64,
                    total_sales: value(&sales, row).unwrap_or(0.0),
                    total_profit: value(&profit, row).unwrap_or(0.0),
                    mean_margin: value(&margins, row),
                });
            }
        }
        Ok(groups)
    }

    async fn high_volume_losses(&self, ctx: &SessionContext) -> Result<HighVolumeLosses> {
        let sql = format!(
            "SELECT sub_category, SUM(quantity) AS total_quantity, SUM(profit) AS total_profit \
             FROM {ANALYSIS_TABLE} \
             WHERE sub_category IS NOT NULL \
             GROUP BY sub_category \
             ORDER BY sub_category"
        );
        let mut totals = Vec::new();
        for batch in query(ctx, &sql).await? {
            let names = strings(&batch, 0)?;
            let quantities = integers(&batch, 1)?;
            let profit = floats(&batch, 2)?;
            for row in 0..batch.num_rows() {
                totals.push(VolumeLoss {
                    sub_category: names.value(row).to_string(),
                    total_quantity: value(&quantities, row).unwrap_or(0),
                    total_profit: value(&profit, row).unwrap_or(0.0),
                });
            }
        }
        Ok(select_high_volume_losses(totals))
    }

    async fn yearly_totals(&self, ctx: &SessionContext) -> Result<Vec<YearTotals>> {
        let sql = format!(
            "SELECT order_year, COUNT(*) AS lines, SUM(sales) AS total_sales, SUM(profit) AS total_profit \
             FROM {ANALYSIS_TABLE} \
             WHERE order_year IS NOT NULL \
             GROUP BY order_year \
             ORDER BY order_year"
        );
        let mut years = Vec::new();
        for batch in query(ctx, &sql).await? {
            let year = integers(&batch, 0)?;
            let counts = integers(&batch, 1)?;
            let sales = floats(&batch, 2)?;
            let profit = floats(&batch, 3)?;
            for row in 0..batch.num_rows() {
                years.push(YearTotals {
                    year: year.value(row) as i32,
                    lines: counts.value(row) as u64,
                    total_sales: value(&sales, row).unwrap_or(0.0),
                    total_profit: value(&profit, row).unwrap_or(0.0),
                });
            }
        }
        Ok(years)
    }
}

/// Keeps the sub-categories whose quantity total is strictly above the
/// median total and whose profit total is negative, most negative first.
pub fn select_high_volume_losses(totals: Vec<VolumeLoss>) -> HighVolumeLosses {
    let mut quantities: Vec<f64> = totals.iter().map(|t| t.total_quantity as f64).collect();
    quantities.sort_by(f64::total_cmp);
    let Some(median) = quantile(&quantities, 0.5) else {
        return HighVolumeLosses::default();
    };

    let mut sub_categories: Vec<VolumeLoss> = totals
        .into_iter()
        .filter(|t| t.total_quantity as f64 > median && t.total_profit < 0.0)
        .collect();
    sub_categories.sort_by(|a, b| {
        a.total_profit
            .total_cmp(&b.total_profit)
            .then_with(|| a.sub_category.cmp(&b.sub_category))
    });
    HighVolumeLosses {
        median_quantity: Some(median),
        sub_categories,
    }
}

async fn query(ctx: &SessionContext, sql: &str) -> Result<Vec<RecordBatch>> {
    debug!(sql = %sql, "Running insight query");
    Ok(ctx.sql(sql).await?.collect().await?)
}

fn value<T: ArrowPrimitiveType>(array: &PrimitiveArray<T>, row: usize) -> Option<T::Native> {
    (!array.is_null(row)).then(|| array.value(row))
}

// Aggregate result types vary with the input type (SUM of Int64 is Int64,
// strings may come back as views), so columns are cast before downcasting.
fn typed_column<A: Array + Clone + 'static>(
    batch: &RecordBatch,
    index: usize,
    data_type: DataType,
) -> Result<A> {
    let array = cast(batch.column(index), &data_type)?;
    array.as_any().downcast_ref::<A>().cloned().ok_or_else(|| {
        GuardError::Internal(format!(
            "expected {data_type} for column '{}'",
            batch.schema().field(index).name()
        ))
    })
}

fn strings(batch: &RecordBatch, index: usize) -> Result<StringArray> {
    typed_column(batch, index, DataType::Utf8)
}

fn floats(batch: &RecordBatch, index: usize) -> Result<Float64Array> {
    typed_column(batch, index, DataType::Float64)
}

fn integers(batch: &RecordBatch, index: usize) -> Result<Int64Array> {
    typed_column(batch, index, DataType::Int64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::Enricher;
    use crate::model::Column;
    use crate::test_fixtures::line_with;

    fn enriched(specs: &[(&str, &str, &str, &str, &str, &str)]) -> Vec<EnrichedLine> {
        let enricher = Enricher::new(None);
        specs
            .iter()
            .enumerate()
            .map(|(index, &(row_id, sub_category, sales, profit, discount, quantity))| {
                enricher.enrich(line_with(
                    index + 2,
                    &[
                        (Column::RowId, Some(row_id)),
                        (Column::SubCategory, Some(sub_category)),
                        (Column::Sales, Some(sales)),
                        (Column::Profit, Some(profit)),
                        (Column::Discount, Some(discount)),
                        (Column::Quantity, Some(quantity)),
                    ],
                ))
            })
            .collect()
    }

    async fn run(lines: &[EnrichedLine]) -> Insights {
        let ctx = SessionContext::new();
        InsightEngine::new(-2.0).run(&ctx, lines).await.unwrap()
    }

    #[tokio::test]
    async fn test_band_margins_in_band_order() {
        let lines = enriched(&[
            ("1", "Chairs", "100", "-50", "0.6", "2"),
            ("2", "Chairs", "100", "20", "0", "2"),
            ("3", "Paper", "100", "40", "0", "2"),
            ("4", "Paper", "100", "10", "0.2", "2"),
            ("5", "Paper", "0", "-5", "0.2", "2"),
        ]);
        let insights = run(&lines).await;

        let bands: Vec<_> = insights.band_margins.iter().map(|m| m.band).collect();
        assert_eq!(
            bands,
            vec![DiscountBand::NoDiscount, DiscountBand::UpTo30, DiscountBand::Over50]
        );
        assert!((insights.band_margins[0].mean_margin - 0.3).abs() < 1e-12);
        // The zero-sales line has no margin and does not count.
        assert_eq!(insights.band_margins[1].lines, 1);
        assert_eq!(insights.band_margins[2].mean_margin, -0.5);
        assert_eq!(
            insights.breakeven,
            Breakeven::Crossing {
                last_profitable: DiscountBand::UpTo30,
                first_unprofitable: DiscountBand::Over50,
            }
        );
    }

    #[tokio::test]
    async fn test_loss_sub_categories_ascending_with_ties_by_name() {
        let lines = enriched(&[
            ("1", "Tables", "100", "-30", "0.3", "1"),
            ("2", "Bookcases", "100", "-30", "0.3", "1"),
            ("3", "Supplies", "100", "-50", "0.3", "1"),
            ("4", "Paper", "100", "25", "0", "1"),
        ]);
        let names: Vec<_> = run(&lines)
            .await
            .loss_sub_categories
            .into_iter()
            .map(|loss| loss.sub_category)
            .collect();
        assert_eq!(names, vec!["Supplies", "Bookcases", "Tables"]);
    }

    #[tokio::test]
    async fn test_extreme_losses_below_threshold_only() {
        let lines = enriched(&[
            ("7", "Binders", "10", "-25", "0.8", "1"),
            ("8", "Binders", "100", "-50", "0.6", "1"),
            ("9", "Binders", "10", "-20", "0.8", "1"),
        ]);
        let insights = run(&lines).await;
        assert_eq!(insights.extreme_losses.len(), 1);
        assert_eq!(insights.extreme_losses[0].row, RowRef::RowId(7));
        assert_eq!(insights.extreme_losses[0].profit_margin, -2.5);
    }

    #[tokio::test]
    async fn test_unparseable_dates_excluded_from_yearly_totals() {
        let enricher = Enricher::new(None);
        let lines = vec![
            enricher.enrich(line_with(2, &[])),
            enricher.enrich(line_with(
                3,
                &[(Column::RowId, Some("2")), (Column::OrderDate, Some("31/31/2016"))],
            )),
        ];
        let insights = run(&lines).await;
        assert_eq!(insights.years.len(), 1);
        assert_eq!(insights.years[0].year, 2016);
        assert_eq!(insights.years[0].lines, 1);
        // Both lines still count towards the regional totals.
        assert_eq!(insights.regions[0].lines, 2);
    }

    #[tokio::test]
    async fn test_rerun_replaces_table() {
        let ctx = SessionContext::new();
        let engine = InsightEngine::new(-2.0);
        let first = enriched(&[("1", "Chairs", "100", "-50", "0.6", "2")]);
        engine.run(&ctx, &first).await.unwrap();
        let second = engine.run(&ctx, &[]).await.unwrap();
        assert!(second.band_margins.is_empty());
        assert_eq!(second.breakeven, Breakeven::NoClearThreshold);
        assert!(second.regions.is_empty());
    }

    #[test]
    fn test_high_volume_losses() {
        let totals = vec![
            VolumeLoss {
                sub_category: "Binders".to_string(),
                total_quantity: 50,
                total_profit: -10.0,
            },
            VolumeLoss {
                sub_category: "Tables".to_string(),
                total_quantity: 10,
                total_profit: -500.0,
            },
            VolumeLoss {
                sub_category: "Paper".to_string(),
                total_quantity: 40,
                total_profit: 300.0,
            },
        ];
        let result = select_high_volume_losses(totals);
        assert_eq!(result.median_quantity, Some(40.0));
        assert_eq!(result.sub_categories.len(), 1);
        assert_eq!(result.sub_categories[0].sub_category, "Binders");
        assert_eq!(select_high_volume_losses(Vec::new()), HighVolumeLosses::default());
    }
}
