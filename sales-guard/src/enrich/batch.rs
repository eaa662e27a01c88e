//! Arrow views of enriched lines.
//!
//! Two shapes are produced from the same lines:
//!
//! - the **output** batch: the 21 input columns as read, then the derived
//!   columns, with headers matching the input file;
//! - the **analysis** batch: typed columns with SQL-friendly names, registered
//!   as an in-memory table for the insight queries.

use super::EnrichedLine;
use crate::model::{ClosedSet, Column};
use crate::prelude::*;
use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Headers of the derived output columns, in order.
pub const DERIVED_HEADERS: [&str; 9] = [
    "Order Year",
    "Order Quarter",
    "Order Month",
    "Year-Month",
    "Day of Week",
    "Month Name",
    "Profit Margin",
    "Discount Band",
    "Sales Tier",
];

/// Schema of the enriched output file.
pub fn output_schema() -> SchemaRef {
    let mut fields: Vec<Field> = Column::ALL
        .iter()
        .map(|column| Field::new(column.header(), DataType::Utf8, true))
        .collect();
    let derived_types = [
        DataType::Int32,
        DataType::UInt32,
        DataType::UInt32,
        DataType::Utf8,
        DataType::Utf8,
        DataType::Utf8,
        DataType::Float64,
        DataType::Utf8,
        DataType::Utf8,
    ];
    fields.extend(
        DERIVED_HEADERS
            .iter()
            .zip(derived_types)
            .map(|(name, data_type)| Field::new(*name, data_type, true)),
    );
    Arc::new(Schema::new(fields))
}

/// Builds the enriched output batch.
pub fn output_batch(lines: &[EnrichedLine]) -> Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Column::ALL
        .iter()
        .map(|column| {
            let values: StringArray = lines.iter().map(|l| l.line.raw.as_read(*column)).collect();
            Arc::new(values) as ArrayRef
        })
        .collect();

    let periods: Vec<_> = lines.iter().map(|l| l.derived.period.as_ref()).collect();
    columns.push(Arc::new(
        periods.iter().map(|p| p.map(|p| p.year)).collect::<Int32Array>(),
    ));
    columns.push(Arc::new(
        periods.iter().map(|p| p.map(|p| p.quarter)).collect::<UInt32Array>(),
    ));
    columns.push(Arc::new(
        periods.iter().map(|p| p.map(|p| p.month)).collect::<UInt32Array>(),
    ));
    columns.push(Arc::new(
        periods
            .iter()
            .map(|p| p.map(|p| p.year_month.as_str()))
            .collect::<StringArray>(),
    ));
    columns.push(Arc::new(
        periods
            .iter()
            .map(|p| p.map(|p| p.day_of_week))
            .collect::<StringArray>(),
    ));
    columns.push(Arc::new(
        periods
            .iter()
            .map(|p| p.map(|p| p.month_name))
            .collect::<StringArray>(),
    ));
    columns.push(Arc::new(
        lines
            .iter()
            .map(|l| l.derived.profit_margin)
            .collect::<Float64Array>(),
    ));
    columns.push(Arc::new(
        lines
            .iter()
            .map(|l| l.derived.discount_band.map(|band| band.label()))
            .collect::<StringArray>(),
    ));
    columns.push(Arc::new(
        lines
            .iter()
            .map(|l| l.derived.sales_tier.map(|tier| tier.label()))
            .collect::<StringArray>(),
    ));

    Ok(RecordBatch::try_new(output_schema(), columns)?)
}

/// Schema of the in-memory analysis table.
pub fn analysis_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("source_line", DataType::UInt64, false),
        Field::new("row_id", DataType::Int64, true),
        Field::new("order_year", DataType::Int32, true),
        Field::new("year_month", DataType::Utf8, true),
        Field::new("region", DataType::Utf8, true),
        Field::new("category", DataType::Utf8, true),
        Field::new("sub_category", DataType::Utf8, true),
        Field::new("sales", DataType::Float64, true),
        Field::new("quantity", DataType::Int64, true),
        Field::new("discount", DataType::Float64, true),
        Field::new("profit", DataType::Float64, true),
        Field::new("profit_margin", DataType::Float64, true),
        Field::new("discount_band", DataType::Utf8, true),
    ]))
}

/// Builds the analysis batch.
pub fn analysis_batch(lines: &[EnrichedLine]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(
            lines
                .iter()
                .map(|l| Some(l.line.raw.source_line() as u64))
                .collect::<UInt64Array>(),
        ),
        Arc::new(lines.iter().map(|l| l.line.row_id.get()).collect::<Int64Array>()),
        Arc::new(
            lines
                .iter()
                .map(|l| l.derived.period.as_ref().map(|p| p.year))
                .collect::<Int32Array>(),
        ),
        Arc::new(
            lines
                .iter()
                .map(|l| l.derived.period.as_ref().map(|p| p.year_month.as_str()))
                .collect::<StringArray>(),
        ),
        Arc::new(
            lines
                .iter()
                .map(|l| l.line.region.get().map(|region| region.label()))
                .collect::<StringArray>(),
        ),
        Arc::new(
            lines
                .iter()
                .map(|l| l.line.category.get().map(|category| category.label()))
                .collect::<StringArray>(),
        ),
        Arc::new(
            lines
                .iter()
                .map(|l| l.line.sub_category.value().map(String::as_str))
                .collect::<StringArray>(),
        ),
        Arc::new(lines.iter().map(|l| l.line.sales.get()).collect::<Float64Array>()),
        Arc::new(lines.iter().map(|l| l.line.quantity.get()).collect::<Int64Array>()),
        Arc::new(lines.iter().map(|l| l.line.discount.get()).collect::<Float64Array>()),
        Arc::new(lines.iter().map(|l| l.line.profit.get()).collect::<Float64Array>()),
        Arc::new(
            lines
                .iter()
                .map(|l| l.derived.profit_margin)
                .collect::<Float64Array>(),
        ),
        Arc::new(
            lines
                .iter()
                .map(|l| l.derived.discount_band.map(|band| band.label()))
                .collect::<StringArray>(),
        ),
    ];

    Ok(RecordBatch::try_new(analysis_schema(), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{Enricher, SalesTierThresholds};
    use crate::test_fixtures::line_with;
    use arrow::array::Array;

    fn enriched() -> Vec<EnrichedLine> {
        let enricher = Enricher::new(Some(SalesTierThresholds {
            low_max: 50.0,
            medium_max: 250.0,
        }));
        vec![
            enricher.enrich(line_with(
                2,
                &[
                    (Column::PostalCode, Some("04240")),
                    (Column::Country, Some(" United States ")),
                ],
            )),
            enricher.enrich(line_with(
                3,
                &[
                    (Column::RowId, Some("2")),
                    (Column::OrderDate, Some("bad")),
                    (Column::Sales, Some("0")),
                    (Column::City, None),
                ],
            )),
        ]
    }

    #[test]
    fn test_output_batch_shape() {
        let batch = output_batch(&enriched()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 30);
        assert_eq!(batch.schema().field(0).name(), "Row ID");
        assert_eq!(batch.schema().field(29).name(), "Sales Tier");
    }

    #[test]
    fn test_output_batch_keeps_raw_text() {
        let batch = output_batch(&enriched()).unwrap();
        let postal = batch
            .column(Column::PostalCode.index())
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(postal.value(0), "04240");

        let country = batch
            .column(Column::Country.index())
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(country.value(0), " United States ");

        let city = batch
            .column(Column::City.index())
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert!(city.is_null(1));

        let order_date = batch
            .column(Column::OrderDate.index())
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(order_date.value(1), "bad");
    }

    #[test]
    fn test_undefined_derivations_are_null() {
        let batch = output_batch(&enriched()).unwrap();
        let year = batch
            .column(21)
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap();
        assert_eq!(year.value(0), 2016);
        assert!(year.is_null(1));

        let margin = batch
            .column(27)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!(!margin.is_null(0));
        assert!(margin.is_null(1));
    }

    #[test]
    fn test_analysis_batch_shape() {
        let batch = analysis_batch(&enriched()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema(), analysis_schema());
    }

    #[test]
    fn test_empty_batches() {
        assert_eq!(output_batch(&[]).unwrap().num_rows(), 0);
        assert_eq!(analysis_batch(&[]).unwrap().num_rows(), 0);
    }
}
