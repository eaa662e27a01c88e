//! Data source connectors.
//!
//! A source registers itself as a table in a DataFusion session; the
//! [`load_raw_lines`] reader then decodes that table into
//! [`RawOrderLine`]s. Sources register every column as nullable text so that
//! a bad cell never fails the load: typing happens later, per cell. Two
//! bookkeeping columns follow the 21 input columns: the file line each
//! record starts on and the number of fields it had.

use crate::model::{Column, RawOrderLine, COLUMN_COUNT};
use crate::prelude::*;
use arrow::array::{Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, instrument};

mod csv;

pub use csv::{CsvOptions, CsvSource, InputEncoding};

/// A data source that can be registered with a DataFusion context.
///
/// # Examples
///
/// ```rust,no_run
/// use sales_guard::sources::{CsvSource, DataSource};
/// use datafusion::prelude::SessionContext;
///
/// # async fn example() -> sales_guard::prelude::Result<()> {
/// let source = CsvSource::new("data/Superstore_Cleaned.csv");
/// let ctx = SessionContext::new();
/// source.register(&ctx, "order_lines").await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DataSource: Debug + Send + Sync {
    /// Registers this data source with the given session context.
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()>;

    /// Returns a human-readable description of this data source.
    fn description(&self) -> String;
}

/// Column holding the 1-based file line a record starts on.
pub const SOURCE_LINE_FIELD: &str = "source_line";
/// Column holding the number of fields a record had.
pub const FIELD_COUNT_FIELD: &str = "field_count";

/// The schema sources register: one nullable `Utf8` field per input column,
/// then the two bookkeeping columns.
pub fn source_schema() -> SchemaRef {
    let mut fields: Vec<Field> = Column::ALL
        .iter()
        .map(|column| Field::new(column.field_name(), DataType::Utf8, true))
        .collect();
    fields.push(Field::new(SOURCE_LINE_FIELD, DataType::UInt64, false));
    fields.push(Field::new(FIELD_COUNT_FIELD, DataType::UInt64, false));
    Arc::new(Schema::new(fields))
}

/// Reads every row of `table_name` into raw order lines, in table order.
#[instrument(skip(ctx))]
pub async fn load_raw_lines(ctx: &SessionContext, table_name: &str) -> Result<Vec<RawOrderLine>> {
    let batches = ctx.table(table_name).await?.collect().await?;

    let mut lines = Vec::new();
    for batch in &batches {
        if batch.num_columns() != COLUMN_COUNT + 2 {
            return Err(GuardError::schema_mismatch(COLUMN_COUNT, batch.num_columns()));
        }
        let columns = (0..COLUMN_COUNT)
            .map(|index| {
                batch
                    .column(index)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| {
                        GuardError::Internal(format!(
                            "column '{}' was not registered as text",
                            Column::ALL[index].field_name()
                        ))
                    })
            })
            .collect::<Result<Vec<&StringArray>>>()?;
        let source_lines = bookkeeping(batch, SOURCE_LINE_FIELD)?;
        let field_counts = bookkeeping(batch, FIELD_COUNT_FIELD)?;

        for row in 0..batch.num_rows() {
            let cells = columns
                .iter()
                .map(|array| (!array.is_null(row)).then(|| array.value(row).to_string()))
                .collect();
            lines.push(RawOrderLine::with_field_count(
                source_lines.value(row) as usize,
                field_counts.value(row) as usize,
                cells,
            ));
        }
    }

    debug!(
        table.name = %table_name,
        batches = batches.len(),
        rows = lines.len(),
        "Decoded raw order lines"
    );
    Ok(lines)
}

fn bookkeeping<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt64Array> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<UInt64Array>())
        .ok_or_else(|| GuardError::Internal(format!("source table has no '{name}' column")))
}
