//! Order-line data model.
//!
//! A line moves through two shapes:
//!
//! ```text
//! RawOrderLine   21 text cells, exactly as read, plus the record's field count
//!     │ OrderLine::parse
//!     ▼
//! OrderLine      typed fields, each Present / Missing / Malformed
//! ```
//!
//! The raw cells are kept on the typed line so the enriched output can
//! reproduce the input columns unchanged.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

mod domain;
mod parse;

pub use domain::{Category, ClosedSet, Region, Segment, ShipMode};
pub use parse::{parse_decimal, parse_discount, parse_integer, DateParser, DEFAULT_DATE_FORMATS};

/// Number of input columns.
pub const COLUMN_COUNT: usize = 21;

/// An input column, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Column {
    #[serde(rename = "Row ID")]
    RowId,
    #[serde(rename = "Order ID")]
    OrderId,
    #[serde(rename = "Order Date")]
    OrderDate,
    #[serde(rename = "Ship Date")]
    ShipDate,
    #[serde(rename = "Ship Mode")]
    ShipMode,
    #[serde(rename = "Customer ID")]
    CustomerId,
    #[serde(rename = "Customer Name")]
    CustomerName,
    Segment,
    Country,
    City,
    State,
    #[serde(rename = "Postal Code")]
    PostalCode,
    Region,
    #[serde(rename = "Product ID")]
    ProductId,
    Category,
    #[serde(rename = "Sub-Category")]
    SubCategory,
    #[serde(rename = "Product Name")]
    ProductName,
    Sales,
    Quantity,
    Discount,
    Profit,
}

impl Column {
    /// All columns in file order.
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::RowId,
        Column::OrderId,
        Column::OrderDate,
        Column::ShipDate,
        Column::ShipMode,
        Column::CustomerId,
        Column::CustomerName,
        Column::Segment,
        Column::Country,
        Column::City,
        Column::State,
        Column::PostalCode,
        Column::Region,
        Column::ProductId,
        Column::Category,
        Column::SubCategory,
        Column::ProductName,
        Column::Sales,
        Column::Quantity,
        Column::Discount,
        Column::Profit,
    ];

    /// Position of the column in the input file.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Header text used in the input and output files.
    pub fn header(self) -> &'static str {
        match self {
            Column::RowId => "Row ID",
            Column::OrderId => "Order ID",
            Column::OrderDate => "Order Date",
            Column::ShipDate => "Ship Date",
            Column::ShipMode => "Ship Mode",
            Column::CustomerId => "Customer ID",
            Column::CustomerName => "Customer Name",
            Column::Segment => "Segment",
            Column::Country => "Country",
            Column::City => "City",
            Column::State => "State",
            Column::PostalCode => "Postal Code",
            Column::Region => "Region",
            Column::ProductId => "Product ID",
            Column::Category => "Category",
            Column::SubCategory => "Sub-Category",
            Column::ProductName => "Product Name",
            Column::Sales => "Sales",
            Column::Quantity => "Quantity",
            Column::Discount => "Discount",
            Column::Profit => "Profit",
        }
    }

    /// SQL-safe field name used when the file is registered as a table.
    pub fn field_name(self) -> &'static str {
        match self {
            Column::RowId => "row_id",
            Column::OrderId => "order_id",
            Column::OrderDate => "order_date",
            Column::ShipDate => "ship_date",
            Column::ShipMode => "ship_mode",
            Column::CustomerId => "customer_id",
            Column::CustomerName => "customer_name",
            Column::Segment => "segment",
            Column::Country => "country",
            Column::City => "city",
            Column::State => "state",
            Column::PostalCode => "postal_code",
            Column::Region => "region",
            Column::ProductId => "product_id",
            Column::Category => "category",
            Column::SubCategory => "sub_category",
            Column::ProductName => "product_name",
            Column::Sales => "sales",
            Column::Quantity => "quantity",
            Column::Discount => "discount",
            Column::Profit => "profit",
        }
    }

    /// Whether the column holds a date.
    pub fn is_date(self) -> bool {
        matches!(self, Column::OrderDate | Column::ShipDate)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// One input record as text cells.
///
/// Cells are kept exactly as read for the enriched output; [`get`](Self::get)
/// is the trimmed view the parser sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOrderLine {
    source_line: usize,
    field_count: usize,
    cells: Vec<Option<String>>,
}

impl RawOrderLine {
    /// Creates a raw line from the fields of one record. Short records are
    /// padded with `None` and extra fields are dropped; the original field
    /// count stays available through [`field_count`](Self::field_count).
    pub fn new(source_line: usize, cells: Vec<Option<String>>) -> Self {
        let field_count = cells.len();
        Self::with_field_count(source_line, field_count, cells)
    }

    /// Like [`new`](Self::new), for cells already cut to the column count.
    pub fn with_field_count(
        source_line: usize,
        field_count: usize,
        mut cells: Vec<Option<String>>,
    ) -> Self {
        cells.resize(COLUMN_COUNT, None);
        Self {
            source_line,
            field_count,
            cells,
        }
    }

    /// 1-based line in the source file on which the record starts (the
    /// header is line 1).
    pub fn source_line(&self) -> usize {
        self.source_line
    }

    /// Number of fields the record actually had.
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// The trimmed cell for `column`; blank cells are `None`.
    pub fn get(&self, column: Column) -> Option<&str> {
        self.cells[column.index()]
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// The cell for `column` exactly as read.
    pub fn as_read(&self, column: Column) -> Option<&str> {
        self.cells[column.index()].as_deref()
    }

    /// All cells in column order, exactly as read.
    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }
}

/// A typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// The cell parsed successfully.
    Present(T),
    /// The cell was empty.
    Missing,
    /// The cell had text that could not be interpreted; the text is kept.
    Malformed(String),
}

impl<T> Field<T> {
    /// Parses an optional cell with `parser`.
    pub fn parse_with(raw: Option<&str>, parser: impl FnOnce(&str) -> Option<T>) -> Self {
        match raw {
            None => Field::Missing,
            Some(text) => match parser(text) {
                Some(value) => Field::Present(value),
                None => Field::Malformed(text.to_string()),
            },
        }
    }

    /// The parsed value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Present(value) => Some(value),
            _ => None,
        }
    }

    /// The state of the cell, without its value.
    pub fn state(&self) -> FieldState {
        match self {
            Field::Present(_) => FieldState::Present,
            Field::Missing => FieldState::Missing,
            Field::Malformed(_) => FieldState::Malformed,
        }
    }
}

impl<T: Copy> Field<T> {
    /// The parsed value, copied.
    pub fn get(&self) -> Option<T> {
        self.value().copied()
    }
}

/// Whether a cell was present, missing or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Present,
    Missing,
    Malformed,
}

/// A reference to an input row for reports: the row id when it parsed,
/// otherwise the source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRef {
    RowId(i64),
    Line(usize),
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowRef::RowId(id) => write!(f, "row {id}"),
            RowRef::Line(line) => write!(f, "line {line}"),
        }
    }
}

/// A typed order line.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub raw: RawOrderLine,
    pub row_id: Field<i64>,
    pub order_id: Field<String>,
    pub order_date: Field<NaiveDate>,
    pub ship_date: Field<NaiveDate>,
    pub ship_mode: Field<ShipMode>,
    pub customer_id: Field<String>,
    pub customer_name: Field<String>,
    pub segment: Field<Segment>,
    pub country: Field<String>,
    pub city: Field<String>,
    pub state: Field<String>,
    pub postal_code: Field<String>,
    pub region: Field<Region>,
    pub product_id: Field<String>,
    pub category: Field<Category>,
    pub sub_category: Field<String>,
    pub product_name: Field<String>,
    pub sales: Field<f64>,
    pub quantity: Field<i64>,
    pub discount: Field<f64>,
    pub profit: Field<f64>,
}

fn text(raw: &RawOrderLine, column: Column) -> Field<String> {
    Field::parse_with(raw.get(column), |value| Some(value.to_string()))
}

impl OrderLine {
    /// Types every cell of `raw`. Never fails: unparseable cells become
    /// [`Field::Malformed`].
    pub fn parse(raw: RawOrderLine, dates: &DateParser) -> Self {
        Self {
            row_id: Field::parse_with(raw.get(Column::RowId), |value| {
                parse_integer(value).filter(|id| *id > 0)
            }),
            order_id: text(&raw, Column::OrderId),
            order_date: Field::parse_with(raw.get(Column::OrderDate), |value| dates.parse(value)),
            ship_date: Field::parse_with(raw.get(Column::ShipDate), |value| dates.parse(value)),
            ship_mode: Field::parse_with(raw.get(Column::ShipMode), ShipMode::from_label),
            customer_id: text(&raw, Column::CustomerId),
            customer_name: text(&raw, Column::CustomerName),
            segment: Field::parse_with(raw.get(Column::Segment), Segment::from_label),
            country: text(&raw, Column::Country),
            city: text(&raw, Column::City),
            state: text(&raw, Column::State),
            postal_code: text(&raw, Column::PostalCode),
            region: Field::parse_with(raw.get(Column::Region), Region::from_label),
            product_id: text(&raw, Column::ProductId),
            category: Field::parse_with(raw.get(Column::Category), Category::from_label),
            sub_category: text(&raw, Column::SubCategory),
            product_name: text(&raw, Column::ProductName),
            sales: Field::parse_with(raw.get(Column::Sales), parse_decimal),
            quantity: Field::parse_with(raw.get(Column::Quantity), parse_integer),
            discount: Field::parse_with(raw.get(Column::Discount), parse_discount),
            profit: Field::parse_with(raw.get(Column::Profit), parse_decimal),
            raw,
        }
    }

    /// The state of one column's cell.
    pub fn state(&self, column: Column) -> FieldState {
        match column {
            Column::RowId => self.row_id.state(),
            Column::OrderId => self.order_id.state(),
            Column::OrderDate => self.order_date.state(),
            Column::ShipDate => self.ship_date.state(),
            Column::ShipMode => self.ship_mode.state(),
            Column::CustomerId => self.customer_id.state(),
            Column::CustomerName => self.customer_name.state(),
            Column::Segment => self.segment.state(),
            Column::Country => self.country.state(),
            Column::City => self.city.state(),
            Column::State => self.state.state(),
            Column::PostalCode => self.postal_code.state(),
            Column::Region => self.region.state(),
            Column::ProductId => self.product_id.state(),
            Column::Category => self.category.state(),
            Column::SubCategory => self.sub_category.state(),
            Column::ProductName => self.product_name.state(),
            Column::Sales => self.sales.state(),
            Column::Quantity => self.quantity.state(),
            Column::Discount => self.discount.state(),
            Column::Profit => self.profit.state(),
        }
    }

    /// How reports refer to this line.
    pub fn row_ref(&self) -> RowRef {
        match self.row_id.get() {
            Some(id) => RowRef::RowId(id),
            None => RowRef::Line(self.raw.source_line()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{raw_line, sample_cells};

    #[test]
    fn test_columns_are_in_file_order() {
        for (position, column) in Column::ALL.iter().enumerate() {
            assert_eq!(column.index(), position);
        }
        assert_eq!(Column::SubCategory.header(), "Sub-Category");
        assert_eq!(Column::SubCategory.field_name(), "sub_category");
    }

    #[test]
    fn test_raw_line_trims_only_the_parsed_view() {
        let raw = RawOrderLine::new(
            2,
            vec![Some(" 7 ".to_string()), Some("   ".to_string()), None],
        );
        assert_eq!(raw.get(Column::RowId), Some("7"));
        assert_eq!(raw.as_read(Column::RowId), Some(" 7 "));
        assert_eq!(raw.get(Column::OrderId), None);
        assert_eq!(raw.as_read(Column::OrderId), Some("   "));
        assert_eq!(raw.cells().len(), COLUMN_COUNT);
        assert_eq!(raw.get(Column::Profit), None);
        assert_eq!(raw.field_count(), 3);
    }

    #[test]
    fn test_raw_line_drops_extra_fields() {
        let mut cells = sample_cells();
        cells.push(Some("surplus".to_string()));
        let raw = raw_line(2, cells);
        assert_eq!(raw.field_count(), COLUMN_COUNT + 1);
        assert_eq!(raw.cells().len(), COLUMN_COUNT);
        assert_eq!(raw.get(Column::Profit), Some("41.9136"));
    }

    #[test]
    fn test_parse_sample_line() {
        let mut cells = sample_cells();
        cells[Column::PostalCode.index()] = Some("04240".to_string());
        let line = OrderLine::parse(raw_line(2, cells), &DateParser::default());

        assert_eq!(line.row_id, Field::Present(1));
        assert_eq!(line.order_date.get(), NaiveDate::from_ymd_opt(2016, 11, 8));
        assert_eq!(line.ship_mode, Field::Present(ShipMode::SecondClass));
        assert_eq!(line.segment, Field::Present(Segment::Consumer));
        assert_eq!(line.region, Field::Present(Region::South));
        assert_eq!(line.category, Field::Present(Category::Furniture));
        assert_eq!(line.postal_code, Field::Present("04240".to_string()));
        assert_eq!(line.sales.get(), Some(261.96));
        assert_eq!(line.quantity.get(), Some(2));
        assert_eq!(line.row_ref(), RowRef::RowId(1));
    }

    #[test]
    fn test_parse_distinguishes_missing_from_malformed() {
        let mut cells = sample_cells();
        cells[Column::RowId.index()] = Some("abc".to_string());
        cells[Column::Segment.index()] = Some("Consumr".to_string());
        cells[Column::Sales.index()] = None;

        let line = OrderLine::parse(raw_line(5, cells), &DateParser::default());

        assert_eq!(line.row_id, Field::Malformed("abc".to_string()));
        assert_eq!(line.state(Column::Segment), FieldState::Malformed);
        assert_eq!(line.state(Column::Sales), FieldState::Missing);
        assert_eq!(line.row_ref(), RowRef::Line(5));
    }

    #[test]
    fn test_non_positive_row_id_is_malformed() {
        let mut cells = sample_cells();
        cells[Column::RowId.index()] = Some("0".to_string());
        let line = OrderLine::parse(raw_line(2, cells), &DateParser::default());
        assert_eq!(line.state(Column::RowId), FieldState::Malformed);
    }
}
