//! Shared fixtures for unit tests.

use crate::model::{DateParser, OrderLine, RawOrderLine};

/// The first line of the reference Superstore export, as text cells.
pub fn sample_cells() -> Vec<Option<String>> {
    [
        "1",
        "CA-2016-152156",
        "11/8/2016",
        "11/11/2016",
        "Second Class",
        "CG-12520",
        "Claire Gute",
        "Consumer",
        "United States",
        "Henderson",
        "Kentucky",
        "42420",
        "South",
        "FUR-BO-10001798",
        "Furniture",
        "Bookcases",
        "Bush Somerset Collection Bookcase",
        "261.96",
        "2",
        "0",
        "41.9136",
    ]
    .iter()
    .map(|cell| Some(cell.to_string()))
    .collect()
}

/// Builds a raw line from cells.
pub fn raw_line(source_line: usize, cells: Vec<Option<String>>) -> RawOrderLine {
    RawOrderLine::new(source_line, cells)
}

/// Builds a typed line from the sample with selected cells replaced.
///
/// `overrides` pairs a column with its new text; `None` blanks the cell.
pub fn line_with(
    source_line: usize,
    overrides: &[(crate::model::Column, Option<&str>)],
) -> OrderLine {
    let mut cells = sample_cells();
    for (column, value) in overrides {
        cells[column.index()] = value.map(str::to_string);
    }
    OrderLine::parse(raw_line(source_line, cells), &DateParser::default())
}
