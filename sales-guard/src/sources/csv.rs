//! CSV file source implementation.

use super::{source_schema, DataSource};
use crate::model::{Column, COLUMN_COUNT};
use crate::prelude::*;
use arrow::array::{ArrayRef, StringBuilder, UInt64Builder};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Character encoding of the input file.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum InputEncoding {
    /// UTF-8 when the whole file is valid UTF-8, Windows-1252 otherwise.
    #[default]
    Auto,
    #[serde(rename = "utf-8")]
    #[value(name = "utf-8")]
    Utf8,
    #[serde(rename = "windows-1252")]
    #[value(name = "windows-1252")]
    Windows1252,
}

impl InputEncoding {
    /// The encoding to decode `bytes` with.
    pub fn resolve(self, bytes: &[u8]) -> &'static Encoding {
        match self {
            InputEncoding::Utf8 => UTF_8,
            InputEncoding::Windows1252 => WINDOWS_1252,
            InputEncoding::Auto if std::str::from_utf8(bytes).is_ok() => UTF_8,
            InputEncoding::Auto => WINDOWS_1252,
        }
    }
}

/// Options for configuring CSV file reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    pub encoding: InputEncoding,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            encoding: InputEncoding::Auto,
        }
    }
}

/// An order-line CSV file with a header row.
///
/// The file is decoded to UTF-8 and split into records here, then
/// registered as an in-memory table of text columns. Records with too few
/// or too many fields, malformed numbers and stray bytes all reach the
/// checks instead of failing the scan.
///
/// # Examples
///
/// ```rust,no_run
/// use sales_guard::sources::{CsvOptions, CsvSource, InputEncoding};
///
/// let source = CsvSource::new("data/Superstore_Cleaned.csv");
///
/// let tabbed = CsvSource::with_options(
///     "data/superstore.tsv",
///     CsvOptions {
///         delimiter: b'\t',
///         encoding: InputEncoding::Windows1252,
///         ..Default::default()
///     },
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    options: CsvOptions,
}

impl CsvSource {
    /// Creates a new CSV source from a file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: CsvOptions::default(),
        }
    }

    /// Creates a new CSV source with custom options.
    pub fn with_options(path: impl Into<PathBuf>, options: CsvOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    /// Splits decoded text into a header check and one batch of records.
    fn read_batch(&self, text: &str) -> Result<RecordBatch> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .from_reader(text.as_bytes());

        let headers = reader.headers().map_err(|e| self.read_error(e))?.clone();
        check_header(&headers)?;

        let mut cells: Vec<StringBuilder> = (0..COLUMN_COUNT).map(|_| StringBuilder::new()).collect();
        let mut source_lines = UInt64Builder::new();
        let mut field_counts = UInt64Builder::new();
        let mut record = ::csv::StringRecord::new();
        let mut rows = 0u64;
        while reader
            .read_record(&mut record)
            .map_err(|e| self.read_error(e))?
        {
            rows += 1;
            // Quoted cells may span lines, so take the record's own position.
            let line = record.position().map_or(rows + 1, |position| position.line());
            source_lines.append_value(line);
            field_counts.append_value(record.len() as u64);
            for (index, builder) in cells.iter_mut().enumerate() {
                match record.get(index).filter(|cell| !cell.is_empty()) {
                    Some(cell) => builder.append_value(cell),
                    None => builder.append_null(),
                }
            }
        }

        let mut columns: Vec<ArrayRef> = cells
            .iter_mut()
            .map(|builder| Arc::new(builder.finish()) as ArrayRef)
            .collect();
        columns.push(Arc::new(source_lines.finish()));
        columns.push(Arc::new(field_counts.finish()));
        Ok(RecordBatch::try_new(source_schema(), columns)?)
    }

    fn read_error(&self, error: ::csv::Error) -> GuardError {
        GuardError::data_source_with_source(
            "csv",
            format!("failed to read '{}'", self.path.display()),
            Box::new(error),
        )
    }
}

/// Compares the header record with the expected columns.
///
/// A wrong column count is an error. Names are compared ignoring case,
/// whitespace and punctuation; a mismatch with the right count only warns,
/// since columns are read by position.
fn check_header(headers: &::csv::StringRecord) -> Result<()> {
    let found = if headers.iter().all(|name| name.trim().is_empty()) {
        0
    } else {
        headers.len()
    };
    if found != COLUMN_COUNT {
        return Err(GuardError::schema_mismatch(COLUMN_COUNT, found));
    }

    for (column, name) in Column::ALL.iter().zip(headers.iter()) {
        if normalize_header(name) != normalize_header(column.header()) {
            warn!(
                column.position = column.index() + 1,
                column.expected = column.header(),
                column.found = %name,
                "Header name differs from the expected column, reading by position"
            );
        }
    }
    Ok(())
}

fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Decodes the file to text. A UTF-8 byte order mark is dropped first.
fn decode(bytes: &[u8], choice: InputEncoding) -> (Cow<'_, str>, &'static Encoding) {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let encoding = choice.resolve(bytes);
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        warn!(
            source.encoding = encoding.name(),
            "Input has byte sequences invalid in its encoding, replaced with U+FFFD"
        );
    }
    (text, encoding)
}

#[async_trait]
impl DataSource for CsvSource {
    #[instrument(skip(self, ctx), fields(table.name = %table_name, source.type = "csv"))]
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        if !self.path.is_file() {
            return Err(GuardError::data_source(
                "csv",
                format!("input file '{}' does not exist", self.path.display()),
            ));
        }
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading '{}'", self.path.display()))?;
        let (text, encoding) = decode(&bytes, self.options.encoding);
        let batch = self.read_batch(&text)?;
        let rows = batch.num_rows();

        let table = MemTable::try_new(source_schema(), vec![vec![batch]])?;
        ctx.deregister_table(table_name)?;
        ctx.register_table(table_name, Arc::new(table))?;

        info!(
            source.path = %self.path.display(),
            source.encoding = encoding.name(),
            rows,
            "Registered CSV source"
        );
        Ok(())
    }

    fn description(&self) -> String {
        format!("CSV file: {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::load_raw_lines;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Row ID,Order ID,Order Date,Ship Date,Ship Mode,Customer ID,Customer Name,Segment,Country,City,State,Postal Code,Region,Product ID,Category,Sub-Category,Product Name,Sales,Quantity,Discount,Profit";
    const ROW: &str = "1,CA-2016-152156,11/8/2016,11/11/2016,Second Class,CG-12520,Claire Gute,Consumer,United States,Henderson,Kentucky,42420,South,FUR-BO-10001798,Furniture,Bookcases,Bush Somerset,261.96,2,0,41.9136";

    fn csv_bytes(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn csv_file(content: &str) -> NamedTempFile {
        csv_bytes(content.as_bytes())
    }

    async fn load(source: CsvSource) -> Result<Vec<crate::model::RawOrderLine>> {
        let ctx = SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1));
        source.register(&ctx, "order_lines").await?;
        load_raw_lines(&ctx, "order_lines").await
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" sub_category "), "subcategory");
        assert_eq!(normalize_header("Sub-Category"), "subcategory");
    }

    #[test]
    fn test_check_header() {
        let lower = ::csv::StringRecord::from(HEADER.to_lowercase().split(',').collect::<Vec<_>>());
        assert!(check_header(&lower).is_ok());

        let narrow = ::csv::StringRecord::from(vec!["Row ID", "Order ID", "Sales"]);
        let err = check_header(&narrow).unwrap_err();
        assert!(matches!(err, GuardError::SchemaMismatch { expected: 21, found: 3 }));

        let empty = ::csv::StringRecord::new();
        assert!(matches!(
            check_header(&empty),
            Err(GuardError::SchemaMismatch { found: 0, .. })
        ));
    }

    #[test]
    fn test_auto_encoding() {
        assert_eq!(InputEncoding::Auto.resolve("Café".as_bytes()), UTF_8);
        assert_eq!(InputEncoding::Auto.resolve(b"Caf\xE9"), WINDOWS_1252);
        assert_eq!(InputEncoding::Utf8.resolve(b"Caf\xE9"), UTF_8);

        let (text, encoding) = decode(b"\xEF\xBB\xBFRow ID", InputEncoding::Auto);
        assert_eq!(text, "Row ID");
        assert_eq!(encoding, UTF_8);
    }

    #[tokio::test]
    async fn test_register_missing_file() {
        let ctx = SessionContext::new();
        let err = CsvSource::new("/no/such/superstore.csv")
            .register(&ctx, "order_lines")
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::DataSource { .. }));
    }

    #[tokio::test]
    async fn test_wrong_header_count_is_an_error() {
        let file = csv_file("Row ID,Order ID,Sales\n1,A,3\n");
        let err = load(CsvSource::new(file.path())).await.unwrap_err();
        assert!(matches!(err, GuardError::SchemaMismatch { .. }));
    }

    #[tokio::test]
    async fn test_register_reads_everything_as_text() {
        let file = csv_file(&format!(
            "{HEADER}\n\
             1,CA-2016-152156,11/8/2016,11/11/2016,Second Class,CG-12520,Claire Gute,Consumer,United States,Henderson,Kentucky,04240,South,FUR-BO-10001798,Furniture,Bookcases,\"Bush Somerset Collection Bookcase, Fully Assembled\",261.96,2,0,41.9136\n\
             2,CA-2016-152156,not a date,11/11/2016,Second Class,CG-12520,Claire Gute,Consumer,United States, Henderson ,Kentucky,42420,South,FUR-CH-10000454,Furniture,Chairs,Hon Chair,abc,3,,219.582\n"
        ));
        let source = CsvSource::new(file.path());
        assert!(source.description().contains("CSV file"));
        let lines = load(source).await.unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].get(Column::PostalCode), Some("04240"));
        assert_eq!(
            lines[0].get(Column::ProductName),
            Some("Bush Somerset Collection Bookcase, Fully Assembled")
        );
        assert_eq!(lines[1].get(Column::OrderDate), Some("not a date"));
        assert_eq!(lines[1].get(Column::Sales), Some("abc"));
        assert_eq!(lines[1].get(Column::Discount), None);
        assert_eq!(lines[1].get(Column::City), Some("Henderson"));
        assert_eq!(lines[1].as_read(Column::City), Some(" Henderson "));
    }

    #[tokio::test]
    async fn test_windows_1252_input_is_decoded() {
        let (before, after) = ROW.split_once("Bush Somerset").unwrap();
        let mut content = format!("{HEADER}\n{ROW}\n{before}Caf").into_bytes();
        content.push(0xE9);
        content.extend_from_slice(format!(" Table{after}\n").as_bytes());
        let file = csv_bytes(&content);

        let lines = load(CsvSource::new(file.path())).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].get(Column::ProductName), Some("Caf\u{e9} Table"));
    }

    #[tokio::test]
    async fn test_short_and_long_records_are_kept() {
        let short = ROW.rsplit_once(',').unwrap().0.replacen("1,", "2,", 1);
        let long = format!("{},extra", ROW.replacen("1,", "3,", 1));
        let file = csv_file(&format!("{HEADER}\n{ROW}\n{short}\n{long}\n"));

        let lines = load(CsvSource::new(file.path())).await.unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].field_count(), COLUMN_COUNT);
        assert_eq!(lines[1].field_count(), COLUMN_COUNT - 1);
        assert_eq!(lines[1].get(Column::Profit), None);
        assert_eq!(lines[2].field_count(), COLUMN_COUNT + 1);
        assert_eq!(lines[2].get(Column::Profit), Some("41.9136"));
    }

    #[tokio::test]
    async fn test_source_lines_follow_the_file() {
        let spanning = ROW.replace("Bush Somerset", "\"Bush Somerset\nTall\"");
        let blank_id = ROW.replacen("1,", ",", 1);
        let file = csv_file(&format!("{HEADER}\n{spanning}\n{blank_id}\n"));

        let lines = load(CsvSource::new(file.path())).await.unwrap();
        assert_eq!(lines[0].source_line(), 2);
        assert_eq!(lines[0].get(Column::ProductName), Some("Bush Somerset\nTall"));
        assert_eq!(lines[1].source_line(), 4);
        assert_eq!(lines[1].get(Column::RowId), None);
    }

    #[tokio::test]
    async fn test_header_only_file_has_no_lines() {
        let file = csv_file(&format!("{HEADER}\n"));
        assert!(load(CsvSource::new(file.path())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tab_delimited_input() {
        let file = csv_file(&format!(
            "{}\n{}\n",
            HEADER.replace(',', "\t"),
            ROW.replace(',', "\t")
        ));
        let source = CsvSource::with_options(
            file.path(),
            CsvOptions {
                delimiter: b'\t',
                ..Default::default()
            },
        );
        let lines = load(source).await.unwrap();
        assert_eq!(lines[0].get(Column::Sales), Some("261.96"));
    }
}
