//! Spreadsheet codec for the tabular backing file.
//!
//! # Responsibility
//! - Read the first (or a selected) worksheet of a workbook into a
//!   string-typed [`Table`].
//! - Write a [`Table`] as a single-sheet `.xlsx` workbook.
//!
//! # Invariants
//! - Every row of a decoded [`Table`] has exactly `headers.len()` cells.
//! - Cell values are strings; numbers that are whole are rendered without a
//!   fractional part and date cells are rendered as `YYYY-MM-DD`.

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};
use rust_xlsxwriter::{Workbook, XlsxError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Worksheet name used for workbooks written by this crate.
pub const DEFAULT_SHEET_NAME: &str = "Projects";

pub type SheetResult<T> = Result<T, SheetError>;

/// Errors raised while decoding or encoding workbooks.
#[derive(Debug)]
pub enum SheetError {
    /// The bytes or file are not a readable workbook.
    Open(String),
    /// The requested worksheet does not exist.
    MissingSheet(String),
    /// A worksheet exists but could not be decoded.
    Read(String),
    /// A row or column position exceeds the worksheet grid on encode.
    Layout(String),
    /// The workbook could not be encoded.
    Write(XlsxError),
}

impl Display for SheetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(message) => write!(f, "failed to open workbook: {message}"),
            Self::MissingSheet(selector) => write!(f, "worksheet not found: {selector}"),
            Self::Read(message) => write!(f, "failed to read worksheet: {message}"),
            Self::Layout(message) => write!(f, "failed to write workbook: {message}"),
            Self::Write(err) => write!(f, "failed to write workbook: {err}"),
        }
    }
}

impl Error for SheetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Write(err) => Some(err),
            _ => None,
        }
    }
}

impl From<XlsxError> for SheetError {
    fn from(value: XlsxError) -> Self {
        Self::Write(value)
    }
}

/// Worksheet selector for multi-sheet sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// Zero-based worksheet position.
    Index(usize),
    /// Worksheet name (exact match).
    Name(String),
}

impl SheetSelector {
    /// Parses user input: a non-negative integer selects by position,
    /// anything else by name. Blank input selects nothing.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.parse::<usize>() {
            Ok(index) => Self::Index(index),
            Err(_) => Self::Name(trimmed.to_string()),
        })
    }
}

impl Display for SheetSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{index}"),
            Self::Name(name) => write!(f, "`{name}`"),
        }
    }
}

/// String-typed table: one header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Position of a header by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Cell value at (`row`, `column`), empty when out of range.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Decodes workbook bytes (`xlsx`, `xls`, `ods`) into a [`Table`].
pub fn read_table_from_bytes(bytes: &[u8], selector: Option<&SheetSelector>) -> SheetResult<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|err| SheetError::Open(err.to_string()))?;
    let range = select_range(&mut workbook, selector)?;
    Ok(range_to_table(&range))
}

/// Decodes a workbook file into a [`Table`] using its first worksheet.
pub fn read_table_from_path(path: &Path) -> SheetResult<Table> {
    let mut workbook =
        open_workbook_auto(path).map_err(|err| SheetError::Open(err.to_string()))?;
    let range = select_range(&mut workbook, None)?;
    Ok(range_to_table(&range))
}

/// Encodes a [`Table`] as `.xlsx` bytes in a worksheet named `sheet_name`.
///
/// `numeric_columns` are written as numbers when the cell parses as one.
pub fn write_table_to_buffer(
    table: &Table,
    sheet_name: &str,
    numeric_columns: &[&str],
) -> SheetResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, col_num(col)?, header)?;
    }

    let numeric: Vec<bool> = table
        .headers
        .iter()
        .map(|header| numeric_columns.contains(&header.as_str()))
        .collect();

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1)
            .map_err(|_| SheetError::Layout(format!("row index {row_idx} out of range")))?;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let col = col_num(col)?;
            match numeric.get(usize::from(col)) {
                Some(true) => match value.parse::<f64>() {
                    Ok(number) => worksheet.write_number(row_num, col, number)?,
                    Err(_) => worksheet.write_string(row_num, col, value)?,
                },
                _ => worksheet.write_string(row_num, col, value)?,
            };
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn col_num(col: usize) -> SheetResult<u16> {
    u16::try_from(col)
        .map_err(|_| SheetError::Layout(format!("column index {col} out of range")))
}

fn select_range<R, RS>(
    workbook: &mut R,
    selector: Option<&SheetSelector>,
) -> SheetResult<Range<Data>>
where
    R: Reader<RS>,
    R::Error: Display,
    RS: Read + Seek,
{
    let result = match selector {
        None => workbook.worksheet_range_at(0),
        Some(SheetSelector::Index(index)) => workbook.worksheet_range_at(*index),
        Some(SheetSelector::Name(name)) => {
            if !workbook.sheet_names().iter().any(|sheet| sheet == name) {
                return Err(SheetError::MissingSheet(name.clone()));
            }
            Some(workbook.worksheet_range(name))
        }
    };

    match result {
        Some(Ok(range)) => Ok(range),
        Some(Err(err)) => Err(SheetError::Read(err.to_string())),
        None => Err(SheetError::MissingSheet(
            selector
                .map(ToString::to_string)
                .unwrap_or_else(|| "#0".to_string()),
        )),
    }
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(cells) => cells
            .iter()
            .map(|cell| cell_to_string(cell).trim().to_string())
            .collect(),
        None => return Table::default(),
    };

    let width = headers.len();
    let rows = rows
        .map(|cells| {
            (0..width)
                .map(|idx| cells.get(idx).map(cell_to_string).unwrap_or_default())
                .collect()
        })
        .collect();

    Table { headers, rows }
}

/// Renders one decoded cell as text.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(value) => value.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) => format_float(*value),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) if datetime.time() == chrono::NaiveTime::MIN => {
                datetime.format("%Y-%m-%d").to_string()
            }
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format_float(value.as_f64()),
        },
        Data::DateTimeIso(value) | Data::DurationIso(value) => value.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table {
            headers: vec!["No".to_string(), "Name".to_string(), "When".to_string()],
            rows: vec![
                vec!["1".to_string(), "alpha".to_string(), "2024-01-10".to_string()],
                vec!["2".to_string(), String::new(), String::new()],
            ],
        }
    }

    #[test]
    fn selector_parses_index_or_name() {
        assert_eq!(SheetSelector::parse("2"), Some(SheetSelector::Index(2)));
        assert_eq!(
            SheetSelector::parse(" Data "),
            Some(SheetSelector::Name("Data".to_string()))
        );
        assert_eq!(SheetSelector::parse("  "), None);
    }

    #[test]
    fn written_table_decodes_back_with_padded_rows() {
        let bytes = write_table_to_buffer(&sample_table(), DEFAULT_SHEET_NAME, &["No"])
            .expect("table should encode");
        let decoded = read_table_from_bytes(&bytes, None).expect("table should decode");

        assert_eq!(decoded.headers, vec!["No", "Name", "When"]);
        assert_eq!(decoded.rows.len(), 2);
        assert_eq!(decoded.cell(0, 0), "1");
        assert_eq!(decoded.cell(0, 2), "2024-01-10");
        assert_eq!(decoded.rows[1].len(), 3);
        assert_eq!(decoded.cell(1, 1), "");
    }

    #[test]
    fn missing_named_sheet_is_reported() {
        let bytes = write_table_to_buffer(&sample_table(), DEFAULT_SHEET_NAME, &[])
            .expect("table should encode");
        let err = read_table_from_bytes(&bytes, Some(&SheetSelector::Name("Nope".to_string())))
            .expect_err("unknown sheet must fail");
        assert!(matches!(err, SheetError::MissingSheet(name) if name == "Nope"));
    }

    #[test]
    fn garbage_bytes_fail_to_open() {
        let err = read_table_from_bytes(b"not a workbook", None).expect_err("garbage must fail");
        assert!(matches!(err, SheetError::Open(_)));
    }

    #[test]
    fn whole_floats_render_without_fraction() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn oversized_columns_fail_as_write_errors() {
        assert_eq!(col_num(3).unwrap(), 3);
        let err = col_num(usize::from(u16::MAX) + 1).expect_err("column must overflow");
        assert!(matches!(err, SheetError::Layout(_)));
        assert!(err.to_string().starts_with("failed to write workbook"));
    }
}
