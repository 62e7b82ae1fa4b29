//! Spreadsheet ingest and normalization.
//!
//! This module is responsible for turning a sale-records sheet into a clean set
//! of `SaleRecord`s that are safe to aggregate.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip rows with unusable dates, but report them)
//! - **Deterministic behavior** (no locale or clock dependence)
//! - **Separation of concerns**: no aggregation logic here
//!
//! Reading is split in two steps: the file is first turned into a `RawSheet`
//! (headers + loosely typed cells), which is then parsed into records. Only the
//! first step touches the filesystem.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::domain::{ColumnNames, FILTER_COLUMNS, SaleRecord};
use crate::error::AppError;

/// A loosely typed spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() { Cell::Empty } else { Cell::Text(s) }
    }

    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// First sheet of a workbook (or a whole CSV file), before schema validation.
#[derive(Debug, Clone)]
pub struct RawSheet {
    /// Display name of the source (usually the file path).
    pub source: String,
    pub headers: Vec<String>,
    /// Data rows as `(line, cells)`, 1-based line numbers, header excluded.
    pub rows: Vec<(usize, Vec<Cell>)>,
}

/// What to read from a sheet.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub columns: ColumnNames,
    /// Categorical columns captured into `SaleRecord::attributes` when present.
    pub attribute_columns: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            attribute_columns: FILTER_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub source: String,
    pub line: usize,
    pub message: String,
}

/// Ingest output: records + row errors + bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct SalesTable {
    pub sources: Vec<String>,
    pub records: Vec<SaleRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Attribute columns found in every source (usable as filters).
    pub attribute_columns: Vec<String>,
    /// Whether the auxiliary surface column exists in every source.
    pub has_aux_column: bool,
}

impl SalesTable {
    pub fn rows_used(&self) -> usize {
        self.records.len()
    }

    pub fn rows_skipped(&self) -> usize {
        self.row_errors.len()
    }

    /// Concatenate tables in the given order.
    ///
    /// Attribute columns and the aux flag are intersected so filters only offer
    /// columns that every source provides.
    pub fn concat(tables: Vec<SalesTable>) -> SalesTable {
        let mut iter = tables.into_iter();
        let Some(mut out) = iter.next() else {
            return SalesTable::default();
        };
        for t in iter {
            out.sources.extend(t.sources);
            out.records.extend(t.records);
            out.row_errors.extend(t.row_errors);
            out.rows_read += t.rows_read;
            out.attribute_columns.retain(|c| t.attribute_columns.contains(c));
            out.has_aux_column &= t.has_aux_column;
        }
        out
    }

    /// Distinct values of an attribute column, sorted.
    pub fn attribute_values(&self, column: &str) -> Vec<String> {
        let values: BTreeSet<&str> = self
            .records
            .iter()
            .filter_map(|r| r.attributes.get(column))
            .map(|v| v.as_str())
            .collect();
        values.into_iter().map(str::to_string).collect()
    }
}

/// Read and parse one file into a `SalesTable`.
pub fn load_sales(path: &Path, options: &IngestOptions) -> Result<SalesTable, AppError> {
    let sheet = read_sheet(path)?;
    let table = parse_sheet(&sheet, options)?;

    info!(
        source = %sheet.source,
        rows_read = table.rows_read,
        rows_used = table.rows_used(),
        rows_skipped = table.rows_skipped(),
        "loaded sales sheet"
    );
    if table.rows_skipped() > 0 {
        warn!(
            source = %sheet.source,
            skipped = table.rows_skipped(),
            "dropped rows with an unparseable sale date"
        );
    }
    Ok(table)
}

/// Read the first worksheet of a workbook, or a CSV file, into a `RawSheet`.
pub fn read_sheet(path: &Path) -> Result<RawSheet, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_csv_sheet(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook_sheet(path),
        _ => Err(AppError::input(format!(
            "Unsupported file type '{}'. Expected .xlsx, .xls, .ods or .csv.",
            path.display()
        ))),
    }
}

fn read_workbook_sheet(path: &Path) -> Result<RawSheet, AppError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::input(format!("Could not read Excel '{}': {e}", path.display())))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::input(format!("Workbook '{}' has no worksheets.", path.display())))?
        .map_err(|e| AppError::input(format!("Could not read first worksheet of '{}': {e}", path.display())))?;

    sheet_from_range(path.display().to_string(), &range)
}

/// Turn a worksheet range into a `RawSheet`; the first used row is the header.
fn sheet_from_range(source: String, range: &Range<Data>) -> Result<RawSheet, AppError> {
    // Line numbers are reported the way a spreadsheet shows them (1-based,
    // counting from the top of the sheet, not from the used range).
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

    let mut rows = range.rows().enumerate();
    let Some((_, header_row)) = rows.next() else {
        return Err(AppError::input(format!("Worksheet in '{source}' is empty.")));
    };
    let headers = header_row.iter().map(|c| c.to_string()).collect();

    let rows = rows
        .map(|(idx, row)| (first_row + idx + 1, row.iter().map(cell_from_data).collect()))
        .collect();

    Ok(RawSheet { source, headers, rows })
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        // `as_datetime` honours the workbook's 1900/1904 date system.
        Data::DateTime(dt) => dt.as_datetime().map_or(Cell::Empty, |d| Cell::Date(d.date())),
    }
}

fn read_csv_sheet(path: &Path) -> Result<RawSheet, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start on the line after the header, lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| {
            AppError::input(format!("Malformed CSV '{}' at line {line}: {e}", path.display()))
        })?;
        rows.push((line, record.iter().map(Cell::text).collect()));
    }

    Ok(RawSheet {
        source: path.display().to_string(),
        headers,
        rows,
    })
}

/// Validate the schema of a raw sheet and parse its rows.
pub fn parse_sheet(sheet: &RawSheet, options: &IngestOptions) -> Result<SalesTable, AppError> {
    let header_map = build_header_map(&sheet.headers);
    let columns = &options.columns;

    let missing: Vec<&str> = [&columns.date, &columns.year_built, &columns.main_area]
        .into_iter()
        .filter(|name| !header_map.contains_key(&normalize_header_name(name)))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::input(format!(
            "Missing required columns in '{}': {}\n\nDetected columns: {}\nUse --date-col/--built-col/--main-area-col to set the correct names.",
            sheet.source,
            missing.join(", "),
            sheet.headers.join(", ")
        )));
    }

    let idx_date = header_map[&normalize_header_name(&columns.date)];
    let idx_built = header_map[&normalize_header_name(&columns.year_built)];
    let idx_main = header_map[&normalize_header_name(&columns.main_area)];
    let idx_aux = header_map.get(&normalize_header_name(&columns.aux_area)).copied();

    let attributes: Vec<(&str, usize)> = options
        .attribute_columns
        .iter()
        .filter_map(|c| header_map.get(&normalize_header_name(c)).map(|&idx| (c.as_str(), idx)))
        .collect();

    debug!(
        source = %sheet.source,
        aux = idx_aux.is_some(),
        attributes = attributes.len(),
        "resolved sheet columns"
    );

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (line, cells) in &sheet.rows {
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        rows_read += 1;

        let sale_date = match parse_date_cell(cell_at(cells, idx_date)) {
            Ok(d) => d,
            Err(message) => {
                row_errors.push(RowError {
                    source: sheet.source.clone(),
                    line: *line,
                    message,
                });
                continue;
            }
        };

        let mut record = SaleRecord::new(
            sale_date,
            parse_year_cell(cell_at(cells, idx_built)),
            parse_number_cell(cell_at(cells, idx_main)),
        );
        record.aux_surface_sqm = idx_aux.and_then(|idx| parse_number_cell(cell_at(cells, idx)));
        record.line = *line;
        record.attributes = attributes
            .iter()
            .filter_map(|&(name, idx)| attribute_text(cell_at(cells, idx)).map(|v| (name.to_string(), v)))
            .collect::<BTreeMap<_, _>>();

        records.push(record);
    }

    Ok(SalesTable {
        sources: vec![sheet.source.clone()],
        records,
        row_errors,
        rows_read,
        attribute_columns: attributes.iter().map(|(name, _)| name.to_string()).collect(),
        has_aux_column: idx_aux.is_some(),
    })
}

fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // Keep the first occurrence of duplicated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}').trim();
    name.to_lowercase()
}

fn cell_at(cells: &[Cell], idx: usize) -> &Cell {
    static EMPTY: Cell = Cell::Empty;
    cells.get(idx).unwrap_or(&EMPTY)
}

/// Convert an Excel serial day number (1900 date system) to a date.
///
/// Serial 1 is 1900-01-01. Serial 60 is the nonexistent 1900-02-29 that Excel
/// keeps for Lotus compatibility and has no date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let days = serial.floor() as u64;
    let epoch = match days {
        1..=59 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        60 => return None,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    epoch.checked_add_days(Days::new(days))
}

fn parse_date_cell(cell: &Cell) -> Result<NaiveDate, String> {
    match cell {
        Cell::Date(d) => Ok(*d),
        Cell::Number(n) => {
            excel_serial_to_date(*n).ok_or_else(|| format!("Invalid sale date serial {n}."))
        }
        Cell::Text(s) => parse_date_text(s.trim()),
        Cell::Empty => Err("Missing sale date.".to_string()),
    }
}

fn parse_date_text(s: &str) -> Result<NaiveDate, String> {
    // The published files use day-first dates; ISO is accepted too. Time parts
    // are ignored.
    const DATE_FMTS: [&str; 5] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];
    const DATETIME_FMTS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];

    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(serial) = s.parse::<f64>() {
        if let Some(d) = excel_serial_to_date(serial) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid sale date '{s}'. Expected DD/MM/YYYY, YYYY-MM-DD or an Excel date."
    ))
}

fn parse_number_text(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    // The last separator is the decimal mark when both kinds appear
    // (`1.234,5`, `1,234.5`). A single separator is a decimal mark, which
    // covers Greek-locale `85,5`. A repeated one only groups thousands.
    let decimal = match (s.rfind(','), s.rfind('.')) {
        (Some(c), Some(d)) => Some(if c > d { ',' } else { '.' }),
        (Some(_), None) if s.matches(',').count() == 1 => Some(','),
        (None, Some(_)) if s.matches('.').count() == 1 => Some('.'),
        _ => None,
    };
    let normalized: String = s
        .chars()
        .filter(|&ch| !matches!(ch, ',' | '.') || Some(ch) == decimal)
        .map(|ch| if ch == ',' { '.' } else { ch })
        .collect();
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_number_cell(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => parse_number_text(s),
        _ => None,
    }
}

/// Non-numeric and non-positive years are treated as unknown.
fn parse_year_cell(cell: &Cell) -> Option<i32> {
    let v = parse_number_cell(cell)?;
    if v < 1.0 || v > f64::from(i32::MAX) {
        return None;
    }
    Some(v.trunc() as i32)
}

fn attribute_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Cell::Number(n) if n.fract() == 0.0 => Some(format!("{n:.0}")),
        Cell::Number(n) => Some(n.to_string()),
        Cell::Date(d) => Some(d.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_AUX_AREA_COLUMN, DEFAULT_BUILT_COLUMN, DEFAULT_DATE_COLUMN, DEFAULT_MAIN_AREA_COLUMN};
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sheet(headers: &[&str], rows: Vec<Vec<Cell>>) -> RawSheet {
        RawSheet {
            source: "test.xlsx".to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows.into_iter().enumerate().map(|(i, r)| (i + 2, r)).collect(),
        }
    }

    fn default_headers() -> Vec<&'static str> {
        vec![
            DEFAULT_DATE_COLUMN,
            DEFAULT_BUILT_COLUMN,
            DEFAULT_MAIN_AREA_COLUMN,
            DEFAULT_AUX_AREA_COLUMN,
            "Νομαρχία",
        ]
    }

    #[test]
    fn excel_serials() {
        assert_eq!(excel_serial_to_date(45000.0), Some(date(2023, 3, 15)));
        assert_eq!(excel_serial_to_date(45000.75), Some(date(2023, 3, 15)));
        assert_eq!(excel_serial_to_date(61.0), Some(date(1900, 3, 1)));
        assert_eq!(excel_serial_to_date(1.0), Some(date(1900, 1, 1)));
        assert_eq!(excel_serial_to_date(59.0), Some(date(1900, 2, 28)));
        assert_eq!(excel_serial_to_date(60.0), None);
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn date_text_formats() {
        assert_eq!(parse_date_text("15/03/2023"), Ok(date(2023, 3, 15)));
        assert_eq!(parse_date_text("2023-03-15"), Ok(date(2023, 3, 15)));
        assert_eq!(parse_date_text("15.03.2023"), Ok(date(2023, 3, 15)));
        assert_eq!(parse_date_text("2023-03-15 00:00:00"), Ok(date(2023, 3, 15)));
        assert_eq!(parse_date_text("45000"), Ok(date(2023, 3, 15)));
        assert!(parse_date_text("yesterday").is_err());
        assert!(parse_date_text("31/02/2023").is_err());
    }

    #[test]
    fn numbers_accept_comma_decimals() {
        assert_eq!(parse_number_text("85,5"), Some(85.5));
        assert_eq!(parse_number_text("85.5"), Some(85.5));
        assert_eq!(parse_number_text("1,234.5"), Some(1234.5));
        assert_eq!(parse_number_text("1.234,5"), Some(1234.5));
        assert_eq!(parse_number_text("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_number_text("1,234,567.25"), Some(1_234_567.25));
        assert_eq!(parse_number_text("1,234"), Some(1.234));
        assert_eq!(parse_number_text("n/a"), None);
        assert_eq!(parse_year_cell(&Cell::Text("1985".into())), Some(1985));
        assert_eq!(parse_year_cell(&Cell::Number(1985.0)), Some(1985));
        assert_eq!(parse_year_cell(&Cell::Number(0.0)), None);
        assert_eq!(parse_year_cell(&Cell::Text("άγνωστο".into())), None);
    }

    #[test]
    fn workbook_cells_map_to_sheet_cells() {
        use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};

        let dt = |serial, is_1904| Data::DateTime(ExcelDateTime::new(serial, ExcelDateTimeType::DateTime, is_1904));

        assert_eq!(cell_from_data(&Data::String(" ΑΤΤΙΚΗΣ ".into())), Cell::Text(" ΑΤΤΙΚΗΣ ".into()));
        assert_eq!(cell_from_data(&Data::String("  ".into())), Cell::Empty);
        assert_eq!(cell_from_data(&Data::Float(85.5)), Cell::Number(85.5));
        assert_eq!(cell_from_data(&Data::Int(1985)), Cell::Number(1985.0));
        assert_eq!(cell_from_data(&Data::Error(CellErrorType::NA)), Cell::Empty);
        assert_eq!(cell_from_data(&Data::Empty), Cell::Empty);
        assert_eq!(cell_from_data(&dt(43000.0, false)), Cell::Date(date(2017, 9, 22)));
        assert_eq!(cell_from_data(&dt(43000.0, true)), Cell::Date(date(2021, 9, 23)));
    }

    #[test]
    fn parses_workbook_range() {
        use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};

        let headers = default_headers();
        // Used range starts on sheet row 3 (0-based 2), as when a title block sits above.
        let mut range: Range<Data> = Range::new((2, 0), (6, headers.len() as u32 - 1));
        for (col, h) in headers.iter().enumerate() {
            range.set_value((2, col as u32), Data::String(h.to_string()));
        }
        let mac_date = Data::DateTime(ExcelDateTime::new(43000.0, ExcelDateTimeType::DateTime, true));
        let rows = [
            vec![mac_date, Data::Int(1980), Data::Float(70.0), Data::Float(5.0), Data::String("ΑΤΤΙΚΗΣ".into())],
            vec![Data::Float(45000.0), Data::String("1995".into()), Data::String("1.234,5".into()), Data::Empty, Data::Empty],
            vec![Data::Error(CellErrorType::Value), Data::Int(2000), Data::Float(50.0), Data::Empty, Data::Empty],
            vec![Data::String("01/02/2023".into()), Data::Error(CellErrorType::NA), Data::Empty, Data::Empty, Data::Empty],
        ];
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                range.set_value((3 + r as u32, c as u32), value);
            }
        }

        let raw = sheet_from_range("sales.xlsx".to_string(), &range).unwrap();
        assert_eq!(raw.headers[0], DEFAULT_DATE_COLUMN);
        assert_eq!(raw.rows[0].0, 4);

        let table = parse_sheet(&raw, &IngestOptions::default()).unwrap();
        assert_eq!(table.rows_used(), 3);
        assert_eq!(table.rows_skipped(), 1);
        assert_eq!(table.row_errors[0].line, 6);

        let mac = &table.records[0];
        assert_eq!(mac.sale_date, date(2021, 9, 23));
        assert_eq!(mac.year_built, Some(1980));
        assert_eq!(mac.aux_surface_sqm, Some(5.0));
        assert_eq!(table.records[1].sale_date, date(2023, 3, 15));
        assert_eq!(table.records[1].main_surface_sqm, Some(1234.5));
        assert_eq!(table.records[2].year_built, None);
        assert_eq!(table.records[2].main_surface_sqm, None);
    }

    #[test]
    fn empty_worksheet_is_an_error() {
        let range: Range<Data> = Range::empty();
        let err = sheet_from_range("empty.xlsx".to_string(), &range).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header_name("\u{feff} Έτος Κατασκευής "), "έτος κατασκευής");
        assert_eq!(normalize_header_name("ID"), "id");
    }

    #[test]
    fn parses_rows_and_drops_bad_dates() {
        let s = sheet(
            &default_headers(),
            vec![
                vec![
                    Cell::Date(date(2023, 1, 10)),
                    Cell::Number(1985.0),
                    Cell::Number(80.0),
                    Cell::Number(10.0),
                    Cell::text("ΑΤΤΙΚΗΣ"),
                ],
                vec![Cell::text("not a date"), Cell::Number(2000.0), Cell::Number(50.0), Cell::Empty, Cell::Empty],
                vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty],
                vec![Cell::text("02/02/2023"), Cell::Empty, Cell::text("abc"), Cell::Empty, Cell::Empty],
            ],
        );

        let table = parse_sheet(&s, &IngestOptions::default()).unwrap();
        assert_eq!(table.rows_read, 3);
        assert_eq!(table.rows_used(), 2);
        assert_eq!(table.rows_skipped(), 1);
        assert_eq!(table.row_errors[0].line, 3);
        assert!(table.has_aux_column);
        assert_eq!(table.attribute_columns, vec!["Νομαρχία".to_string()]);

        let first = &table.records[0];
        assert_eq!(first.sale_date, date(2023, 1, 10));
        assert_eq!(first.year_built, Some(1985));
        assert_eq!(first.main_surface_sqm, Some(80.0));
        assert_eq!(first.aux_surface_sqm, Some(10.0));
        assert_eq!(first.attributes.get("Νομαρχία").map(String::as_str), Some("ΑΤΤΙΚΗΣ"));

        let second = &table.records[1];
        assert_eq!(second.year_built, None);
        assert_eq!(second.main_surface_sqm, None);
        assert!(second.attributes.is_empty());
    }

    #[test]
    fn missing_required_columns_is_an_error() {
        let s = sheet(&[DEFAULT_DATE_COLUMN, "other"], vec![]);
        let err = parse_sheet(&s, &IngestOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains(DEFAULT_BUILT_COLUMN));
        assert!(err.message().contains(DEFAULT_MAIN_AREA_COLUMN));
        assert!(err.message().contains("other"));
    }

    #[test]
    fn custom_column_names() {
        let options = IngestOptions {
            columns: ColumnNames {
                date: "date".into(),
                year_built: "built".into(),
                main_area: "sqm".into(),
                aux_area: "aux".into(),
            },
            attribute_columns: vec![],
        };
        let s = sheet(
            &["DATE", "Built", "SQM"],
            vec![vec![Cell::text("2022-06-01"), Cell::text("2019"), Cell::text("70")]],
        );
        let table = parse_sheet(&s, &options).unwrap();
        assert_eq!(table.rows_used(), 1);
        assert!(!table.has_aux_column);
        assert_eq!(table.records[0].aux_surface_sqm, None);
    }

    #[test]
    fn concat_intersects_columns() {
        let a = SalesTable {
            sources: vec!["a".into()],
            records: vec![SaleRecord::new(date(2021, 1, 1), None, Some(1.0))],
            rows_read: 1,
            attribute_columns: vec!["Νομαρχία".into(), "Κατηγορία Ακινήτου".into()],
            has_aux_column: true,
            ..SalesTable::default()
        };
        let b = SalesTable {
            sources: vec!["b".into()],
            records: vec![SaleRecord::new(date(2022, 1, 1), None, Some(1.0))],
            rows_read: 2,
            attribute_columns: vec!["Νομαρχία".into()],
            has_aux_column: false,
            ..SalesTable::default()
        };
        let merged = SalesTable::concat(vec![a, b]);
        assert_eq!(merged.sources, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(merged.records.len(), 2);
        assert_eq!(merged.rows_read, 3);
        assert_eq!(merged.attribute_columns, vec!["Νομαρχία".to_string()]);
        assert!(!merged.has_aux_column);
    }

    #[test]
    fn reads_csv_files() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(
            file,
            "\u{feff}{DEFAULT_DATE_COLUMN},{DEFAULT_BUILT_COLUMN},{DEFAULT_MAIN_AREA_COLUMN},Νομαρχία"
        )
        .unwrap();
        writeln!(file, "15/03/2023,1975,\"85,5\",ΑΤΤΙΚΗΣ").unwrap();
        writeln!(file, "bad,1975,60,ΑΤΤΙΚΗΣ").unwrap();
        file.flush().unwrap();

        let table = load_sales(file.path(), &IngestOptions::default()).unwrap();
        assert_eq!(table.rows_used(), 1);
        assert_eq!(table.rows_skipped(), 1);
        assert_eq!(table.row_errors[0].line, 3);
        assert_eq!(table.records[0].main_surface_sqm, Some(85.5));
        assert_eq!(table.records[0].line, 2);
        assert_eq!(table.attribute_values("Νομαρχία"), vec!["ΑΤΤΙΚΗΣ".to_string()]);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = read_sheet(Path::new("sales.txt")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
