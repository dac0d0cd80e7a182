//! In-memory workbook model
//!
//! Workbooks are loaded whole with calamine, mutated as plain values and
//! written back in one go with rust_xlsxwriter. Cell values, formulas and
//! dates of every sheet survive a load/save cycle; styling other than the bold
//! header row, date formats and column widths is not carried over.

use super::DatasetError;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_xlsxwriter::Format;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Upper bound for auto-sized column widths
pub const MAX_COLUMN_WIDTH: usize = 50;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Serial date-time (days since 1899-12-30)
    DateTime(f64),
    /// Serial duration in days
    Duration(f64),
    /// Formula text without the leading `=`
    Formula(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Trimmed textual form, `None` for blank cells
    pub fn as_key(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let key = self.to_string().trim().to_string();
        (!key.is_empty()).then_some(key)
    }

    /// Non-negative integer value, accepting numeric text
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CellValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u64),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Character length used for column sizing
    pub fn display_len(&self) -> usize {
        self.to_string().chars().count()
    }

    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) if dt.is_duration() => CellValue::Duration(dt.as_f64()),
            Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(chrono::Duration::milliseconds(millis))
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(serial) => match serial_to_datetime(*serial) {
                Some(dt) if dt.num_seconds_from_midnight() == 0 => {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                }
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                None => write!(f, "{}", serial),
            },
            CellValue::Duration(days) => {
                let secs = (days * 86_400.0).round() as i64;
                write!(f, "{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
            }
            CellValue::Formula(formula) => write!(f, "={}", formula),
        }
    }
}

impl From<u64> for CellValue {
    fn from(value: u64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// A named grid of cells, row-major, 0-based
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
    bold_header: bool,
    column_widths: BTreeMap<usize, f64>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            bold_header: false,
            column_widths: BTreeMap::new(),
        }
    }

    /// A sheet whose first row is the given bold header
    pub fn with_header<I, S>(name: impl Into<String>, header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sheet = Self::new(name);
        sheet.append_row(header.into_iter().map(|s| CellValue::Text(s.into())).collect());
        sheet.bold_header = true;
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn bold_header(&self) -> bool {
        self.bold_header
    }

    pub fn set_bold_header(&mut self, bold: bool) {
        self.bold_header = bold;
    }

    pub fn column_width(&self, col: usize) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// Header row as trimmed strings
    pub fn header(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Set a cell, growing the grid as needed
    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    /// Append a row after the last one, returning its index
    pub fn append_row(&mut self, cells: Vec<CellValue>) -> usize {
        self.rows.push(cells);
        self.rows.len() - 1
    }

    /// Size each column to its longest value plus padding, capped
    pub fn autofit_columns(&mut self) {
        let mut longest: BTreeMap<usize, usize> = BTreeMap::new();
        for row in &self.rows {
            for (col, cell) in row.iter().enumerate() {
                let len = longest.entry(col).or_insert(0);
                *len = (*len).max(cell.display_len());
            }
        }
        self.column_widths = longest
            .into_iter()
            .map(|(col, len)| (col, (len + 2).min(MAX_COLUMN_WIDTH) as f64))
            .collect();
    }
}

/// An ordered collection of sheets
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every sheet of an existing workbook
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        let read_error = |source: calamine::Error| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = open_workbook_auto(path).map_err(read_error)?;
        let mut sheets = Vec::new();
        for name in reader.sheet_names() {
            let range = reader.worksheet_range(&name).map_err(read_error)?;
            let formulas = reader.worksheet_formula(&name).map_err(read_error)?;
            let mut sheet = Sheet::new(name);
            if let Some((row0, col0)) = range.start() {
                for (r, row) in range.rows().enumerate() {
                    for (c, data) in row.iter().enumerate() {
                        let value = CellValue::from_data(data);
                        if !value.is_empty() {
                            sheet.set_cell(row0 as usize + r, col0 as usize + c, value);
                        }
                    }
                }
            }
            // Formulas replace their cached results
            if let Some((row0, col0)) = formulas.start() {
                for (r, row) in formulas.rows().enumerate() {
                    for (c, formula) in row.iter().enumerate() {
                        if !formula.is_empty() {
                            let formula = formula.strip_prefix('=').unwrap_or(formula.as_str());
                            sheet.set_cell(
                                row0 as usize + r,
                                col0 as usize + c,
                                CellValue::Formula(formula.to_string()),
                            );
                        }
                    }
                }
            }
            sheets.push(sheet);
        }
        Ok(Self { sheets })
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// Index of the first sheet whose name matches case-insensitively
    pub fn find_sheet(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|sheet| sheet.name.eq_ignore_ascii_case(name))
    }

    pub fn sheet(&self, index: usize) -> &Sheet {
        &self.sheets[index]
    }

    pub fn sheet_mut(&mut self, index: usize) -> &mut Sheet {
        &mut self.sheets[index]
    }

    pub fn add_sheet(&mut self, sheet: Sheet) -> usize {
        self.sheets.push(sheet);
        self.sheets.len() - 1
    }

    /// Write the whole workbook to `path`
    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        let write_error = |source: rust_xlsxwriter::XlsxError| DatasetError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut output = rust_xlsxwriter::Workbook::new();
        let bold = Format::new().set_bold();
        let date = Format::new().set_num_format("yyyy-mm-dd");
        let date_time = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        let duration = Format::new().set_num_format("[h]:mm:ss");

        for sheet in &self.sheets {
            let worksheet = output.add_worksheet();
            worksheet.set_name(sheet.name.as_str()).map_err(write_error)?;

            for (r, row) in sheet.rows.iter().enumerate() {
                let header = r == 0 && sheet.bold_header;
                for (c, cell) in row.iter().enumerate() {
                    let (r, c) = (r as u32, c as u16);
                    match (cell, header) {
                        (CellValue::Empty, _) => continue,
                        (CellValue::Text(s), true) => {
                            worksheet.write_string_with_format(r, c, s.as_str(), &bold)
                        }
                        (CellValue::Text(s), false) => worksheet.write_string(r, c, s.as_str()),
                        (CellValue::Number(n), true) => {
                            worksheet.write_number_with_format(r, c, *n, &bold)
                        }
                        (CellValue::Number(n), false) => worksheet.write_number(r, c, *n),
                        (CellValue::Bool(b), _) => worksheet.write_boolean(r, c, *b),
                        (CellValue::DateTime(serial), _) => {
                            let format = if serial.fract() == 0.0 { &date } else { &date_time };
                            worksheet.write_number_with_format(r, c, *serial, format)
                        }
                        (CellValue::Duration(days), _) => {
                            worksheet.write_number_with_format(r, c, *days, &duration)
                        }
                        (CellValue::Formula(formula), _) => {
                            worksheet.write_formula(r, c, formula.as_str())
                        }
                    }
                    .map_err(write_error)?;
                }
            }

            for (&col, &width) in &sheet.column_widths {
                worksheet
                    .set_column_width(col as u16, width)
                    .map_err(write_error)?;
            }
        }

        output.save(path).map_err(write_error)
    }
}
