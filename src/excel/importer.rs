//! Workbook importer: spreadsheet files → sparse [`Workbook`]

use crate::error::{ExcelloError, ExcelloResult};
use crate::types::{Cell, CellValue, Sheet, Workbook};
use calamine::{open_workbook_auto, Data, ExcelDateTime, Range, Reader};
use chrono::NaiveTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Sheet name given to the single sheet of a CSV file
pub const CSV_SHEET_NAME: &str = "Sheet1";

/// Extensions accepted by [`WorkbookImporter::import`]
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods", "csv"];

/// Reads a spreadsheet file into a [`Workbook`]
pub struct WorkbookImporter {
    path: PathBuf,
}

impl WorkbookImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Decode the file, dispatching on its extension
    pub fn import(&self) -> ExcelloResult<Workbook> {
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let workbook = match extension.as_str() {
            "csv" => self.import_csv()?,
            ext if SUPPORTED_EXTENSIONS.contains(&ext) => self.import_spreadsheet()?,
            _ => {
                return Err(ExcelloError::UnsupportedFile(
                    self.path.display().to_string(),
                ))
            }
        };

        info!(
            path = %self.path.display(),
            sheets = workbook.sheet_names.len(),
            "imported workbook"
        );
        Ok(workbook)
    }

    fn import_spreadsheet(&self) -> ExcelloResult<Workbook> {
        let mut source = open_workbook_auto(&self.path).map_err(|e| {
            ExcelloError::Import(format!("Failed to open {}: {}", self.path.display(), e))
        })?;

        let sheet_names = source.sheet_names().to_vec();
        let mut workbook = Workbook::new();
        for sheet_name in sheet_names {
            let range = source.worksheet_range(&sheet_name).map_err(|e| {
                ExcelloError::Import(format!("Failed to read sheet '{}': {}", sheet_name, e))
            })?;
            workbook.add_sheet(sheet_name, sheet_from_range(&range));
        }
        Ok(workbook)
    }

    fn import_csv(&self) -> ExcelloResult<Workbook> {
        let bytes = fs::read(&self.path)?;
        let content = String::from_utf8_lossy(&bytes);
        let content = content.trim_start_matches('\u{feff}');
        Ok(Workbook::single(CSV_SHEET_NAME, sheet_from_csv(content)?))
    }
}

/// Convert a calamine range, keeping absolute cell positions.
///
/// calamine ranges start at the first used cell, so the range origin is
/// added back to keep row numbers identical to the file's.
pub fn sheet_from_range(range: &Range<Data>) -> Sheet {
    let mut sheet = Sheet::new();
    let (row_origin, col_origin) = range.start().unwrap_or((0, 0));

    for (row, col, data) in range.used_cells() {
        if let Some(cell) = convert_cell(data) {
            sheet.set(
                col_origin as usize + col,
                row_origin + row as u32 + 1,
                cell,
            );
        }
    }
    sheet
}

/// Parse CSV text into a sheet. Empty fields are absent cells; numeric fields
/// become numbers with the original text kept as the formatted value.
pub fn sheet_from_csv(content: &str) -> ExcelloResult<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut sheet = Sheet::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ExcelloError::Import(format!("CSV error: {}", e)))?;
        for (col_idx, field) in record.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            sheet.set(col_idx, row_idx as u32 + 1, csv_cell(field));
        }
    }
    Ok(sheet)
}

fn csv_cell(field: &str) -> Cell {
    let trimmed = field.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() && !trimmed.is_empty() => Cell::number(n).with_formatted(field),
        _ => Cell::text(field),
    }
}

fn convert_cell(data: &Data) -> Option<Cell> {
    let cell = match data {
        Data::Empty => return None,
        Data::String(s) => Cell::text(s.clone()),
        Data::Int(i) => Cell::number(*i as f64),
        Data::Float(f) => Cell::number(*f),
        Data::Bool(b) => Cell::new(CellValue::Bool(*b)),
        Data::DateTime(dt) => {
            let cell = Cell::number(dt.as_f64());
            match format_datetime(dt) {
                Some(text) => cell.with_formatted(text),
                None => cell,
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
        Data::Error(e) => Cell::new(CellValue::Error(e.to_string())),
    };
    Some(cell)
}

/// Render a date serial the way it reads in a spreadsheet
fn format_datetime(dt: &ExcelDateTime) -> Option<String> {
    if dt.is_duration() {
        return None;
    }
    let value = dt.as_datetime()?;
    let text = if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    };
    Some(text)
}
