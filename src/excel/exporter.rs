//! Workbook exporter: result sets → .xlsx

use crate::config::OutputSettings;
use crate::core::Reconciliation;
use crate::error::{ExcelloError, ExcelloResult};
use crate::types::{CellValue, Sheet};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of generated export file names
pub const EXPORT_FILE_PREFIX: &str = "Excello";

/// Which result sets go into an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportSelection {
    Matched,
    Missing,
    Both,
}

/// Header row followed by the data rows, column for column
pub fn to_exportable_sheet(columns: &[String], rows: &[Vec<String>]) -> Sheet {
    Sheet::from_rows(
        std::iter::once(columns)
            .chain(rows.iter().map(Vec::as_slice))
            .map(|row| row.iter().cloned()),
    )
}

/// `Excello-<timestamp>.xlsx` with an ISO 8601 basic-format UTC timestamp
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!(
        "{}-{}.xlsx",
        EXPORT_FILE_PREFIX,
        now.format("%Y%m%dT%H%M%S%.3fZ")
    )
}

/// Ordered list of named sheets written as one workbook
#[derive(Debug, Default)]
pub struct WorkbookExporter {
    sheets: Vec<(String, Sheet)>,
}

impl WorkbookExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: impl Into<String>, sheet: Sheet) -> &mut Self {
        self.sheets.push((name.into(), sheet));
        self
    }

    /// Sheets for a reconciliation: matched rows, missing rows, or both in that order
    pub fn for_reconciliation(
        result: &Reconciliation,
        selection: ExportSelection,
        output: &OutputSettings,
    ) -> Self {
        let mut exporter = Self::new();
        if matches!(selection, ExportSelection::Matched | ExportSelection::Both) {
            exporter.add_sheet(
                output.matched_sheet.clone(),
                to_exportable_sheet(&result.columns, &result.matched),
            );
        }
        if matches!(selection, ExportSelection::Missing | ExportSelection::Both) {
            exporter.add_sheet(
                output.missing_sheet.clone(),
                to_exportable_sheet(&result.columns, &result.missing),
            );
        }
        exporter
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Write the workbook to `output_path`
    pub fn export(&self, output_path: &Path) -> ExcelloResult<()> {
        if self.sheets.is_empty() {
            return Err(ExcelloError::Export("No sheets to export".to_string()));
        }

        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        for (name, sheet) in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(name)
                .map_err(|e| ExcelloError::Export(format!("Failed to set worksheet name: {}", e)))?;
            write_sheet(worksheet, sheet, &header_format)?;
            worksheet.autofit();
        }

        workbook
            .save(output_path)
            .map_err(|e| ExcelloError::Export(format!("Failed to save Excel file: {}", e)))?;

        info!(
            path = %output_path.display(),
            sheets = ?self.sheet_names(),
            "exported workbook"
        );
        Ok(())
    }

    /// Write into `dir` under a timestamped name; returns the file path
    pub fn export_to_dir(&self, dir: &Path) -> ExcelloResult<PathBuf> {
        let path = dir.join(export_file_name(Utc::now()));
        self.export(&path)?;
        Ok(path)
    }
}

/// Copy every present cell; row 1 is the bold header
fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet, header_format: &Format) -> ExcelloResult<()> {
    for (row, col, cell) in sheet.cells() {
        let excel_row = row - 1;
        let excel_col = u16::try_from(col)
            .map_err(|_| ExcelloError::Export(format!("Column {} out of range", col)))?;

        let written = match &cell.value {
            CellValue::Text(s) if row == 1 => {
                worksheet.write_string_with_format(excel_row, excel_col, s, header_format)
            }
            CellValue::Text(s) | CellValue::Error(s) => {
                worksheet.write_string(excel_row, excel_col, s)
            }
            CellValue::Number(n) => worksheet.write_number(excel_row, excel_col, *n),
            CellValue::Bool(b) => worksheet.write_boolean(excel_row, excel_col, *b),
        };
        written.map_err(|e| ExcelloError::Export(format!("Failed to write cell: {}", e)))?;
    }
    Ok(())
}
