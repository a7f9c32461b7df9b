//! Spreadsheet file boundary
//!
//! - Import: .xlsx / .ods / .csv → [`crate::types::Workbook`] (calamine, csv)
//! - Export: matched / missing row sets → .xlsx (rust_xlsxwriter)

mod exporter;
mod importer;

pub use exporter::{
    export_file_name, to_exportable_sheet, ExportSelection, WorkbookExporter,
    EXPORT_FILE_PREFIX,
};
pub use importer::{
    sheet_from_csv, sheet_from_range, WorkbookImporter, CSV_SHEET_NAME, SUPPORTED_EXTENSIONS,
};
