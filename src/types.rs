use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::sheet::{column_index, column_label, parse_address};

//==============================================================================
// Columns
//==============================================================================

/// A column derived from a sheet's header row.
///
/// Identity is the positional `label` (A, B, ... AA), never the header text:
/// header names may repeat or be blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub index: usize,
    pub label: String,
    pub name: String,
}

impl Column {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            label: column_label(index),
            name: name.into(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.label, self.name)
    }
}

//==============================================================================
// Cells
//==============================================================================

/// Raw value carried by a present cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Spreadsheet error literal such as `#N/A`
    Error(String),
}

impl CellValue {
    /// String form of the raw value (`1.0` renders as `1`, booleans lower-case)
    pub fn raw_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Error(e) => e.clone(),
        }
    }

    /// Empty text, zero, NaN and `false`
    pub fn is_falsy(&self) -> bool {
        match self {
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(n) => *n == 0.0 || n.is_nan(),
            CellValue::Bool(b) => !b,
            CellValue::Error(_) => false,
        }
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.is_empty())
    }
}

/// A present cell: raw value plus the optional formatted/display string
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub formatted: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            formatted: None,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::new(CellValue::Text(s.into()))
    }

    pub fn number(n: f64) -> Self {
        Self::new(CellValue::Number(n))
    }

    pub fn with_formatted(mut self, formatted: impl Into<String>) -> Self {
        self.formatted = Some(formatted.into());
        self
    }

    /// Formatted text when present and non-empty, otherwise the raw value
    pub fn display_text(&self) -> String {
        match &self.formatted {
            Some(w) if !w.is_empty() => w.clone(),
            _ => self.value.raw_text(),
        }
    }
}

//==============================================================================
// Sheets and workbooks
//==============================================================================

/// Sparse cell grid.
///
/// Keys are `(row, column)` with 1-based rows and 0-based column indices, so
/// iteration is row-major. Absence of a key is a valid state and marks the end
/// of header rows and data blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    cells: BTreeMap<(u32, usize), Cell>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sheet from an array of text rows; the first row lands on row 1.
    /// Empty strings are written as present (empty) cells.
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sheet = Self::new();
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                sheet.set(c, r as u32 + 1, Cell::text(value));
            }
        }
        sheet
    }

    pub fn set(&mut self, column: usize, row: u32, cell: Cell) {
        self.cells.insert((row, column), cell);
    }

    pub fn get(&self, column: usize, row: u32) -> Option<&Cell> {
        self.cells.get(&(row, column))
    }

    /// Look a cell up by positional label and 1-based row number
    pub fn get_labeled(&self, label: &str, row: u32) -> Option<&Cell> {
        column_index(label).and_then(|c| self.get(c, row))
    }

    /// Look a cell up by `A1`-style address. Malformed addresses read as absent.
    pub fn get_address(&self, address: &str) -> Option<&Cell> {
        parse_address(address)
            .ok()
            .and_then(|(c, r)| self.get(c, r))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Present cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (u32, usize, &Cell)> {
        self.cells.iter().map(|(&(r, c), cell)| (r, c, cell))
    }
}

/// Decoded workbook: ordered sheet names plus the sheets themselves
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheet_names: Vec<String>,
    sheets: HashMap<String, Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// A workbook holding exactly one sheet
    pub fn single(name: impl Into<String>, sheet: Sheet) -> Self {
        let mut workbook = Self::new();
        workbook.add_sheet(name, sheet);
        workbook
    }

    /// Append a sheet; a repeated name replaces the earlier sheet in place.
    pub fn add_sheet(&mut self, name: impl Into<String>, sheet: Sheet) {
        let name = name.into();
        if !self.sheets.contains_key(&name) {
            self.sheet_names.push(name.clone());
        }
        self.sheets.insert(name, sheet);
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn first_sheet_name(&self) -> Option<&str> {
        self.sheet_names.first().map(String::as_str)
    }
}

//==============================================================================
// Roles
//==============================================================================

/// Which side of the reconciliation a dataset plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The authoritative dataset being checked against
    Master,
    /// The dataset reconciled against the master
    Input,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => write!(f, "master"),
            Role::Input => write!(f, "input"),
        }
    }
}

/// Which result set is promoted into a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromoteReason {
    Matched,
    Missing,
}

impl PromoteReason {
    /// Name of the single sheet in the promoted workbook
    pub fn sheet_name(self) -> &'static str {
        match self {
            PromoteReason::Matched => "Previously Matched",
            PromoteReason::Missing => "Previously Missing",
        }
    }
}
