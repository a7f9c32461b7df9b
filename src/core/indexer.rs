//! Row indexer: scans a sheet's data block into an index-value keyed map

use crate::config::{ScanLimits, SentinelMode, DEFAULT_SENTINEL};
use crate::types::{Cell, Column, Sheet};
use std::collections::HashMap;
use tracing::{debug, warn};

/// How index cells turn into lookup keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPolicy {
    /// Key used for index cells that read as "no value"
    pub sentinel: String,
    pub mode: SentinelMode,
}

impl Default for IndexPolicy {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            mode: SentinelMode::default(),
        }
    }
}

impl IndexPolicy {
    /// Lookup key for an index cell
    pub fn index_value(&self, cell: Option<&Cell>) -> String {
        let Some(cell) = cell else {
            return self.sentinel.clone();
        };
        let collapses = match self.mode {
            SentinelMode::Falsy => cell.value.is_falsy(),
            SentinelMode::EmptyOnly => cell.value.is_empty_text(),
        };
        if collapses {
            self.sentinel.clone()
        } else {
            cell.value.raw_text()
        }
    }
}

/// One data row as seen through the index column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedRow {
    pub row_number: u32,
    pub index_value: String,
    /// Projected values keyed by column label; every selected column has an entry
    pub values: HashMap<String, String>,
}

impl IndexedRow {
    /// Projected value for a column, `""` if it was not selected
    pub fn value(&self, label: &str) -> &str {
        self.values.get(label).map(String::as_str).unwrap_or("")
    }
}

/// Index-value keyed rows in first-seen order.
///
/// Inserting a key that already exists replaces the stored row but keeps the
/// key's original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowIndex {
    rows: Vec<IndexedRow>,
    positions: HashMap<String, usize>,
    scanned: usize,
}

impl RowIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, row: IndexedRow) {
        self.scanned += 1;
        match self.positions.get(&row.index_value) {
            Some(&pos) => self.rows[pos] = row,
            None => {
                self.positions.insert(row.index_value.clone(), self.rows.len());
                self.rows.push(row);
            }
        }
    }

    pub fn get(&self, index_value: &str) -> Option<&IndexedRow> {
        self.positions.get(index_value).map(|&pos| &self.rows[pos])
    }

    pub fn contains_key(&self, index_value: &str) -> bool {
        self.positions.contains_key(index_value)
    }

    /// Distinct keys in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.index_value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedRow> {
        self.rows.iter()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of data rows scanned, duplicates included
    pub fn row_count(&self) -> usize {
        self.scanned
    }
}

/// Index the contiguous data block below the header row.
///
/// Scanning starts at row `header_offset + 2` and stops at the first row whose
/// index cell is absent, or once `limits.max_rows` rows have been read.
pub fn index_rows(
    sheet: &Sheet,
    index_column: &Column,
    header_offset: u32,
    selected: &[Column],
    policy: &IndexPolicy,
    limits: &ScanLimits,
) -> RowIndex {
    let first_row = header_offset.saturating_add(2);
    let mut index = RowIndex::new();
    let mut row = first_row;

    loop {
        if index.row_count() >= limits.max_rows as usize {
            if sheet.get(index_column.index, row).is_some() {
                warn!(
                    column = %index_column.label,
                    max_rows = limits.max_rows,
                    "data block truncated at scan limit"
                );
            }
            break;
        }
        let Some(index_cell) = sheet.get(index_column.index, row) else {
            break;
        };

        let values = selected
            .iter()
            .map(|column| {
                let value = sheet
                    .get(column.index, row)
                    .map(Cell::display_text)
                    .unwrap_or_default();
                (column.label.clone(), value)
            })
            .collect();

        index.insert(IndexedRow {
            row_number: row,
            index_value: policy.index_value(Some(index_cell)),
            values,
        });

        match row.checked_add(1) {
            Some(next) => row = next,
            None => break,
        }
    }

    debug!(
        column = %index_column.label,
        first_row,
        rows = index.row_count(),
        keys = index.len(),
        "indexed data block"
    );
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn sheet() -> Sheet {
        Sheet::from_rows(vec![
            vec!["ID", "Name", "City"],
            vec!["1", "Alice", "Oslo"],
            vec!["2", "Bob", "Rome"],
            vec!["3", "Cara", "Lima"],
        ])
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new(0, "ID"),
            Column::new(1, "Name"),
            Column::new(2, "City"),
        ]
    }

    #[test]
    fn test_index_rows_basic() {
        let cols = columns();
        let index = index_rows(
            &sheet(),
            &cols[0],
            0,
            &cols[1..],
            &IndexPolicy::default(),
            &ScanLimits::default(),
        );

        assert_eq!(index.len(), 3);
        assert_eq!(index.row_count(), 3);
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["1", "2", "3"]);

        let bob = index.get("2").unwrap();
        assert_eq!(bob.row_number, 3);
        assert_eq!(bob.value("B"), "Bob");
        assert_eq!(bob.value("C"), "Rome");
    }

    #[test]
    fn test_scan_stops_at_first_absent_index_cell() {
        let mut sheet = sheet();
        // Row 6 has an index but row 5 is a gap: row 6 is outside the block
        sheet.set(0, 6, Cell::text("9"));

        let cols = columns();
        let index = index_rows(
            &sheet,
            &cols[0],
            0,
            &[],
            &IndexPolicy::default(),
            &ScanLimits::default(),
        );
        assert_eq!(index.row_count(), 3);
        assert!(!index.contains_key("9"));
    }

    #[test]
    fn test_header_offset_shifts_scan() {
        let sheet = Sheet::from_rows(vec![
            vec!["Quarterly report", "", ""],
            vec!["ID", "Name", "City"],
            vec!["7", "Dan", "Kyiv"],
        ]);
        let cols = columns();
        let index = index_rows(
            &sheet,
            &cols[0],
            1,
            &cols[1..2],
            &IndexPolicy::default(),
            &ScanLimits::default(),
        );
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["7"]);
        assert_eq!(index.get("7").unwrap().row_number, 3);
    }

    #[test]
    fn test_duplicate_keys_last_write_wins_first_position() {
        let sheet = Sheet::from_rows(vec![
            vec!["ID", "Name"],
            vec!["1", "first"],
            vec!["2", "other"],
            vec!["1", "second"],
        ]);
        let cols = columns();
        let index = index_rows(
            &sheet,
            &cols[0],
            0,
            &cols[1..2],
            &IndexPolicy::default(),
            &ScanLimits::default(),
        );

        assert_eq!(index.len(), 2);
        assert_eq!(index.row_count(), 3);
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(index.get("1").unwrap().value("B"), "second");
        assert_eq!(index.get("1").unwrap().row_number, 4);
    }

    #[test]
    fn test_absent_selected_cell_writes_empty_string() {
        let mut sheet = Sheet::new();
        sheet.set(0, 1, Cell::text("ID"));
        sheet.set(1, 1, Cell::text("Name"));
        sheet.set(0, 2, Cell::text("1"));

        let cols = columns();
        let index = index_rows(
            &sheet,
            &cols[0],
            0,
            &cols[1..2],
            &IndexPolicy::default(),
            &ScanLimits::default(),
        );
        let row = index.get("1").unwrap();
        assert_eq!(row.values.get("B").map(String::as_str), Some(""));
    }

    #[test]
    fn test_falsy_policy_collapses_zero_and_empty() {
        let policy = IndexPolicy::default();
        assert_eq!(policy.index_value(None), "NOT FOUND");
        assert_eq!(policy.index_value(Some(&Cell::text(""))), "NOT FOUND");
        assert_eq!(policy.index_value(Some(&Cell::number(0.0))), "NOT FOUND");
        assert_eq!(
            policy.index_value(Some(&Cell::new(CellValue::Bool(false)))),
            "NOT FOUND"
        );
        assert_eq!(policy.index_value(Some(&Cell::number(42.0))), "42");
    }

    #[test]
    fn test_empty_only_policy_keeps_zero() {
        let policy = IndexPolicy {
            sentinel: "-".to_string(),
            mode: SentinelMode::EmptyOnly,
        };
        assert_eq!(policy.index_value(Some(&Cell::number(0.0))), "0");
        assert_eq!(policy.index_value(Some(&Cell::text(""))), "-");
        assert_eq!(policy.index_value(None), "-");
    }

    #[test]
    fn test_index_value_uses_raw_not_formatted() {
        let policy = IndexPolicy::default();
        let cell = Cell::number(1001.0).with_formatted("1,001");
        assert_eq!(policy.index_value(Some(&cell)), "1001");
    }

    #[test]
    fn test_projected_value_uses_formatted() {
        let mut sheet = Sheet::new();
        sheet.set(0, 1, Cell::text("ID"));
        sheet.set(1, 1, Cell::text("Share"));
        sheet.set(0, 2, Cell::text("a"));
        sheet.set(1, 2, Cell::number(0.25).with_formatted("25%"));

        let cols = columns();
        let index = index_rows(
            &sheet,
            &cols[0],
            0,
            &cols[1..2],
            &IndexPolicy::default(),
            &ScanLimits::default(),
        );
        assert_eq!(index.get("a").unwrap().value("B"), "25%");
    }

    #[test]
    fn test_row_limit_bounds_scan() {
        let rows: Vec<Vec<String>> = (0..50).map(|i| vec![i.to_string()]).collect();
        let sheet = Sheet::from_rows(rows);
        let limits = ScanLimits {
            max_rows: 10,
            max_columns: 1,
        };
        let cols = columns();
        let index = index_rows(&sheet, &cols[0], 0, &[], &IndexPolicy::default(), &limits);
        assert_eq!(index.row_count(), 10);
        assert_eq!(index.keys().next(), Some("1"));
    }

    #[test]
    fn test_empty_sheet_yields_empty_index() {
        let cols = columns();
        let index = index_rows(
            &Sheet::new(),
            &cols[0],
            0,
            &cols,
            &IndexPolicy::default(),
            &ScanLimits::default(),
        );
        assert!(index.is_empty());
        assert_eq!(index.row_count(), 0);
    }
}
