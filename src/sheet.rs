//! Sheet accessor: positional labels, cell addresses and header scanning

use crate::config::ScanLimits;
use crate::error::{ExcelloError, ExcelloResult};
use crate::types::{Column, Sheet};
use regex::Regex;
use tracing::debug;

/// Convert a 0-based column index to its spreadsheet label (0→A, 25→Z, 26→AA)
pub fn column_label(index: usize) -> String {
    let mut result = String::new();
    let mut num = index;

    loop {
        let remainder = num % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if num < 26 {
            break;
        }
        num = num / 26 - 1;
    }

    result
}

/// Inverse of [`column_label`]. Lower-case letters are accepted.
pub fn column_index(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }
    let mut index: usize = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// Parse an `A1`-style address into `(column index, 1-based row)`
pub fn parse_address(address: &str) -> ExcelloResult<(usize, u32)> {
    let pattern = Regex::new(r"^\$?([A-Za-z]{1,3})\$?([1-9][0-9]*)$")
        .map_err(|e| ExcelloError::InvalidAddress(format!("Regex error: {}", e)))?;

    let captures = pattern
        .captures(address.trim())
        .ok_or_else(|| ExcelloError::InvalidAddress(address.to_string()))?;

    let column = column_index(&captures[1])
        .ok_or_else(|| ExcelloError::InvalidAddress(address.to_string()))?;
    let row = captures[2]
        .parse::<u32>()
        .map_err(|_| ExcelloError::InvalidAddress(address.to_string()))?;

    Ok((column, row))
}

/// Derive the ordered column list from the header row.
///
/// The header row is `header_offset + 1`. Scanning stops at the first column
/// with no cell, so a blank header cell hides every column to its right.
pub fn derive_columns(sheet: &Sheet, header_offset: u32, limits: &ScanLimits) -> Vec<Column> {
    let header_row = header_offset.saturating_add(1);
    let mut columns = Vec::new();

    for index in 0..limits.max_columns {
        let Some(cell) = sheet.get(index, header_row) else {
            break;
        };
        let label = column_label(index);
        let name = if cell.value.is_falsy() {
            label.clone()
        } else {
            cell.value.raw_text()
        };
        columns.push(Column { index, label, name });
    }

    debug!(
        header_row,
        count = columns.len(),
        "derived columns from header row"
    );
    columns
}

/// Resolve a user-supplied selector to a column.
///
/// Tries the positional label first, then the exact header name, then the
/// header name ignoring case.
pub fn find_column<'a>(columns: &'a [Column], selector: &str) -> Option<&'a Column> {
    let selector = selector.trim();
    columns
        .iter()
        .find(|c| c.label == selector.to_ascii_uppercase() && column_index(selector).is_some())
        .or_else(|| columns.iter().find(|c| c.name == selector))
        .or_else(|| {
            let lowered = selector.to_lowercase();
            columns.iter().find(|c| c.name.to_lowercase() == lowered)
        })
}

/// Pick a default index column: the first whose name contains "id", else the first
pub fn suggest_index(columns: &[Column]) -> Option<&Column> {
    columns
        .iter()
        .find(|c| c.name.to_lowercase().contains("id"))
        .or_else(|| columns.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    #[test]
    fn test_column_label() {
        assert_eq!(column_label(0), "A");
        assert_eq!(column_label(1), "B");
        assert_eq!(column_label(25), "Z");
        assert_eq!(column_label(26), "AA");
        assert_eq!(column_label(27), "AB");
        assert_eq!(column_label(51), "AZ");
        assert_eq!(column_label(52), "BA");
        assert_eq!(column_label(702), "AAA");
    }

    #[test]
    fn test_column_index_inverts_label() {
        for i in [0, 1, 25, 26, 51, 52, 701, 702, 16_383] {
            assert_eq!(column_index(&column_label(i)), Some(i));
        }
        assert_eq!(column_index("ab"), Some(27));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("A1").unwrap(), (0, 1));
        assert_eq!(parse_address("B12").unwrap(), (1, 12));
        assert_eq!(parse_address("$AA$3").unwrap(), (26, 3));
        assert!(parse_address("A0").is_err());
        assert!(parse_address("12").is_err());
        assert!(parse_address("ABCD1").is_err());
    }

    #[test]
    fn test_derive_columns_stops_at_gap() {
        let mut sheet = Sheet::new();
        sheet.set(0, 1, Cell::text("ID"));
        sheet.set(1, 1, Cell::text("Name"));
        sheet.set(3, 1, Cell::text("Hidden"));

        let columns = derive_columns(&sheet, 0, &ScanLimits::default());
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0], Column::new(0, "ID"));
        assert_eq!(columns[1], Column::new(1, "Name"));
    }

    #[test]
    fn test_derive_columns_with_offset_and_blank_names() {
        let mut sheet = Sheet::new();
        sheet.set(0, 1, Cell::text("Report title"));
        sheet.set(0, 3, Cell::text("Code"));
        sheet.set(1, 3, Cell::text(""));
        sheet.set(2, 3, Cell::number(2024.0));

        let columns = derive_columns(&sheet, 2, &ScanLimits::default());
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Code", "B", "2024"]);
    }

    #[test]
    fn test_derive_columns_respects_limit() {
        let sheet = Sheet::from_rows(vec![vec!["a", "b", "c", "d"]]);
        let limits = ScanLimits {
            max_rows: 10,
            max_columns: 2,
        };
        assert_eq!(derive_columns(&sheet, 0, &limits).len(), 2);
    }

    #[test]
    fn test_derive_columns_empty_sheet() {
        assert!(derive_columns(&Sheet::new(), 0, &ScanLimits::default()).is_empty());
    }

    #[test]
    fn test_find_column() {
        let columns = vec![
            Column::new(0, "Customer ID"),
            Column::new(1, "Name"),
            Column::new(2, "B"),
        ];
        assert_eq!(find_column(&columns, "B").unwrap().label, "B");
        assert_eq!(find_column(&columns, "b").unwrap().label, "B");
        assert_eq!(find_column(&columns, "Name").unwrap().label, "B");
        assert_eq!(find_column(&columns, "customer id").unwrap().label, "A");
        assert!(find_column(&columns, "Missing").is_none());
    }

    #[test]
    fn test_suggest_index() {
        let columns = vec![Column::new(0, "Name"), Column::new(1, "Invoice Id")];
        assert_eq!(suggest_index(&columns).unwrap().label, "B");

        let no_id = vec![Column::new(0, "Name"), Column::new(1, "City")];
        assert_eq!(suggest_index(&no_id).unwrap().label, "A");

        assert!(suggest_index(&[]).is_none());
    }
}
