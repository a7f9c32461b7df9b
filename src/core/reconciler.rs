//! Reconciler: classify input rows as matched or missing against the master

use crate::core::indexer::RowIndex;
use crate::types::Column;
use serde::Serialize;
use tracing::debug;

/// Output of a reconciliation run.
///
/// `columns` is the header for both row sets: the input index column, then
/// the input-selected columns, then the master-selected columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub columns: Vec<String>,
    pub matched: Vec<Vec<String>>,
    pub missing: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub matched: usize,
    pub missing: usize,
    pub total: usize,
}

impl Reconciliation {
    pub fn summary(&self) -> ReconciliationSummary {
        ReconciliationSummary {
            matched: self.matched.len(),
            missing: self.missing.len(),
            total: self.matched.len() + self.missing.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Join the input index against the master index.
///
/// Rows come out in input order. Every input key lands in exactly one of the
/// two sets; missing rows have blank master columns.
pub fn reconcile(
    input_index: &Column,
    master_map: &RowIndex,
    input_map: &RowIndex,
    input_selected: &[Column],
    master_selected: &[Column],
) -> Reconciliation {
    let columns: Vec<String> = std::iter::once(input_index)
        .chain(input_selected)
        .chain(master_selected)
        .map(|c| c.name.clone())
        .collect();

    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for input_row in input_map.iter() {
        let mut row = Vec::with_capacity(columns.len());
        row.push(input_row.index_value.clone());
        row.extend(
            input_selected
                .iter()
                .map(|c| input_row.value(&c.label).to_string()),
        );

        match master_map.get(&input_row.index_value) {
            Some(master_row) => {
                row.extend(
                    master_selected
                        .iter()
                        .map(|c| master_row.value(&c.label).to_string()),
                );
                matched.push(row);
            }
            None => {
                row.extend(master_selected.iter().map(|_| String::new()));
                missing.push(row);
            }
        }
    }

    debug!(
        matched = matched.len(),
        missing = missing.len(),
        "reconciled input against master"
    );

    Reconciliation {
        columns,
        matched,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanLimits;
    use crate::core::indexer::{index_rows, IndexPolicy};
    use crate::types::Sheet;
    use pretty_assertions::assert_eq;

    fn index(sheet: &Sheet, index_col: &Column, selected: &[Column]) -> RowIndex {
        index_rows(
            sheet,
            index_col,
            0,
            selected,
            &IndexPolicy::default(),
            &ScanLimits::default(),
        )
    }

    #[test]
    fn test_reconcile_basic_scenario() {
        let master = Sheet::from_rows(vec![vec!["ID", "Name"], vec!["1", "A"], vec!["2", "B"]]);
        let input = Sheet::from_rows(vec![vec!["ID", "City"], vec!["1", "X"], vec!["3", "Y"]]);

        let m_id = Column::new(0, "ID");
        let m_name = Column::new(1, "Name");
        let i_id = Column::new(0, "ID");
        let i_city = Column::new(1, "City");

        let master_map = index(&master, &m_id, std::slice::from_ref(&m_name));
        let input_map = index(&input, &i_id, std::slice::from_ref(&i_city));

        let result = reconcile(&i_id, &master_map, &input_map, &[i_city], &[m_name]);

        assert_eq!(result.columns, vec!["ID", "City", "Name"]);
        assert_eq!(result.matched, vec![vec!["1", "X", "A"]]);
        assert_eq!(result.missing, vec![vec!["3", "Y", ""]]);
        assert_eq!(
            result.summary(),
            ReconciliationSummary {
                matched: 1,
                missing: 1,
                total: 2
            }
        );
    }

    #[test]
    fn test_output_order_follows_input_rows() {
        let master = Sheet::from_rows(vec![vec!["ID"], vec!["c"], vec!["a"]]);
        let input = Sheet::from_rows(vec![
            vec!["ID"],
            vec!["a"],
            vec!["z"],
            vec!["c"],
            vec!["y"],
        ]);
        let id = Column::new(0, "ID");
        let result = reconcile(
            &id,
            &index(&master, &id, &[]),
            &index(&input, &id, &[]),
            &[],
            &[],
        );
        assert_eq!(result.matched, vec![vec!["a"], vec!["c"]]);
        assert_eq!(result.missing, vec![vec!["z"], vec!["y"]]);
    }

    #[test]
    fn test_sentinel_collision_matches_blank_master_row() {
        let master = Sheet::from_rows(vec![vec!["ID", "Note"], vec!["", "blank id"]]);
        let input = Sheet::from_rows(vec![vec!["ID"], vec![""], vec!["5"]]);
        let id = Column::new(0, "ID");
        let note = Column::new(1, "Note");

        let result = reconcile(
            &id,
            &index(&master, &id, std::slice::from_ref(&note)),
            &index(&input, &id, &[]),
            &[],
            &[note],
        );
        assert_eq!(result.matched, vec![vec!["NOT FOUND", "blank id"]]);
        assert_eq!(result.missing, vec![vec!["5", ""]]);
    }

    #[test]
    fn test_sentinel_row_missing_when_master_has_no_blank() {
        let master = Sheet::from_rows(vec![vec!["ID"], vec!["1"]]);
        let input = Sheet::from_rows(vec![vec!["ID"], vec![""]]);
        let id = Column::new(0, "ID");
        let result = reconcile(
            &id,
            &index(&master, &id, &[]),
            &index(&input, &id, &[]),
            &[],
            &[],
        );
        assert!(result.matched.is_empty());
        assert_eq!(result.missing, vec![vec!["NOT FOUND"]]);
    }

    #[test]
    fn test_empty_input_yields_header_only() {
        let id = Column::new(0, "Key");
        let name = Column::new(1, "Name");
        let result = reconcile(&id, &RowIndex::new(), &RowIndex::new(), &[], &[name]);
        assert_eq!(result.columns, vec!["Key", "Name"]);
        assert!(result.matched.is_empty());
        assert!(result.missing.is_empty());
        assert!(!result.is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let master = Sheet::from_rows(vec![vec!["ID", "V"], vec!["1", "x"], vec!["2", "y"]]);
        let input = Sheet::from_rows(vec![vec!["ID", "W"], vec!["2", "p"], vec!["4", "q"]]);
        let id = Column::new(0, "ID");
        let v = Column::new(1, "V");
        let w = Column::new(1, "W");
        let master_map = index(&master, &id, std::slice::from_ref(&v));
        let input_map = index(&input, &id, std::slice::from_ref(&w));

        let first = reconcile(&id, &master_map, &input_map, &[w.clone()], &[v.clone()]);
        let second = reconcile(&id, &master_map, &input_map, &[w], &[v]);
        assert_eq!(first, second);
    }
}
