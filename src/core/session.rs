//! Session: owns both datasets' selection state and memoizes everything
//! derived from it.
//!
//! All mutation goes through `Session` setters, which replace values and bump
//! revision numbers. Derived values (columns, row indexes, the
//! reconciliation) are cached against the revisions they were computed from
//! and recomputed only when one of those revisions moves.

use crate::config::Settings;
use crate::core::indexer::{index_rows, RowIndex};
use crate::core::reconciler::{reconcile, Reconciliation};
use crate::error::{ExcelloError, ExcelloResult};
use crate::excel::{to_exportable_sheet, WorkbookImporter};
use crate::sheet::{derive_columns, find_column, suggest_index};
use crate::types::{Column, PromoteReason, Role, Sheet, Workbook};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Selection state for one side of the reconciliation
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    path: Option<PathBuf>,
    workbook: Option<Workbook>,
    sheet_name: Option<String>,
    header_offset: u32,
    index: Option<Column>,
    selected: Vec<Column>,
    /// Bumped when workbook, sheet or header offset change
    source_revision: u64,
    /// Bumped when the index column or selected columns change
    selection_revision: u64,
}

impl Dataset {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn workbook(&self) -> Option<&Workbook> {
        self.workbook.as_ref()
    }

    pub fn sheet_names(&self) -> &[String] {
        self.workbook
            .as_ref()
            .map(|w| w.sheet_names.as_slice())
            .unwrap_or(&[])
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }

    /// The active sheet, if a workbook is loaded and the chosen sheet exists
    pub fn sheet(&self) -> Option<&Sheet> {
        let workbook = self.workbook.as_ref()?;
        workbook.sheet(self.sheet_name.as_deref()?)
    }

    pub fn header_offset(&self) -> u32 {
        self.header_offset
    }

    pub fn index(&self) -> Option<&Column> {
        self.index.as_ref()
    }

    /// Selected projection columns in selection order
    pub fn selected(&self) -> &[Column] {
        &self.selected
    }
}

/// Last computed value and the key it was computed for
#[derive(Debug)]
struct Memo<K, V> {
    key: Option<K>,
    value: Arc<V>,
    computed: usize,
}

impl<K: PartialEq, V: Default> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            key: None,
            value: Arc::new(V::default()),
            computed: 0,
        }
    }
}

impl<K: PartialEq, V> Memo<K, V> {
    fn get_or_compute(&mut self, key: K, compute: impl FnOnce() -> V) -> Arc<V> {
        if self.key.as_ref() != Some(&key) {
            self.value = Arc::new(compute());
            self.key = Some(key);
            self.computed += 1;
        }
        Arc::clone(&self.value)
    }
}

type SourceKey = (u64, u64);
type IndexKey = (u64, u64, u64);

#[derive(Debug, Default)]
struct Derived {
    master_columns: Memo<SourceKey, Vec<Column>>,
    input_columns: Memo<SourceKey, Vec<Column>>,
    master_index: Memo<IndexKey, RowIndex>,
    input_index: Memo<IndexKey, RowIndex>,
    reconciliation: Memo<(IndexKey, IndexKey), Reconciliation>,
}

/// Orchestrator for one reconciliation session
#[derive(Debug)]
pub struct Session {
    master: Dataset,
    input: Dataset,
    settings: Settings,
    /// Revision source shared by every dataset, so a replaced dataset never
    /// reuses a number an older one had
    revision: u64,
    settings_revision: u64,
    derived: Derived,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            master: Dataset::default(),
            input: Dataset::default(),
            settings,
            revision: 0,
            settings_revision: 0,
            derived: Derived::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.settings_revision = self.next_revision();
        self.revalidate(Role::Master);
        self.revalidate(Role::Input);
    }

    pub fn dataset(&self, role: Role) -> &Dataset {
        match role {
            Role::Master => &self.master,
            Role::Input => &self.input,
        }
    }

    /// How many times any derived value has been computed
    pub fn computation_count(&self) -> usize {
        let d = &self.derived;
        d.master_columns.computed
            + d.input_columns.computed
            + d.master_index.computed
            + d.input_index.computed
            + d.reconciliation.computed
    }

    //--------------------------------------------------------------------------
    // Setters
    //--------------------------------------------------------------------------

    /// Decode a file and make it the role's workbook
    pub fn load_workbook(&mut self, role: Role, path: &Path) -> ExcelloResult<()> {
        let workbook = WorkbookImporter::new(path).import()?;
        self.set_workbook(role, workbook);
        self.dataset_mut(role).path = Some(path.to_path_buf());
        Ok(())
    }

    /// Replace the role's workbook and select its first sheet
    pub fn set_workbook(&mut self, role: Role, workbook: Workbook) {
        let revision = self.next_revision();
        let dataset = self.dataset_mut(role);
        dataset.path = None;
        dataset.sheet_name = workbook.first_sheet_name().map(str::to_string);
        dataset.workbook = Some(workbook);
        dataset.source_revision = revision;
        self.revalidate(role);
    }

    pub fn select_sheet(&mut self, role: Role, sheet_name: &str) -> ExcelloResult<()> {
        let exists = self
            .dataset(role)
            .workbook()
            .is_some_and(|w| w.sheet(sheet_name).is_some());
        if !exists {
            return Err(ExcelloError::SheetNotFound(format!(
                "'{}' in {} workbook",
                sheet_name, role
            )));
        }

        let revision = self.next_revision();
        let dataset = self.dataset_mut(role);
        if dataset.sheet_name.as_deref() == Some(sheet_name) {
            return Ok(());
        }
        dataset.sheet_name = Some(sheet_name.to_string());
        dataset.source_revision = revision;
        self.revalidate(role);
        Ok(())
    }

    /// Number of leading rows above the header row
    pub fn set_header_offset(&mut self, role: Role, header_offset: u32) {
        let revision = self.next_revision();
        let dataset = self.dataset_mut(role);
        if dataset.header_offset == header_offset {
            return;
        }
        dataset.header_offset = header_offset;
        dataset.source_revision = revision;
        self.revalidate(role);
    }

    /// Choose the index column by label or header name
    pub fn set_index(&mut self, role: Role, selector: &str) -> ExcelloResult<Column> {
        let column = self.resolve(role, selector)?;
        let revision = self.next_revision();
        let dataset = self.dataset_mut(role);
        if role == Role::Input {
            // The input index is always the first output column
            dataset.selected.retain(|c| c.label != column.label);
        }
        dataset.index = Some(column.clone());
        dataset.selection_revision = revision;
        Ok(column)
    }

    /// Add a projection column; returns whether the selection changed.
    ///
    /// Already-selected columns and the input index column are left alone.
    pub fn select_column(&mut self, role: Role, selector: &str) -> ExcelloResult<bool> {
        let column = self.resolve(role, selector)?;
        Ok(self.push_selected(role, column))
    }

    /// Remove a projection column; returns whether the selection changed
    pub fn deselect_column(&mut self, role: Role, selector: &str) -> ExcelloResult<bool> {
        let column = self.resolve(role, selector)?;
        let revision = self.next_revision();
        let dataset = self.dataset_mut(role);
        let before = dataset.selected.len();
        dataset.selected.retain(|c| c.label != column.label);
        let changed = dataset.selected.len() != before;
        if changed {
            dataset.selection_revision = revision;
        }
        Ok(changed)
    }

    /// Select every column in sheet order, skipping the input index
    pub fn select_all_columns(&mut self, role: Role) {
        let columns = self.columns(role);
        for column in columns.iter() {
            self.push_selected(role, column.clone());
        }
    }

    pub fn deselect_all_columns(&mut self, role: Role) {
        let revision = self.next_revision();
        let dataset = self.dataset_mut(role);
        if !dataset.selected.is_empty() {
            dataset.selected.clear();
            dataset.selection_revision = revision;
        }
    }

    /// Replace the role's dataset with the matched or missing rows.
    ///
    /// The new workbook holds one sheet named after the reason, with its
    /// header on row 1. Column A carries the previous input index values and
    /// becomes the role's index. That role's selected columns are cleared; the
    /// other role keeps its state.
    ///
    /// Fails without touching either dataset until both index columns are set.
    pub fn promote(&mut self, reason: PromoteReason, role: Role) -> ExcelloResult<()> {
        let result = self.reconciliation();
        if result.is_empty() {
            return Err(ExcelloError::Promote(format!(
                "no reconciliation to promote into the {} dataset (choose both index columns first)",
                role
            )));
        }
        let rows = match reason {
            PromoteReason::Matched => &result.matched,
            PromoteReason::Missing => &result.missing,
        };
        let sheet = to_exportable_sheet(&result.columns, rows);
        let rows_promoted = rows.len();

        let revision = self.next_revision();
        *self.dataset_mut(role) = Dataset {
            path: None,
            workbook: Some(Workbook::single(reason.sheet_name(), sheet)),
            sheet_name: Some(reason.sheet_name().to_string()),
            header_offset: 0,
            index: None,
            selected: Vec::new(),
            source_revision: revision,
            selection_revision: revision,
        };
        let index = self.columns(role).first().cloned();
        self.dataset_mut(role).index = index;
        self.revalidate(role);

        info!(?reason, %role, rows = rows_promoted, "promoted result set");
        Ok(())
    }

    //--------------------------------------------------------------------------
    // Derived values
    //--------------------------------------------------------------------------

    /// Columns of the active sheet's header row; empty without a sheet
    pub fn columns(&mut self, role: Role) -> Arc<Vec<Column>> {
        let limits = self.settings.limits;
        let (dataset, memo) = match role {
            Role::Master => (&self.master, &mut self.derived.master_columns),
            Role::Input => (&self.input, &mut self.derived.input_columns),
        };
        let key = (dataset.source_revision, self.settings_revision);
        memo.get_or_compute(key, || {
            dataset
                .sheet()
                .map(|sheet| derive_columns(sheet, dataset.header_offset, &limits))
                .unwrap_or_default()
        })
    }

    /// Row index of the active sheet; empty without a sheet or index column
    pub fn row_index(&mut self, role: Role) -> Arc<RowIndex> {
        let limits = self.settings.limits;
        let policy = self.settings.index_policy();
        let (dataset, memo) = match role {
            Role::Master => (&self.master, &mut self.derived.master_index),
            Role::Input => (&self.input, &mut self.derived.input_index),
        };
        let key = (
            dataset.source_revision,
            dataset.selection_revision,
            self.settings_revision,
        );
        memo.get_or_compute(key, || match (dataset.sheet(), dataset.index.as_ref()) {
            (Some(sheet), Some(index)) => index_rows(
                sheet,
                index,
                dataset.header_offset,
                &dataset.selected,
                &policy,
                &limits,
            ),
            _ => RowIndex::new(),
        })
    }

    /// Matched and missing rows; empty until both index columns are chosen
    pub fn reconciliation(&mut self) -> Arc<Reconciliation> {
        let master_map = self.row_index(Role::Master);
        let input_map = self.row_index(Role::Input);
        let key = (
            (
                self.master.source_revision,
                self.master.selection_revision,
                self.settings_revision,
            ),
            (
                self.input.source_revision,
                self.input.selection_revision,
                self.settings_revision,
            ),
        );
        let (master, input) = (&self.master, &self.input);
        self.derived
            .reconciliation
            .get_or_compute(key, || match (input.index.as_ref(), master.index.as_ref()) {
                (Some(input_index), Some(_)) => reconcile(
                    input_index,
                    &master_map,
                    &input_map,
                    &input.selected,
                    &master.selected,
                ),
                _ => Reconciliation::default(),
            })
    }

    //--------------------------------------------------------------------------
    // Internals
    //--------------------------------------------------------------------------

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn dataset_mut(&mut self, role: Role) -> &mut Dataset {
        match role {
            Role::Master => &mut self.master,
            Role::Input => &mut self.input,
        }
    }

    fn resolve(&mut self, role: Role, selector: &str) -> ExcelloResult<Column> {
        let columns = self.columns(role);
        find_column(&columns, selector)
            .cloned()
            .ok_or_else(|| ExcelloError::ColumnNotFound(format!("'{}' in {} sheet", selector, role)))
    }

    fn push_selected(&mut self, role: Role, column: Column) -> bool {
        let revision = self.next_revision();
        let dataset = self.dataset_mut(role);
        let is_input_index =
            role == Role::Input && dataset.index.as_ref().is_some_and(|i| i.label == column.label);
        if is_input_index || dataset.selected.iter().any(|c| c.label == column.label) {
            return false;
        }
        dataset.selected.push(column);
        dataset.selection_revision = revision;
        true
    }

    /// Re-anchor index and selection on the current column list.
    ///
    /// Columns are matched by label; names are refreshed. Labels that no longer
    /// exist are dropped and a missing index is re-suggested.
    fn revalidate(&mut self, role: Role) {
        let columns = self.columns(role);
        let revision = self.next_revision();
        let dataset = self.dataset_mut(role);
        let lookup = |label: &str| columns.iter().find(|c| c.label == label).cloned();

        let index = dataset
            .index
            .as_ref()
            .and_then(|i| lookup(&i.label))
            .or_else(|| suggest_index(&columns).cloned());
        let selected: Vec<Column> = dataset
            .selected
            .iter()
            .filter_map(|c| lookup(&c.label))
            .filter(|c| {
                !(role == Role::Input && index.as_ref().is_some_and(|i| i.label == c.label))
            })
            .collect();

        if index != dataset.index || selected != dataset.selected {
            debug!(%role, index = ?index.as_ref().map(|c| &c.label), "selection re-anchored");
            dataset.index = index;
            dataset.selected = selected;
            dataset.selection_revision = revision;
        }
    }
}
