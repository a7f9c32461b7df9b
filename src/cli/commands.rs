use crate::config::{SentinelMode, Settings};
use crate::core::{Reconciliation, ReconciliationSummary, Session};
use crate::error::{ExcelloError, ExcelloResult};
use crate::excel::{ExportSelection, WorkbookExporter, WorkbookImporter};
use crate::sheet::derive_columns;
use crate::types::{Column, PromoteReason, Role};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Widest cell shown in terminal tables
const MAX_CELL_WIDTH: usize = 30;

/// Command-line values that override the settings file
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub sentinel: Option<String>,
    pub sentinel_mode: Option<SentinelMode>,
    pub max_rows: Option<u32>,
    pub output_dir: Option<PathBuf>,
}

/// Per-dataset selections for the reconcile command
#[derive(Debug, Clone, Default)]
pub struct DatasetOptions {
    pub file: PathBuf,
    pub sheet: Option<String>,
    pub header_offset: u32,
    pub index: Option<String>,
    pub columns: Vec<String>,
    pub all_columns: bool,
}

/// Result set moved into a dataset before the final round, written
/// `<matched|missing>:<master|input>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromoteTarget {
    pub reason: PromoteReason,
    pub role: Role,
}

impl FromStr for PromoteTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (reason, role) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <matched|missing>:<master|input>, got '{}'", s))?;
        let reason = match reason.trim().to_ascii_lowercase().as_str() {
            "matched" => PromoteReason::Matched,
            "missing" => PromoteReason::Missing,
            other => return Err(format!("unknown result set '{}' (matched or missing)", other)),
        };
        let role = match role.trim().to_ascii_lowercase().as_str() {
            "master" => Role::Master,
            "input" => Role::Input,
            other => return Err(format!("unknown dataset '{}' (master or input)", other)),
        };
        Ok(Self { reason, role })
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub master: DatasetOptions,
    pub input: DatasetOptions,
    /// Run one round, promote a result set, then reconcile again
    pub promote: Option<PromoteTarget>,
    pub export: Option<ExportSelection>,
    /// Exact export path; a timestamped name in the output dir otherwise
    pub output: Option<PathBuf>,
    /// Rows shown per table in the terminal
    pub limit: usize,
    pub json: bool,
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ReconcileReport<'a> {
    master_rows: usize,
    input_rows: usize,
    summary: ReconciliationSummary,
    columns: &'a [String],
    matched: &'a [Vec<String>],
    missing: &'a [Vec<String>],
    promoted: Option<PromoteReport>,
    export: Option<PathBuf>,
}

/// First-round counts of a promoted run
#[derive(Debug, Serialize)]
struct PromoteReport {
    #[serde(flatten)]
    target: PromoteTarget,
    first_round: ReconciliationSummary,
}

/// Load the settings file (if any) and apply command-line overrides
pub fn load_settings(config: Option<&Path>, overrides: SettingsOverrides) -> ExcelloResult<Settings> {
    let mut settings = match config {
        Some(path) => {
            debug!(path = %path.display(), "loading settings file");
            Settings::load(path)?
        }
        None => Settings::default(),
    };

    if let Some(sentinel) = overrides.sentinel {
        settings.sentinel = sentinel;
    }
    if let Some(mode) = overrides.sentinel_mode {
        settings.sentinel_mode = mode;
    }
    if let Some(max_rows) = overrides.max_rows {
        settings.limits.max_rows = max_rows;
    }
    if let Some(dir) = overrides.output_dir {
        settings.output.dir = dir;
    }
    settings.validate()?;
    Ok(settings)
}

/// Execute the sheets command - list sheet names in a workbook
pub fn sheets(file: PathBuf, json: bool) -> ExcelloResult<()> {
    let workbook = WorkbookImporter::new(&file).import()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workbook.sheet_names)?);
        return Ok(());
    }

    println!("{}", "📒 Excello - Sheets".bold().green());
    println!("   File: {}\n", file.display());
    for (idx, name) in workbook.sheet_names.iter().enumerate() {
        println!("   {:>3}  {}", idx + 1, name.bright_blue());
    }
    println!();
    Ok(())
}

/// Execute the columns command - show the header columns of one sheet
pub fn columns(
    file: PathBuf,
    sheet: Option<String>,
    header_offset: u32,
    json: bool,
    settings: &Settings,
) -> ExcelloResult<()> {
    let workbook = WorkbookImporter::new(&file).import()?;
    let sheet_name = match sheet {
        Some(name) => name,
        None => workbook
            .first_sheet_name()
            .map(str::to_string)
            .ok_or_else(|| ExcelloError::SheetNotFound(format!("{} has no sheets", file.display())))?,
    };
    let data = workbook
        .sheet(&sheet_name)
        .ok_or_else(|| ExcelloError::SheetNotFound(sheet_name.clone()))?;
    let columns = derive_columns(data, header_offset, &settings.limits);

    if json {
        println!("{}", serde_json::to_string_pretty(&columns)?);
        return Ok(());
    }

    println!("{}", "📒 Excello - Columns".bold().green());
    println!("   File:  {}", file.display());
    println!("   Sheet: {}", sheet_name.bright_yellow());
    println!("   Header row: {}\n", u64::from(header_offset) + 1);

    if columns.is_empty() {
        println!("{}", "⚠️  No header cells found on that row".yellow());
    }
    for column in &columns {
        println!("   {:>4}  {}", column.label.cyan(), column.name);
    }
    println!();
    Ok(())
}

/// Execute the reconcile command - match input rows against the master
pub fn reconcile(options: ReconcileOptions, settings: Settings) -> ExcelloResult<()> {
    let mut session = Session::new(settings);

    if !options.json {
        println!("{}", "📒 Excello - Reconcile".bold().green());
        println!("   Master: {}", options.master.file.display());
        println!("   Input:  {}\n", options.input.file.display());
    }

    prepare_dataset(&mut session, Role::Master, &options.master, options.verbose && !options.json)?;
    prepare_dataset(&mut session, Role::Input, &options.input, options.verbose && !options.json)?;

    let promoted = match options.promote {
        Some(target) => {
            let first_round = session.reconciliation().summary();
            session.promote(target.reason, target.role)?;
            if !options.json {
                let (rows, set) = match target.reason {
                    PromoteReason::Matched => (first_round.matched, "matched"),
                    PromoteReason::Missing => (first_round.missing, "missing"),
                };
                println!(
                    "{}",
                    format!(
                        "🔁 Promoted {} {} rows into the {} dataset ({})",
                        rows,
                        set,
                        target.role,
                        target.reason.sheet_name()
                    )
                    .bold()
                    .yellow()
                );
                println!();
            }
            Some(PromoteReport {
                target,
                first_round,
            })
        }
        None => None,
    };

    let result = session.reconciliation();
    if result.is_empty() {
        return Err(ExcelloError::ColumnNotFound(
            "no index column could be chosen (is the header row empty?)".to_string(),
        ));
    }
    let master_rows = session.row_index(Role::Master).row_count();
    let input_rows = session.row_index(Role::Input).row_count();

    let export = match options.export {
        Some(selection) => Some(export_result(
            &result,
            selection,
            options.output.as_deref(),
            session.settings(),
        )?),
        None => None,
    };

    if options.json {
        let report = ReconcileReport {
            master_rows,
            input_rows,
            summary: result.summary(),
            columns: &result.columns,
            matched: &result.matched,
            missing: &result.missing,
            promoted,
            export,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let summary = result.summary();
    println!(
        "{}",
        format!(
            "📊 Output ({} master rows, {} input rows, {} matched)",
            master_rows, input_rows, summary.matched
        )
        .bold()
        .cyan()
    );
    print_table(&result.columns, &result.matched, options.limit);

    let (input_index, master_index) = (
        session.dataset(Role::Input).index().map(|c| c.name.clone()).unwrap_or_default(),
        session.dataset(Role::Master).index().map(|c| c.name.clone()).unwrap_or_default(),
    );
    println!(
        "\n{}",
        format!("❓ {} input rows missing in master", summary.missing)
            .bold()
            .cyan()
    );
    println!(
        "   Input index ({}) not found in master index ({})",
        input_index.bright_blue(),
        master_index.bright_blue()
    );
    print_table(&result.columns, &result.missing, options.limit);

    println!();
    println!(
        "   {} Matched: {}  {} Missing: {}",
        "✅".green(),
        summary.matched.to_string().green(),
        "❌".red(),
        summary.missing.to_string().red(),
    );

    if let Some(path) = export {
        println!(
            "{}",
            format!("✅ Exported to {}", path.display()).bold().green()
        );
    }
    Ok(())
}

/// Apply one dataset's options to the session, in pipeline order
fn prepare_dataset(
    session: &mut Session,
    role: Role,
    options: &DatasetOptions,
    verbose: bool,
) -> ExcelloResult<()> {
    session.load_workbook(role, &options.file)?;
    if let Some(ref sheet) = options.sheet {
        session.select_sheet(role, sheet)?;
    }
    session.set_header_offset(role, options.header_offset);
    if let Some(ref index) = options.index {
        session.set_index(role, index)?;
    }
    if options.all_columns {
        session.select_all_columns(role);
    }
    for selector in &options.columns {
        session.select_column(role, selector)?;
    }

    if verbose {
        let dataset = session.dataset(role);
        println!(
            "   {} sheet {}, header row {}",
            role.to_string().bold(),
            dataset.sheet_name().unwrap_or("-").bright_yellow(),
            u64::from(dataset.header_offset()) + 1
        );
        println!(
            "      index: {}",
            dataset
                .index()
                .map(Column::to_string)
                .unwrap_or_else(|| "-".to_string())
                .cyan()
        );
        let selected: Vec<String> = dataset.selected().iter().map(Column::to_string).collect();
        println!("      columns: {}\n", selected.join(", "));
    }
    Ok(())
}

fn export_result(
    result: &Reconciliation,
    selection: ExportSelection,
    output: Option<&Path>,
    settings: &Settings,
) -> ExcelloResult<PathBuf> {
    let exporter = WorkbookExporter::for_reconciliation(result, selection, &settings.output);
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            exporter.export(path)?;
            Ok(path.to_path_buf())
        }
        None => {
            fs::create_dir_all(&settings.output.dir)?;
            exporter.export_to_dir(&settings.output.dir)
        }
    }
}

/// Print a header plus up to `limit` rows as an aligned table
fn print_table(columns: &[String], rows: &[Vec<String>], limit: usize) {
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            rows.iter()
                .take(limit)
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_CELL_WIDTH)
        })
        .collect();
    let rule_width = widths.iter().map(|w| w + 2).sum::<usize>().max(10);

    println!("{}", "─".repeat(rule_width));
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(name, &w)| format!("{:<w$}", truncate(name, w), w = w))
        .collect();
    println!("{}", header.join("  ").bold());
    println!("{}", "─".repeat(rule_width));

    for row in rows.iter().take(limit) {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<w$}", truncate(cell, w), w = w))
            .collect();
        println!("{}", cells.join("  "));
    }
    if rows.len() > limit {
        println!("{}", format!("… {} more rows", rows.len() - limit).dimmed());
    }
    println!("{}", "─".repeat(rule_width));
}

/// Cut text to `width` characters, marking the cut with an ellipsis
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
