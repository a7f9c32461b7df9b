use clap::{Parser, Subcommand};
use excello::cli::{self, DatasetOptions, PromoteTarget, ReconcileOptions, SettingsOverrides};
use excello::config::SentinelMode;
use excello::error::ExcelloResult;
use excello::excel::ExportSelection;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "excello")]
#[command(about = "Reconcile an input spreadsheet against a master by index column.")]
#[command(long_about = "Excello - spreadsheet reconciliation
Match input rows to master rows by index value, list what is missing, export both.

COMMANDS:
  sheets     - List the sheets in a workbook
  columns    - Show the header columns of a sheet
  reconcile  - Match input rows against the master and export the result

FILES:
  .xlsx .xlsm .xls .ods .csv

EXAMPLES:
  excello sheets master.xlsx
  excello columns master.xlsx --sheet Staff --header-offset 2
  excello reconcile master.xlsx input.csv --master-columns Name,Dept --export both

CONFIGURATION:
  --config excello.yaml (or EXCELLO_CONFIG) sets the sentinel, scan limits
  and export sheet names. Log level comes from EXCELLO_LOG (e.g. debug).")]
#[command(version)]
struct Cli {
    /// Settings file (YAML)
    #[arg(long, global = true, env = "EXCELLO_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sheets in a workbook
    Sheets {
        /// Workbook file (.xlsx, .xlsm, .xls, .ods, .csv)
        file: PathBuf,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    #[command(long_about = "Show the header columns of one sheet.

The header row is the row after HEADER_OFFSET skipped rows. Columns are read
left to right from column A and stop at the first empty header cell.

EXAMPLE:
  excello columns master.xlsx --sheet Staff --header-offset 2")]
    /// Show the header columns of a sheet
    Columns {
        /// Workbook file
        file: PathBuf,

        /// Sheet name (defaults to the first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Rows to skip above the header row
        #[arg(long, default_value = "0")]
        header_offset: u32,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    #[command(long_about = "Match input rows against the master by index value.

Each input row is joined to the master row with the same index value. Rows
whose index is not in the master are listed as missing. Output columns are the
input index, the selected input columns, then the selected master columns.

COLUMN SELECTORS:
  A column is named by letter (C) or by header text (\"Employee ID\").
  Lists are comma separated: --master-columns Name,Dept

INDEX COLUMNS:
  Without --master-index / --input-index the first column whose header
  contains \"id\" is used, else column A.

EMPTY INDEX VALUES:
  Empty index cells read as the sentinel (\"NOT FOUND\" by default).
  --sentinel-mode falsy also maps 0 and FALSE; empty-only keeps them.

EXPORT:
  --export matched|missing|both writes an .xlsx with an \"Output\" and/or
  \"Master_Missing\" sheet to --output, or to a timestamped
  Excello-<time>.xlsx file in --output-dir.

ITERATIVE ROUNDS:
  --promote missing:input runs one round, makes its missing rows the new
  input (sheet \"Previously Missing\", index = column A) and reconciles again.
  matched:master / missing:master / matched:input work the same way. The
  promoted dataset's column selection is cleared; the other one is kept.
  For rounds across runs, --export the set and pass the file back in.

EXAMPLE:
  excello reconcile staff.xlsx timesheet.csv \\
    --master-index \"Employee ID\" --master-columns Name,Dept \\
    --input-columns Hours --export both --output-dir out/")]
    /// Match input rows against the master and export the result
    Reconcile {
        /// Master workbook
        master: PathBuf,

        /// Input workbook
        input: PathBuf,

        /// Master sheet (defaults to the first sheet)
        #[arg(long)]
        master_sheet: Option<String>,

        /// Rows to skip above the master header row
        #[arg(long, default_value = "0")]
        master_header_offset: u32,

        /// Master index column (letter or header)
        #[arg(long)]
        master_index: Option<String>,

        /// Master columns to include
        #[arg(long, value_delimiter = ',')]
        master_columns: Vec<String>,

        /// Include every master column
        #[arg(long)]
        all_master_columns: bool,

        /// Input sheet (defaults to the first sheet)
        #[arg(long)]
        input_sheet: Option<String>,

        /// Rows to skip above the input header row
        #[arg(long, default_value = "0")]
        input_header_offset: u32,

        /// Input index column (letter or header)
        #[arg(long)]
        input_index: Option<String>,

        /// Input columns to include
        #[arg(long, value_delimiter = ',')]
        input_columns: Vec<String>,

        /// Include every input column
        #[arg(long)]
        all_input_columns: bool,

        /// Value written for empty index cells
        #[arg(long)]
        sentinel: Option<String>,

        /// Which index values collapse into the sentinel
        #[arg(long, value_enum)]
        sentinel_mode: Option<SentinelMode>,

        /// Stop scanning data rows after this many
        #[arg(long)]
        max_rows: Option<u32>,

        /// Promote a result set and reconcile again (e.g. missing:input)
        #[arg(long, value_name = "SET:DATASET")]
        promote: Option<PromoteTarget>,

        /// Write the chosen result sets to an .xlsx file
        #[arg(short, long, value_enum)]
        export: Option<ExportSelection>,

        /// Export file path
        #[arg(short, long, requires = "export")]
        output: Option<PathBuf>,

        /// Directory for timestamped export files
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Rows shown per table
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Print a JSON report instead of tables
        #[arg(long)]
        json: bool,

        /// Show the resolved sheet, index and columns of each dataset
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExcelloResult<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "excello=debug" } else { "excello=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("EXCELLO_LOG").unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sheets { file, json } => cli::sheets(file, json),

        Commands::Columns {
            file,
            sheet,
            header_offset,
            json,
        } => {
            let settings = cli::load_settings(cli.config.as_deref(), SettingsOverrides::default())?;
            cli::columns(file, sheet, header_offset, json, &settings)
        }

        Commands::Reconcile {
            master,
            input,
            master_sheet,
            master_header_offset,
            master_index,
            master_columns,
            all_master_columns,
            input_sheet,
            input_header_offset,
            input_index,
            input_columns,
            all_input_columns,
            sentinel,
            sentinel_mode,
            max_rows,
            promote,
            export,
            output,
            output_dir,
            limit,
            json,
            verbose,
        } => {
            let settings = cli::load_settings(
                cli.config.as_deref(),
                SettingsOverrides {
                    sentinel,
                    sentinel_mode,
                    max_rows,
                    output_dir,
                },
            )?;
            let options = ReconcileOptions {
                master: DatasetOptions {
                    file: master,
                    sheet: master_sheet,
                    header_offset: master_header_offset,
                    index: master_index,
                    columns: master_columns,
                    all_columns: all_master_columns,
                },
                input: DatasetOptions {
                    file: input,
                    sheet: input_sheet,
                    header_offset: input_header_offset,
                    index: input_index,
                    columns: input_columns,
                    all_columns: all_input_columns,
                },
                promote,
                export,
                output,
                limit,
                json,
                verbose,
            };
            cli::reconcile(options, settings)
        }
    }
}
