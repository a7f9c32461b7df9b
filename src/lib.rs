//! Excello - reconcile an input spreadsheet against a master spreadsheet
//!
//! Rows are joined on an index column. Input rows whose index value exists in
//! the master are *matched* (joined with the chosen master columns); the rest
//! are *missing*. Both sets can be exported to .xlsx or promoted to become a
//! new master or input for another round.
//!
//! # Pipeline
//!
//! - [`sheet::derive_columns`] - header row → ordered [`Column`]s
//! - [`core::index_rows`] - data block → index-value keyed [`core::RowIndex`]
//! - [`core::reconcile`] - input index × master index → matched / missing rows
//! - [`excel::WorkbookExporter`] - row sets → .xlsx
//!
//! [`core::Session`] ties these together and recomputes only what changed.
//!
//! # Example
//!
//! ```no_run
//! use excello::core::Session;
//! use excello::types::Role;
//! use std::path::Path;
//!
//! let mut session = Session::default();
//! session.load_workbook(Role::Master, Path::new("master.xlsx"))?;
//! session.load_workbook(Role::Input, Path::new("input.csv"))?;
//! session.select_column(Role::Master, "Name")?;
//!
//! let result = session.reconciliation();
//! println!("{} matched, {} missing", result.matched.len(), result.missing.len());
//! # Ok::<(), excello::error::ExcelloError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod sheet;
pub mod types;

// Re-export commonly used types
pub use config::Settings;
pub use error::{ExcelloError, ExcelloResult};
pub use types::{Cell, CellValue, Column, PromoteReason, Role, Sheet, Workbook};
