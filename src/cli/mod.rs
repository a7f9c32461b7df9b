//! CLI command handlers

pub mod commands;

pub use commands::{
    columns, load_settings, reconcile, sheets, DatasetOptions, PromoteTarget, ReconcileOptions,
    SettingsOverrides,
};
