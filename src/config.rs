//! Settings loaded from an optional YAML file
//!
//! ```yaml
//! sentinel: "NOT FOUND"
//! sentinel_mode: falsy        # or empty_only
//! limits:
//!   max_rows: 1048576
//!   max_columns: 16384
//! output:
//!   dir: exports
//!   matched_sheet: Output
//!   missing_sheet: Master_Missing
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use crate::core::IndexPolicy;
use crate::error::{ExcelloError, ExcelloResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SENTINEL: &str = "NOT FOUND";
pub const DEFAULT_MATCHED_SHEET: &str = "Output";
pub const DEFAULT_MISSING_SHEET: &str = "Master_Missing";

/// xlsx grid limits
pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLUMNS: usize = 16_384;

/// Which index cell values collapse into the sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SentinelMode {
    /// Empty text, zero and `false` all read as the sentinel
    #[default]
    Falsy,
    /// Only empty text reads as the sentinel; `0` keeps its value
    EmptyOnly,
}

/// Upper bounds for header and data-block scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanLimits {
    pub max_rows: u32,
    pub max_columns: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_rows: MAX_ROWS,
            max_columns: MAX_COLUMNS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub matched_sheet: String,
    pub missing_sheet: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            matched_sheet: DEFAULT_MATCHED_SHEET.to_string(),
            missing_sheet: DEFAULT_MISSING_SHEET.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub sentinel: String,
    pub sentinel_mode: SentinelMode,
    pub limits: ScanLimits,
    pub output: OutputSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            sentinel_mode: SentinelMode::default(),
            limits: ScanLimits::default(),
            output: OutputSettings::default(),
        }
    }
}

impl Settings {
    /// Load and validate a settings file
    pub fn load(path: &Path) -> ExcelloResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> ExcelloResult<Self> {
        // An empty file deserializes to null; treat it as all defaults
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> ExcelloResult<()> {
        if self.limits.max_rows == 0 || self.limits.max_rows > MAX_ROWS {
            return Err(ExcelloError::Config(format!(
                "limits.max_rows must be between 1 and {}",
                MAX_ROWS
            )));
        }
        if self.limits.max_columns == 0 || self.limits.max_columns > MAX_COLUMNS {
            return Err(ExcelloError::Config(format!(
                "limits.max_columns must be between 1 and {}",
                MAX_COLUMNS
            )));
        }
        for (key, name) in [
            ("output.matched_sheet", &self.output.matched_sheet),
            ("output.missing_sheet", &self.output.missing_sheet),
        ] {
            validate_sheet_name(key, name)?;
        }
        if self.output.matched_sheet == self.output.missing_sheet {
            return Err(ExcelloError::Config(
                "output.matched_sheet and output.missing_sheet must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn index_policy(&self) -> IndexPolicy {
        IndexPolicy {
            sentinel: self.sentinel.clone(),
            mode: self.sentinel_mode,
        }
    }
}

/// Excel worksheet naming rules
fn validate_sheet_name(key: &str, name: &str) -> ExcelloResult<()> {
    if name.is_empty() || name.chars().count() > 31 {
        return Err(ExcelloError::Config(format!(
            "{} must be 1 to 31 characters, got '{}'",
            key, name
        )));
    }
    if name.contains(['[', ']', ':', '*', '?', '/', '\\']) {
        return Err(ExcelloError::Config(format!(
            "{} contains a character Excel forbids in sheet names: '{}'",
            key, name
        )));
    }
    Ok(())
}
