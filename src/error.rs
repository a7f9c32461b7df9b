use thiserror::Error;

pub type ExcelloResult<T> = Result<T, ExcelloError>;

#[derive(Error, Debug)]
pub enum ExcelloError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported file type: {0} (expected .xlsx, .ods or .csv)")]
    UnsupportedFile(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Promote error: {0}")]
    Promote(String),

    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
