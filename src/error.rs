use thiserror::Error;

/// Reasons an uploaded file could not be turned into an order table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file type '{extension}' (expected .xlsx, .xls or .csv)")]
    UnsupportedFormat { extension: String },

    #[error("could not open workbook: {0}")]
    Workbook(String),

    #[error("could not read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("the first sheet has no header row")]
    EmptySheet,

    #[error("required column '{column}' not found in header")]
    MissingColumn { column: String },
}

/// Why a single dashboard figure cannot be computed. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FeatureUnavailable {
    #[error("column '{column}' not found")]
    MissingColumn { column: String },

    #[error("column '{column}' has no usable values")]
    NoUsableValues { column: String },
}
