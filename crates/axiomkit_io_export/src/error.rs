use std::path::PathBuf;

use rust_xlsxwriter::XlsxError;
use thiserror::Error;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Row {row_idx} was flushed out of the {window_size}-row window")]
    RowFlushed { row_idx: u32, window_size: usize },

    #[error("Index out of range: {0}")]
    OutOfRange(String),

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("Response header error: {0}")]
    Header(String),

    #[error("DataFrame error: {0}")]
    DataFrame(String),
}
