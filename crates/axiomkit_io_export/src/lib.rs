//! `axiomkit_io_export` v1:
//! Streaming single-sheet XLSX exporter.
//!
//! Modules:
//! - `conf`     : constants and default presets
//! - `spec`     : specs/models/options
//! - `error`    : error type
//! - `util`     : pure helper functions
//! - `style`    : named style table with cached date variants
//! - `convert`  : value dispatch, converter registry, label resolver
//! - `window`   : bounded row window and worksheet sink
//! - `download` : HTTP attachment response surface
//! - `frame`    : polars `DataFrame` rows as cell values
//! - `exporter` : exporter lifecycle
pub mod conf;
pub mod convert;
pub mod download;
pub mod error;
pub mod exporter;
pub mod frame;
pub mod spec;
pub mod style;
pub mod util;
pub mod window;

pub use conf::{
    C_NUM_FORMAT_DATE, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    N_ROWS_WINDOW_DEFAULT, TUP_EXCEL_ILLEGAL,
};
pub use convert::{CellConverterRegistry, FnCellConverter, LabelResolver};
pub use download::{DownloadResponse, apply_download_headers, encode_download_filename};
pub use error::{ExportError, ExportResult};
pub use exporter::SpreadsheetExporter;
pub use spec::{
    EnumCellAlign, EnumCellContent, EnumCellValue, EnumStyleKey, SpecCellFormat,
    SpecCellHandle, SpecCellObject, SpecDownloadPolicy, SpecExportOptions, SpecExportReport,
    SpecHeader, SpecRowHandle, SpecStyleRef,
};
pub use util::{parse_headers, sanitize_sheet_name, split_header};
