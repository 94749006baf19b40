//! Shared export specification models.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use encoding_rs::Encoding;

use crate::conf::{C_SHEET_NAME_DEFAULT, N_LEN_FILENAME_LEGACY_MAX, N_ROWS_WINDOW_DEFAULT};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification, converted to a library format once per style.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Border color for all sides.
    pub border_color: Option<String>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color (solid pattern).
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            border_color: other
                .border_color
                .clone()
                .or_else(|| self.border_color.clone()),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

/// Named entries of the style table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnumStyleKey {
    /// Merged title cell.
    Title,
    /// Header cells.
    Header,
    /// Data cells without horizontal alignment.
    Data,
    /// Left-aligned data cells.
    DataLeft,
    /// Centered data cells.
    DataCenter,
    /// Right-aligned data cells.
    DataRight,
}

impl EnumStyleKey {
    /// Stable style name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnumStyleKey::Title => "title",
            EnumStyleKey::Header => "header",
            EnumStyleKey::Data => "data",
            EnumStyleKey::DataLeft => "data-left",
            EnumStyleKey::DataCenter => "data-center",
            EnumStyleKey::DataRight => "data-right",
        }
    }

    /// Whether the style has a cached date variant.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            EnumStyleKey::Data
                | EnumStyleKey::DataLeft
                | EnumStyleKey::DataCenter
                | EnumStyleKey::DataRight
        )
    }
}

/// Horizontal alignment requested for a data cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCellAlign {
    /// Library default alignment (`data` style).
    #[default]
    General,
    /// Left (`data-left`).
    Left,
    /// Center (`data-center`).
    Center,
    /// Right (`data-right`).
    Right,
}

impl EnumCellAlign {
    /// Map numeric align code (`1` left, `2` center, `3` right); anything else is general.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => EnumCellAlign::Left,
            2 => EnumCellAlign::Center,
            3 => EnumCellAlign::Right,
            _ => EnumCellAlign::General,
        }
    }

    /// Data style used for this alignment.
    pub fn style_key(&self) -> EnumStyleKey {
        match self {
            EnumCellAlign::General => EnumStyleKey::Data,
            EnumCellAlign::Left => EnumStyleKey::DataLeft,
            EnumCellAlign::Center => EnumStyleKey::DataCenter,
            EnumCellAlign::Right => EnumStyleKey::DataRight,
        }
    }
}

/// Reference into the style table: named style plus date variant flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecStyleRef {
    /// Named style.
    pub key: EnumStyleKey,
    /// Use the cached `yyyy-mm-dd` variant.
    pub if_date: bool,
}

impl SpecStyleRef {
    /// Plain (non-date) reference.
    pub fn plain(key: EnumStyleKey) -> Self {
        Self {
            key,
            if_date: false,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueSpecification

/// Opaque typed value rendered through the converter registry.
#[derive(Clone)]
pub struct SpecCellObject {
    type_name: String,
    text: String,
    payload: Arc<dyn Any + Send + Sync>,
}

impl SpecCellObject {
    /// Wrap `value`, keyed by its short Rust type name.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + fmt::Display + Send + Sync,
    {
        Self {
            type_name: derive_short_type_name(std::any::type_name::<T>()),
            text: value.to_string(),
            payload: Arc::new(value),
        }
    }

    /// Override the registry key.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Registry key of the payload type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Default string form.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Wrapped value.
    pub fn payload(&self) -> &(dyn Any + Send + Sync) {
        self.payload.as_ref()
    }
}

impl fmt::Debug for SpecCellObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecCellObject")
            .field("type_name", &self.type_name)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

impl PartialEq for SpecCellObject {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.text == other.text
    }
}

/// `a::b::Foo<c::Bar>` -> `Foo<Bar>`.
fn derive_short_type_name(full_name: &str) -> String {
    let mut c_out = String::with_capacity(full_name.len());
    let mut c_segment = String::new();
    for chr in full_name.chars() {
        match chr {
            ':' => c_segment.clear(),
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                c_out.push_str(&c_segment);
                c_segment.clear();
                c_out.push(chr);
            }
            _ => c_segment.push(chr),
        }
    }
    c_out.push_str(&c_segment);
    c_out
}

/// Value handed to `add_cell`, dispatched by variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing value; written as an empty string cell.
    #[default]
    None,
    /// Text value.
    String(String),
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// Double-precision float.
    Float64(f64),
    /// Single-precision float.
    Float32(f32),
    /// Boolean; rendered through the registry under `bool`.
    Boolean(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Timestamp; displayed with the date pattern.
    DateTime(NaiveDateTime),
    /// Any other typed value.
    Object(SpecCellObject),
}

impl EnumCellValue {
    /// Registry key used for values without a native cell mapping.
    pub fn type_name(&self) -> &str {
        match self {
            EnumCellValue::None => "None",
            EnumCellValue::String(_) => "String",
            EnumCellValue::Int32(_) => "i32",
            EnumCellValue::Int64(_) => "i64",
            EnumCellValue::Float64(_) => "f64",
            EnumCellValue::Float32(_) => "f32",
            EnumCellValue::Boolean(_) => "bool",
            EnumCellValue::Date(_) => "NaiveDate",
            EnumCellValue::DateTime(_) => "NaiveDateTime",
            EnumCellValue::Object(obj) => obj.type_name(),
        }
    }

    /// Whether the value is missing.
    pub fn is_none(&self) -> bool {
        matches!(self, EnumCellValue::None)
    }
}

impl fmt::Display for EnumCellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumCellValue::None => Ok(()),
            EnumCellValue::String(val) => f.write_str(val),
            EnumCellValue::Int32(val) => write!(f, "{val}"),
            EnumCellValue::Int64(val) => write!(f, "{val}"),
            EnumCellValue::Float64(val) => write!(f, "{val}"),
            EnumCellValue::Float32(val) => write!(f, "{val}"),
            EnumCellValue::Boolean(val) => write!(f, "{val}"),
            EnumCellValue::Date(val) => write!(f, "{}", val.format("%Y-%m-%d")),
            EnumCellValue::DateTime(val) => write!(f, "{}", val.format("%Y-%m-%d %H:%M:%S")),
            EnumCellValue::Object(obj) => f.write_str(obj.text()),
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        EnumCellValue::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        EnumCellValue::String(value)
    }
}

impl From<i8> for EnumCellValue {
    fn from(value: i8) -> Self {
        EnumCellValue::Int32(value.into())
    }
}

impl From<i16> for EnumCellValue {
    fn from(value: i16) -> Self {
        EnumCellValue::Int32(value.into())
    }
}

impl From<i32> for EnumCellValue {
    fn from(value: i32) -> Self {
        EnumCellValue::Int32(value)
    }
}

impl From<u32> for EnumCellValue {
    fn from(value: u32) -> Self {
        EnumCellValue::Int64(value.into())
    }
}

impl From<i64> for EnumCellValue {
    fn from(value: i64) -> Self {
        EnumCellValue::Int64(value)
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        EnumCellValue::Float64(value)
    }
}

impl From<f32> for EnumCellValue {
    fn from(value: f32) -> Self {
        EnumCellValue::Float32(value)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        EnumCellValue::Boolean(value)
    }
}

impl From<NaiveDate> for EnumCellValue {
    fn from(value: NaiveDate) -> Self {
        EnumCellValue::Date(value)
    }
}

impl From<NaiveDateTime> for EnumCellValue {
    fn from(value: NaiveDateTime) -> Self {
        EnumCellValue::DateTime(value)
    }
}

impl From<SpecCellObject> for EnumCellValue {
    fn from(value: SpecCellObject) -> Self {
        EnumCellValue::Object(value)
    }
}

impl<T: Into<EnumCellValue>> From<Option<T>> for EnumCellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(EnumCellValue::None, Into::into)
    }
}

/// Resolved cell content buffered in the row window.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellContent {
    /// Text; the empty string is written as a styled blank.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Date/timestamp, written as an Excel serial date.
    Date(NaiveDateTime),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HeaderSpecification

/// One parsed header: visible label plus optional note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecHeader {
    /// Header cell text.
    pub label: String,
    /// Note attached to the header cell.
    pub note: Option<String>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Handles

/// Row appended by [`crate::exporter::SpreadsheetExporter::add_row`].
///
/// Only the exporter hands these out, so title and header rows are never
/// addressable through `add_cell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecRowHandle {
    pub(crate) row_idx: u32,
}

impl SpecRowHandle {
    /// Zero-based sheet row index.
    pub fn row_idx(&self) -> u32 {
        self.row_idx
    }
}

/// Cell written by [`crate::exporter::SpreadsheetExporter::add_cell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecCellHandle {
    pub(crate) row_idx: u32,
    pub(crate) col_idx: u16,
    pub(crate) style: SpecStyleRef,
}

impl SpecCellHandle {
    /// Zero-based sheet row index.
    pub fn row_idx(&self) -> u32 {
        self.row_idx
    }

    /// Zero-based column index.
    pub fn col_idx(&self) -> u16 {
        self.col_idx
    }

    /// Style applied to the cell.
    pub fn style(&self) -> SpecStyleRef {
        self.style
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Filename encoding policy for download responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDownloadPolicy {
    /// User-agent substrings identifying legacy agents.
    pub legacy_agent_markers: Vec<String>,
    /// Percent-encoded length above which legacy agents get raw bytes.
    pub len_encoded_max: usize,
    /// Charset of the raw-byte fallback.
    pub legacy_encoding: &'static Encoding,
}

impl Default for SpecDownloadPolicy {
    fn default() -> Self {
        Self {
            legacy_agent_markers: vec!["MSIE".to_string(), "Trident".to_string()],
            len_encoded_max: N_LEN_FILENAME_LEGACY_MAX,
            legacy_encoding: encoding_rs::GBK,
        }
    }
}

/// Exporter-wide options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExportOptions {
    /// Rows kept in memory; older rows go to the worksheet.
    pub row_window_size: usize,
    /// Sheet name used when the title is blank.
    pub sheet_name_default: String,
    /// Back the worksheet with a temporary file (constant-memory mode).
    pub if_spill_to_disk: bool,
    /// Download filename policy.
    pub download_policy: SpecDownloadPolicy,
}

impl Default for SpecExportOptions {
    fn default() -> Self {
        Self {
            row_window_size: N_ROWS_WINDOW_DEFAULT,
            sheet_name_default: C_SHEET_NAME_DEFAULT.to_string(),
            if_spill_to_disk: true,
            download_policy: SpecDownloadPolicy::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-export report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecExportReport {
    /// Rows appended (title, header and data).
    pub cnt_rows: u64,
    /// Cells written through `add_cell`.
    pub cnt_cells: u64,
    /// Cells degraded to their string form.
    pub cnt_cells_degraded: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecExportReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
