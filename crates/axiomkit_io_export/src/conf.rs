//! Export constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::{EnumStyleKey, SpecCellFormat, SpecExportOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Rows kept in memory before older rows are handed to the worksheet.
pub const N_ROWS_WINDOW_DEFAULT: usize = 500;
/// Sheet name used when the title is blank.
pub const C_SHEET_NAME_DEFAULT: &str = "Export";

/// Separator between header label and header note.
pub const C_HEADER_NOTE_SEP: &str = "**";
/// Title row height in points.
pub const N_HEIGHT_ROW_TITLE: f64 = 30.0;
/// Header row height in points.
pub const N_HEIGHT_ROW_HEADER: f64 = 16.0;

/// Width units per character (Excel stores column width in 1/256 chars).
pub const N_WIDTH_UNITS_PER_CHAR: u32 = 256;
/// Auto-width multiplier applied to header columns.
pub const N_WIDTH_COLUMN_FACTOR: u32 = 2;
/// Minimum header column width, in width units.
pub const N_WIDTH_COLUMN_MIN: u32 = 3000;

/// Excel number format for date cells (`yyyy-MM-dd`).
pub const C_NUM_FORMAT_DATE: &str = "yyyy-mm-dd";
/// Reserved record key naming the dictionary used for label resolution.
pub const C_KEY_DICT_TYPE: &str = "dict_type";

/// `Content-Type` of download responses.
pub const C_CONTENT_TYPE_DOWNLOAD: &str = "application/octet-stream; charset=utf-8";
/// Percent-encoded filename length above which legacy agents get raw bytes.
pub const N_LEN_FILENAME_LEGACY_MAX: usize = 150;

const C_FONT_NAME: &str = "Arial";
const C_COLOR_GREY_50: &str = "#808080";
const C_COLOR_WHITE: &str = "#FFFFFF";

/// Build the fixed named style presets used by [`crate::exporter::SpreadsheetExporter`].
pub fn derive_default_export_styles() -> BTreeMap<EnumStyleKey, SpecCellFormat> {
    let cfg_data_fmt_spec = SpecCellFormat {
        font_name: Some(C_FONT_NAME.to_string()),
        font_size: Some(10),
        valign: Some("vcenter".to_string()),
        border: Some(1),
        border_color: Some(C_COLOR_GREY_50.to_string()),
        ..Default::default()
    };

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(
        EnumStyleKey::Title,
        SpecCellFormat {
            font_name: Some(C_FONT_NAME.to_string()),
            font_size: Some(16),
            bold: Some(true),
            align: Some("center".to_string()),
            valign: Some("vcenter".to_string()),
            ..Default::default()
        },
    );
    dict_fmt.insert(EnumStyleKey::Data, cfg_data_fmt_spec.clone());
    dict_fmt.insert(
        EnumStyleKey::DataLeft,
        cfg_data_fmt_spec.with_(SpecCellFormat {
            align: Some("left".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumStyleKey::DataCenter,
        cfg_data_fmt_spec.with_(SpecCellFormat {
            align: Some("center".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumStyleKey::DataRight,
        cfg_data_fmt_spec.with_(SpecCellFormat {
            align: Some("right".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumStyleKey::Header,
        cfg_data_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            bg_color: Some(C_COLOR_GREY_50.to_string()),
            font_color: Some(C_COLOR_WHITE.to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}

/// Patch overlaid on a data style to derive its cached date variant.
pub fn derive_date_format_patch() -> SpecCellFormat {
    SpecCellFormat {
        num_format: Some(C_NUM_FORMAT_DATE.to_string()),
        ..Default::default()
    }
}

/// Build default export options.
pub fn derive_default_export_options() -> SpecExportOptions {
    SpecExportOptions::default()
}
