//! Stateless helper utilities used by the exporter.

use crate::conf::{
    C_HEADER_NOTE_SEP, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    N_WIDTH_COLUMN_FACTOR, N_WIDTH_COLUMN_MIN, N_WIDTH_UNITS_PER_CHAR, TUP_EXCEL_ILLEGAL,
};
use crate::error::{ExportError, ExportResult};
use crate::spec::SpecHeader;

////////////////////////////////////////////////////////////////////////////////
// #region HeaderUtils

/// Split `label**note` on the first separator only.
pub fn split_header(raw: &str) -> SpecHeader {
    match raw.split_once(C_HEADER_NOTE_SEP) {
        Some((label, note)) => SpecHeader {
            label: label.to_string(),
            note: Some(note.to_string()),
        },
        None => SpecHeader {
            label: raw.to_string(),
            note: None,
        },
    }
}

/// Parse and validate the header list.
pub fn parse_headers<S: AsRef<str>>(headers: &[S]) -> ExportResult<Vec<SpecHeader>> {
    if headers.is_empty() {
        return Err(ExportError::Configuration(
            "headers must be non-empty".to_string(),
        ));
    }
    if headers.len() > N_NCOLS_EXCEL_MAX {
        return Err(ExportError::Configuration(format!(
            "headers exceed Excel column limit: {} > {N_NCOLS_EXCEL_MAX}",
            headers.len()
        )));
    }
    Ok(headers.iter().map(|c_raw| split_header(c_raw.as_ref())).collect())
}

/// Whether `s` is empty or whitespace only.
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WidthUtils

/// Estimate displayed character width; non-ASCII glyphs count wider.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

/// Header column width in width units: auto width, doubled, floored.
pub fn derive_column_width_units(label: &str) -> u32 {
    let n_chars = u32::try_from(estimate_unicode_string_width(label)).unwrap_or(u32::MAX);
    let n_width_auto = n_chars.saturating_mul(N_WIDTH_UNITS_PER_CHAR);
    u32::max(
        N_WIDTH_COLUMN_MIN,
        n_width_auto.saturating_mul(N_WIDTH_COLUMN_FACTOR),
    )
}

/// Convert width units to the character width the library expects.
pub fn convert_width_units_to_chars(width_units: u32) -> f64 {
    f64::from(width_units) / f64::from(N_WIDTH_UNITS_PER_CHAR)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str, fallback: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    // Excel rejects names wrapped in apostrophes.
    c_name = c_name.trim().trim_matches('\'').trim().to_string();
    if c_name.is_empty() {
        c_name = fallback.to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region IndexCasts

pub fn cast_row_num(value: usize) -> ExportResult<u32> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(ExportError::OutOfRange(format!(
            "row index {value} exceeds Excel limit {N_NROWS_EXCEL_MAX}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| ExportError::OutOfRange(format!("row index overflow: {value}")))
}

pub fn cast_col_num(value: usize) -> ExportResult<u16> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(ExportError::OutOfRange(format!(
            "column index {value} exceeds Excel limit {N_NCOLS_EXCEL_MAX}"
        )));
    }
    u16::try_from(value)
        .map_err(|_| ExportError::OutOfRange(format!("column index overflow: {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
