//! Style table: named cell formats resolved once into library formats.

use std::collections::BTreeMap;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, FormatPattern};

use crate::conf::derive_date_format_patch;
use crate::error::{ExportError, ExportResult};
use crate::spec::{EnumStyleKey, SpecCellFormat, SpecStyleRef};

/// Read-only style table shared by every cell write.
///
/// Date cells use a cached variant of their data style instead of mutating
/// the shared format, so earlier cells never change rendering.
#[derive(Debug, Clone)]
pub struct SpecStyleTable {
    dict_spec: BTreeMap<EnumStyleKey, SpecCellFormat>,
    dict_fmt: BTreeMap<SpecStyleRef, Format>,
}

impl SpecStyleTable {
    /// Resolve every named style (and the date variant of each data style).
    pub fn build(dict_spec: BTreeMap<EnumStyleKey, SpecCellFormat>) -> Self {
        let fmt_date_patch = derive_date_format_patch();
        let mut dict_fmt = BTreeMap::new();
        for (key, spec) in &dict_spec {
            dict_fmt.insert(SpecStyleRef::plain(*key), derive_rust_xlsx_format(spec));
            if key.is_data() {
                dict_fmt.insert(
                    SpecStyleRef {
                        key: *key,
                        if_date: true,
                    },
                    derive_rust_xlsx_format(&spec.merge(&fmt_date_patch)),
                );
            }
        }
        Self {
            dict_spec,
            dict_fmt,
        }
    }

    /// Library format for `style`.
    pub fn format(&self, style: SpecStyleRef) -> ExportResult<&Format> {
        self.dict_fmt.get(&style).ok_or_else(|| {
            ExportError::Configuration(format!(
                "style not in table: {}{}",
                style.key.as_str(),
                if style.if_date { " (date)" } else { "" }
            ))
        })
    }

    /// Format specification behind a named style.
    pub fn spec(&self, key: EnumStyleKey) -> Option<&SpecCellFormat> {
        self.dict_spec.get(&key)
    }

    /// Effective specification of `style`, including the date patch.
    pub fn spec_resolved(&self, style: SpecStyleRef) -> Option<SpecCellFormat> {
        let spec = self.dict_spec.get(&style.key)?;
        if style.if_date {
            Some(spec.merge(&derive_date_format_patch()))
        } else {
            Some(spec.clone())
        }
    }
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if let Some(val) = &spec.border_color {
        format = format.set_border_color(val.as_str());
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}
