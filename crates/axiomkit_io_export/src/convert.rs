//! Value-to-cell dispatch, converter registry and label resolution.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_xlsxwriter::ExcelDateTime;

use crate::spec::{EnumCellContent, EnumCellValue};

////////////////////////////////////////////////////////////////////////////////
// #region ConverterRegistry

/// Converter from a typed payload to cell text.
pub type FnCellConverter =
    Box<dyn Fn(&(dyn Any + Send + Sync)) -> Result<String, String> + Send + Sync>;

/// Type name -> converter mapping consulted for values without a native cell type.
#[derive(Default)]
pub struct CellConverterRegistry {
    dict_converters: BTreeMap<String, FnCellConverter>,
}

impl CellConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed converter under `type_name`.
    ///
    /// A payload of another type makes the converter fail, which degrades the
    /// cell to its default string form.
    pub fn register<T, F>(&mut self, type_name: impl Into<String>, converter: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> Result<String, String> + Send + Sync + 'static,
    {
        let c_type_name: String = type_name.into();
        let c_type_expected = c_type_name.clone();
        self.dict_converters.insert(
            c_type_name,
            Box::new(move |payload| match payload.downcast_ref::<T>() {
                Some(val) => converter(val),
                None => Err(format!(
                    "payload is not the type registered as {c_type_expected:?}"
                )),
            }),
        );
        self
    }

    /// Register an untyped converter under `type_name`.
    pub fn register_raw(
        &mut self,
        type_name: impl Into<String>,
        converter: FnCellConverter,
    ) -> &mut Self {
        self.dict_converters.insert(type_name.into(), converter);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.dict_converters.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.dict_converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict_converters.is_empty()
    }

    /// Run the converter for `type_name`; `None` when nothing is registered.
    pub fn convert(
        &self,
        type_name: &str,
        payload: &(dyn Any + Send + Sync),
    ) -> Option<Result<String, String>> {
        self.dict_converters
            .get(type_name)
            .map(|converter| converter(payload))
    }
}

impl fmt::Debug for CellConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellConverterRegistry")
            .field("types", &self.dict_converters.keys().collect::<Vec<_>>())
            .finish()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LabelResolver

/// Dictionary label lookup applied to bulk records carrying `dict_type`.
pub trait LabelResolver: Send + Sync {
    /// Map a raw value to its display label in dictionary `dict_type`.
    fn resolve_label(&self, value: &str, dict_type: &str) -> Result<String, String>;
}

impl<F> LabelResolver for F
where
    F: Fn(&str, &str) -> Result<String, String> + Send + Sync,
{
    fn resolve_label(&self, value: &str, dict_type: &str) -> Result<String, String> {
        self(value, dict_type)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ValueDispatch

/// Cell that could not be written with its native type.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDegradedCell {
    /// Text written instead.
    pub content: EnumCellContent,
    /// Why the native write was abandoned.
    pub reason: String,
}

/// Resolve `value` into buffered cell content.
///
/// Precedence: empty, string, integers, floats, dates, registered converter
/// (by `type_hint`, else the value's type name), default string form.
/// `Err` carries the string fallback for values that failed to convert.
pub fn resolve_cell_content(
    value: &EnumCellValue,
    type_hint: Option<&str>,
    registry: &CellConverterRegistry,
) -> Result<EnumCellContent, SpecDegradedCell> {
    match value {
        EnumCellValue::None => Ok(EnumCellContent::Text(String::new())),
        EnumCellValue::String(val) => Ok(EnumCellContent::Text(val.clone())),
        EnumCellValue::Int32(val) => Ok(EnumCellContent::Number(f64::from(*val))),
        EnumCellValue::Int64(val) => Ok(EnumCellContent::Number(*val as f64)),
        EnumCellValue::Float64(val) => convert_finite_number(*val, value),
        EnumCellValue::Float32(val) => convert_finite_number(f64::from(*val), value),
        EnumCellValue::Date(val) => convert_datetime(val.and_hms_opt(0, 0, 0), value),
        EnumCellValue::DateTime(val) => convert_datetime(Some(*val), value),
        EnumCellValue::Boolean(val) => {
            convert_with_registry(type_hint.unwrap_or(value.type_name()), val, value, registry)
        }
        EnumCellValue::Object(obj) => convert_with_registry(
            type_hint.unwrap_or(obj.type_name()),
            obj.payload(),
            value,
            registry,
        ),
    }
}

fn convert_finite_number(
    n: f64,
    value: &EnumCellValue,
) -> Result<EnumCellContent, SpecDegradedCell> {
    if n.is_finite() {
        return Ok(EnumCellContent::Number(n));
    }
    Err(SpecDegradedCell {
        content: EnumCellContent::Text(value.to_string()),
        reason: format!("non-finite number {n}"),
    })
}

fn convert_datetime(
    ndt: Option<NaiveDateTime>,
    value: &EnumCellValue,
) -> Result<EnumCellContent, SpecDegradedCell> {
    let reason = match ndt {
        Some(ndt) => match derive_excel_datetime(&ndt) {
            Ok(_) => return Ok(EnumCellContent::Date(ndt)),
            Err(err) => err,
        },
        None => "invalid time of day".to_string(),
    };
    Err(SpecDegradedCell {
        content: EnumCellContent::Text(value.to_string()),
        reason,
    })
}

fn convert_with_registry(
    type_name: &str,
    payload: &(dyn Any + Send + Sync),
    value: &EnumCellValue,
    registry: &CellConverterRegistry,
) -> Result<EnumCellContent, SpecDegradedCell> {
    match registry.convert(type_name, payload) {
        Some(Ok(text)) => Ok(EnumCellContent::Text(text)),
        Some(Err(err)) => Err(SpecDegradedCell {
            content: EnumCellContent::Text(value.to_string()),
            reason: format!("converter for {type_name:?} failed: {err}"),
        }),
        None => Ok(EnumCellContent::Text(value.to_string())),
    }
}

/// Convert a timestamp into the library date type (Excel range 1900..=9999).
pub fn derive_excel_datetime(ndt: &NaiveDateTime) -> Result<ExcelDateTime, String> {
    let n_year = ndt.year();
    if !(1900..=9999).contains(&n_year) {
        return Err(format!("year {n_year} outside Excel date range 1900..=9999"));
    }
    let n_seconds =
        f64::from(ndt.second()) + f64::from(ndt.nanosecond() % 1_000_000_000) / 1e9;

    ExcelDateTime::from_ymd(n_year as u16, ndt.month() as u8, ndt.day() as u8)
        .and_then(|dt| dt.and_hms(ndt.hour() as u16, ndt.minute() as u8, n_seconds))
        .map_err(|err| format!("invalid Excel date {ndt}: {err}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
