//! DataFrame rows as cell values.

use polars::prelude::{AnyValue, DataFrame};

use crate::error::{ExportError, ExportResult};
use crate::spec::EnumCellValue;

/// Read row `n_row` of `df` as cell values, in column order.
pub fn derive_row_values(df: &DataFrame, n_row: usize) -> ExportResult<Vec<EnumCellValue>> {
    df.get_columns()
        .iter()
        .map(|col| {
            col.get(n_row)
                .map(derive_cell_value_from_any_value)
                .map_err(|err| {
                    ExportError::DataFrame(format!(
                        "failed to read row {n_row} of column {:?}: {err}",
                        col.name().as_str()
                    ))
                })
        })
        .collect()
}

/// Map a polars scalar onto the exporter's value union.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::UInt8(val) => EnumCellValue::Int32(val.into()),
        AnyValue::UInt16(val) => EnumCellValue::Int32(val.into()),
        AnyValue::UInt32(val) => EnumCellValue::Int64(val.into()),
        AnyValue::UInt64(val) => EnumCellValue::Float64(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Int32(val.into()),
        AnyValue::Int16(val) => EnumCellValue::Int32(val.into()),
        AnyValue::Int32(val) => EnumCellValue::Int32(val),
        AnyValue::Int64(val) => EnumCellValue::Int64(val),
        AnyValue::Float32(val) => EnumCellValue::Float32(val),
        AnyValue::Float64(val) => EnumCellValue::Float64(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}
