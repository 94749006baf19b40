//! Streaming single-sheet XLSX exporter.

use std::io::{ErrorKind, Seek, Write};
use std::path::Path;

use indexmap::IndexMap;
use polars::prelude::DataFrame;
use rust_xlsxwriter::{Workbook, XlsxError};
use tracing::{debug, info, trace, warn};

use crate::conf::{
    C_KEY_DICT_TYPE, N_HEIGHT_ROW_HEADER, N_HEIGHT_ROW_TITLE, derive_default_export_options,
    derive_default_export_styles,
};
use crate::convert::{CellConverterRegistry, LabelResolver, resolve_cell_content};
use crate::download::{DownloadResponse, apply_download_headers};
use crate::error::{ExportError, ExportResult};
use crate::frame::derive_row_values;
use crate::spec::{
    EnumCellAlign, EnumCellContent, EnumCellValue, EnumStyleKey, SpecCellHandle, SpecExportOptions,
    SpecExportReport, SpecHeader, SpecRowHandle, SpecStyleRef,
};
use crate::style::SpecStyleTable;
use crate::util::{
    cast_col_num, convert_width_units_to_chars, derive_column_width_units, is_blank,
    parse_headers, sanitize_sheet_name,
};
use crate::window::{RowWindow, SpecBufferedCell, SpecRowBuffer, WorksheetRowSink};

/// Single-use exporter: construct, append rows, write, dispose.
///
/// Only the most recent `row_window_size` rows are held by the exporter;
/// older rows are handed to the worksheet, which (with `if_spill_to_disk`)
/// keeps them in a temporary file until the workbook is serialized. Dropping
/// the exporter releases the same resources as [`Self::dispose`].
pub struct SpreadsheetExporter {
    workbook: Option<Workbook>,
    styles: SpecStyleTable,
    window: RowWindow,
    registry: CellConverterRegistry,
    label_resolver: Option<Box<dyn LabelResolver>>,
    options: SpecExportOptions,
    sheet_name: String,
    l_headers: Vec<SpecHeader>,
    l_width_units_by_col: Vec<u32>,
    report: SpecExportReport,
}

impl SpreadsheetExporter {
    /// Create an exporter with default options.
    ///
    /// A blank `title` means no title row.
    pub fn new<S: AsRef<str>>(title: Option<&str>, headers: &[S]) -> ExportResult<Self> {
        Self::with_options(title, headers, derive_default_export_options())
    }

    /// Create an exporter and write the title and header rows.
    pub fn with_options<S: AsRef<str>>(
        title: Option<&str>,
        headers: &[S],
        options: SpecExportOptions,
    ) -> ExportResult<Self> {
        let l_headers = parse_headers(headers)?;
        if options.row_window_size == 0 {
            return Err(ExportError::Configuration(
                "row_window_size must be >= 1".to_string(),
            ));
        }

        let c_title = title.filter(|val| !is_blank(val));
        let sheet_name = sanitize_sheet_name(
            c_title.unwrap_or(options.sheet_name_default.as_str()),
            "_",
            &options.sheet_name_default,
        );

        let mut workbook = Workbook::new();
        let worksheet = if options.if_spill_to_disk {
            workbook.add_worksheet_with_constant_memory()
        } else {
            workbook.add_worksheet()
        };
        worksheet.set_name(&sheet_name)?;

        let l_width_units_by_col: Vec<u32> = l_headers
            .iter()
            .map(|header| derive_column_width_units(&header.label))
            .collect();
        for (n_idx_col, n_width_units) in l_width_units_by_col.iter().enumerate() {
            worksheet.set_column_width(
                cast_col_num(n_idx_col)?,
                convert_width_units_to_chars(*n_width_units),
            )?;
        }

        let mut exporter = Self {
            workbook: Some(workbook),
            styles: SpecStyleTable::build(derive_default_export_styles()),
            window: RowWindow::new(options.row_window_size),
            registry: CellConverterRegistry::new(),
            label_resolver: None,
            options,
            sheet_name,
            l_headers,
            l_width_units_by_col,
            report: SpecExportReport::default(),
        };

        let n_col_last = cast_col_num(exporter.l_headers.len() - 1)?;
        if let Some(c_title) = c_title {
            let n_row_idx = exporter.push_row(Some(N_HEIGHT_ROW_TITLE))?;
            let row = exporter.window.row_mut(n_row_idx)?;
            row.merge_col_last = Some(n_col_last);
            row.cells.insert(
                0,
                SpecBufferedCell {
                    content: EnumCellContent::Text(c_title.to_string()),
                    style: SpecStyleRef::plain(EnumStyleKey::Title),
                    note: None,
                },
            );
        }

        let n_row_idx = exporter.push_row(Some(N_HEIGHT_ROW_HEADER))?;
        let row = exporter.window.row_mut(n_row_idx)?;
        for (n_idx_col, header) in exporter.l_headers.iter().enumerate() {
            row.cells.insert(
                cast_col_num(n_idx_col)?,
                SpecBufferedCell {
                    content: EnumCellContent::Text(header.label.clone()),
                    style: SpecStyleRef::plain(EnumStyleKey::Header),
                    note: header.note.clone(),
                },
            );
        }

        debug!(
            sheet = %exporter.sheet_name,
            n_cols = exporter.l_headers.len(),
            "Initialize success."
        );
        Ok(exporter)
    }

    ////////////////////////////////////////////////////////////////////////////
    // #region Configuration

    /// Register a converter for values of type `T`, keyed by `type_name`.
    pub fn register_converter<T, F>(
        &mut self,
        type_name: impl Into<String>,
        converter: F,
    ) -> &mut Self
    where
        T: std::any::Any,
        F: Fn(&T) -> Result<String, String> + Send + Sync + 'static,
    {
        self.registry.register::<T, F>(type_name, converter);
        self
    }

    /// Mutable access to the converter registry.
    pub fn converters_mut(&mut self) -> &mut CellConverterRegistry {
        &mut self.registry
    }

    /// Install the dictionary label resolver used by [`Self::set_data_list`].
    pub fn set_label_resolver(&mut self, resolver: impl LabelResolver + 'static) -> &mut Self {
        self.label_resolver = Some(Box::new(resolver));
        self
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region RowAppend

    /// Append a row at the cursor.
    pub fn add_row(&mut self) -> ExportResult<SpecRowHandle> {
        let n_row_idx = self.push_row(None)?;
        Ok(SpecRowHandle { row_idx: n_row_idx })
    }

    /// Append a cell with the `data` style and no type hint.
    pub fn add_cell(
        &mut self,
        row: SpecRowHandle,
        column: usize,
        value: impl Into<EnumCellValue>,
    ) -> ExportResult<SpecCellHandle> {
        self.add_cell_with(row, column, value, 0, None)
    }

    /// Append a cell.
    ///
    /// `align` is `1` left, `2` center, `3` right; anything else uses `data`.
    /// `type_hint` selects the registered converter for non-native values.
    /// Values that cannot be written natively degrade to text; only structural
    /// problems (disposed exporter, flushed row, column past Excel's limit)
    /// are returned as errors.
    pub fn add_cell_with(
        &mut self,
        row: SpecRowHandle,
        column: usize,
        value: impl Into<EnumCellValue>,
        align: i32,
        type_hint: Option<&str>,
    ) -> ExportResult<SpecCellHandle> {
        self.ensure_open()?;
        let n_col_idx = cast_col_num(column)?;
        let value: EnumCellValue = value.into();

        let content = match resolve_cell_content(&value, type_hint, &self.registry) {
            Ok(content) => content,
            Err(degraded) => {
                info!(
                    "Set cell value [{},{}] error: {}",
                    row.row_idx, n_col_idx, degraded.reason
                );
                self.report.cnt_cells_degraded += 1;
                self.report.warn(format!(
                    "cell [{},{}] written as text: {}",
                    row.row_idx, n_col_idx, degraded.reason
                ));
                degraded.content
            }
        };

        let style = SpecStyleRef {
            key: EnumCellAlign::from_code(align).style_key(),
            if_date: matches!(content, EnumCellContent::Date(_)),
        };
        self.window.row_mut(row.row_idx)?.cells.insert(
            n_col_idx,
            SpecBufferedCell {
                content,
                style,
                note: None,
            },
        );
        self.report.cnt_cells += 1;

        Ok(SpecCellHandle {
            row_idx: row.row_idx,
            col_idx: n_col_idx,
            style,
        })
    }

    /// Append one row per record, one cell per entry in insertion order.
    ///
    /// When a record carries a non-blank `dict_type` and a label resolver is
    /// installed, the other entries are replaced by their resolved labels; a
    /// failed lookup writes an empty cell.
    pub fn set_data_list(
        &mut self,
        records: &[IndexMap<String, EnumCellValue>],
    ) -> ExportResult<&mut Self> {
        for record in records {
            let row = self.add_row()?;
            let c_dict_type = match record.get(C_KEY_DICT_TYPE) {
                Some(EnumCellValue::String(val)) if !is_blank(val) => Some(val.clone()),
                _ => None,
            };

            let mut l_logged = Vec::with_capacity(record.len());
            for (n_idx_col, (c_key, value)) in record.iter().enumerate() {
                let value = match (&c_dict_type, &self.label_resolver) {
                    (Some(c_dict_type), Some(resolver)) if c_key != C_KEY_DICT_TYPE => {
                        match resolver.resolve_label(&value.to_string(), c_dict_type) {
                            Ok(label) => EnumCellValue::String(label),
                            Err(err) => {
                                info!("Resolve label {c_key:?} in {c_dict_type:?} failed: {err}");
                                EnumCellValue::String(String::new())
                            }
                        }
                    }
                    _ => value.clone(),
                };
                l_logged.push(value.to_string());
                self.add_cell(row, n_idx_col, value)?;
            }
            debug!("Write success: [{}] {}", row.row_idx, l_logged.join(", "));
        }
        Ok(self)
    }

    /// Append one row per DataFrame row, one cell per column.
    pub fn set_data_frame(&mut self, df: &DataFrame) -> ExportResult<&mut Self> {
        for n_row in 0..df.height() {
            let l_values = derive_row_values(df, n_row)?;
            let row = self.add_row()?;
            for (n_idx_col, value) in l_values.into_iter().enumerate() {
                self.add_cell(row, n_idx_col, value)?;
            }
        }
        debug!(n_rows = df.height(), "DataFrame rows appended");
        Ok(self)
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Output

    /// Flush buffered rows and serialize the workbook into `sink`.
    ///
    /// For sinks that cannot seek: the compressed workbook is assembled in
    /// memory before the first byte reaches `sink`. Files and other seekable
    /// sinks go through [`Self::write_to_file`] or [`Self::write_to_seekable`],
    /// which stream the archive.
    pub fn write_to<W>(&mut self, sink: &mut W) -> ExportResult<&mut Self>
    where
        W: Write + ?Sized,
    {
        let workbook = self.flush_window()?;
        let v_buffer = workbook.save_to_buffer()?;
        debug!(n_bytes = v_buffer.len(), "Workbook serialized.");
        sink.write_all(&v_buffer)?;
        sink.flush()?;
        Ok(self)
    }

    /// Flush buffered rows and stream the workbook into a seekable `sink`.
    pub fn write_to_seekable<W>(&mut self, sink: &mut W) -> ExportResult<&mut Self>
    where
        W: Write + Seek + Send,
    {
        let workbook = self.flush_window()?;
        workbook.save_to_writer(&mut *sink)?;
        sink.flush()?;
        debug!("Workbook serialized.");
        Ok(self)
    }

    /// Flush buffered rows and save the workbook to `path`.
    pub fn write_to_file(&mut self, path: impl AsRef<Path>) -> ExportResult<&mut Self> {
        self.ensure_open()?;
        let path = path.as_ref();
        if let Some(dir_parent) = path.parent()
            && !dir_parent.as_os_str().is_empty()
            && !dir_parent.is_dir()
        {
            return Err(ExportError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let workbook = self.flush_window()?;
        workbook.save(path).map_err(|err| match err {
            XlsxError::IoError(err) if err.kind() == ErrorKind::NotFound => {
                ExportError::NotFound {
                    path: path.to_path_buf(),
                }
            }
            err => ExportError::Xlsx(err),
        })?;
        debug!(path = %path.display(), "Workbook saved.");
        Ok(self)
    }

    /// Write the workbook as an attachment download.
    ///
    /// The response body cannot seek, so this goes through the buffered
    /// [`Self::write_to`].
    pub fn write_as_download<R>(
        &mut self,
        response: &mut R,
        file_name: &str,
        user_agent: Option<&str>,
    ) -> ExportResult<&mut Self>
    where
        R: DownloadResponse + ?Sized,
    {
        self.ensure_open()?;
        response.reset();
        apply_download_headers(
            response,
            file_name,
            user_agent,
            &self.options.download_policy,
        )?;
        self.write_to(response.body())
    }

    /// Release the workbook and its temporary storage. Idempotent.
    pub fn dispose(&mut self) -> &mut Self {
        let n_rows_dropped = self.window.clear();
        if n_rows_dropped > 0 {
            warn!(n_rows_dropped, "dispose discarded rows that were never written");
        }
        if self.workbook.take().is_some() {
            debug!(sheet = %self.sheet_name, "Disposed workbook.");
        }
        self
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Accessors

    pub fn is_disposed(&self) -> bool {
        self.workbook.is_none()
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn headers(&self) -> &[SpecHeader] {
        &self.l_headers
    }

    /// Number of columns fixed by the header list.
    pub fn n_cols(&self) -> usize {
        self.l_headers.len()
    }

    /// Row cursor: rows appended so far, title and header included.
    pub fn n_rows(&self) -> u32 {
        self.window.n_rows_total()
    }

    /// Header column widths in width units (1/256 character).
    pub fn column_width_units(&self) -> &[u32] {
        &self.l_width_units_by_col
    }

    pub fn styles(&self) -> &SpecStyleTable {
        &self.styles
    }

    pub fn options(&self) -> &SpecExportOptions {
        &self.options
    }

    /// Snapshot of the export report.
    pub fn report(&self) -> SpecExportReport {
        self.report.clone()
    }

    /// Row still held in the window.
    pub fn peek_row(&self, row_idx: u32) -> Option<&SpecRowBuffer> {
        self.window.row(row_idx)
    }

    /// Cell still held in the window.
    pub fn peek_cell(&self, row_idx: u32, col_idx: u16) -> Option<&SpecBufferedCell> {
        self.window.row(row_idx)?.cells.get(&col_idx)
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////

    fn ensure_open(&self) -> ExportResult<()> {
        if self.workbook.is_none() {
            return Err(ExportError::InvalidState(
                "exporter used after dispose()".to_string(),
            ));
        }
        Ok(())
    }

    /// Hand every buffered row to the worksheet.
    fn flush_window(&mut self) -> ExportResult<&mut Workbook> {
        let workbook = self.workbook.as_mut().ok_or_else(|| {
            ExportError::InvalidState("exporter used after dispose()".to_string())
        })?;
        let mut row_sink = WorksheetRowSink {
            worksheet: workbook.worksheet_from_index(0)?,
            styles: &self.styles,
        };
        let n_rows_flushed = self.window.flush_all(&mut row_sink)?;
        trace!(n_rows_flushed, "window flushed");
        Ok(workbook)
    }

    fn push_row(&mut self, height: Option<f64>) -> ExportResult<u32> {
        let workbook = self.workbook.as_mut().ok_or_else(|| {
            ExportError::InvalidState("exporter used after dispose()".to_string())
        })?;
        let mut row_sink = WorksheetRowSink {
            worksheet: workbook.worksheet_from_index(0)?,
            styles: &self.styles,
        };
        let n_row_idx = self.window.push_row(height, &mut row_sink)?;
        self.report.cnt_rows += 1;
        Ok(n_row_idx)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use polars::prelude::df;

    use super::*;
    use crate::spec::SpecCellObject;

    fn derive_sales_exporter() -> SpreadsheetExporter {
        SpreadsheetExporter::new(Some("Sales"), &["Name", "Amount**in USD", "Date"]).unwrap()
    }

    #[test]
    fn test_initialize_writes_title_and_header_rows() {
        let exporter = derive_sales_exporter();

        assert_eq!(exporter.sheet_name(), "Sales");
        assert_eq!(exporter.n_cols(), 3);
        assert_eq!(exporter.n_rows(), 2);

        let row_title = exporter.peek_row(0).unwrap();
        assert_eq!(row_title.height, Some(N_HEIGHT_ROW_TITLE));
        assert_eq!(row_title.merge_col_last, Some(2));
        assert_eq!(
            row_title.cells[&0].content,
            EnumCellContent::Text("Sales".to_string())
        );

        let row_header = exporter.peek_row(1).unwrap();
        assert_eq!(row_header.height, Some(N_HEIGHT_ROW_HEADER));
        assert_eq!(
            row_header.cells[&1].content,
            EnumCellContent::Text("Amount".to_string())
        );
        assert_eq!(row_header.cells[&1].note.as_deref(), Some("in USD"));
        assert_eq!(row_header.cells[&0].note, None);
        assert_eq!(
            row_header.cells[&2].style,
            SpecStyleRef::plain(EnumStyleKey::Header)
        );
        assert_eq!(exporter.column_width_units(), &[3000, 3072, 3000]);
    }

    #[test]
    fn test_blank_title_skips_title_row() {
        let exporter = SpreadsheetExporter::new(Some("  "), &["A"]).unwrap();
        assert_eq!(exporter.sheet_name(), "Export");
        assert_eq!(exporter.n_rows(), 1);
        assert_eq!(exporter.peek_row(0).unwrap().height, Some(N_HEIGHT_ROW_HEADER));

        let exporter = SpreadsheetExporter::new(None, &["A"]).unwrap();
        assert_eq!(exporter.n_rows(), 1);
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let l_headers: [&str; 0] = [];
        assert!(matches!(
            SpreadsheetExporter::new(Some("T"), &l_headers),
            Err(ExportError::Configuration(_))
        ));

        let options = SpecExportOptions {
            row_window_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            SpreadsheetExporter::with_options(None, &["A"], options),
            Err(ExportError::Configuration(_))
        ));
    }

    #[test]
    fn test_add_cell_dispatches_by_value_and_alignment() {
        let mut exporter = derive_sales_exporter();
        let row = exporter.add_row().unwrap();
        assert_eq!(row.row_idx, 2);

        let cell = exporter.add_cell_with(row, 0, "Alice", 1, None).unwrap();
        assert_eq!(cell.style, SpecStyleRef::plain(EnumStyleKey::DataLeft));
        let cell = exporter.add_cell_with(row, 1, 100.5, 3, None).unwrap();
        assert_eq!(cell.style, SpecStyleRef::plain(EnumStyleKey::DataRight));
        let cell = exporter
            .add_cell(row, 2, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .unwrap();
        assert_eq!(
            cell.style,
            SpecStyleRef {
                key: EnumStyleKey::Data,
                if_date: true
            }
        );
        let cell = exporter.add_cell_with(row, 3, 7, 9, None).unwrap();
        assert_eq!(cell.style.key, EnumStyleKey::Data);

        assert_eq!(
            exporter.peek_cell(2, 1).unwrap().content,
            EnumCellContent::Number(100.5)
        );
        assert_eq!(
            exporter.peek_cell(2, 2).unwrap().content,
            EnumCellContent::Date(
                NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
        );
        assert_eq!(exporter.report().cnt_cells, 4);
        assert_eq!(exporter.report().cnt_cells_degraded, 0);
    }

    #[test]
    fn test_add_cell_degrades_instead_of_failing() {
        let mut exporter = SpreadsheetExporter::new(None, &["A", "B", "C"]).unwrap();
        let row = exporter.add_row().unwrap();

        exporter.add_cell(row, 0, f64::NAN).unwrap();
        exporter
            .add_cell(row, 1, NaiveDate::from_ymd_opt(1850, 1, 1).unwrap())
            .unwrap();
        exporter.add_cell(row, 2, EnumCellValue::None).unwrap();

        assert_eq!(
            exporter.peek_cell(1, 0).unwrap().content,
            EnumCellContent::Text("NaN".to_string())
        );
        assert_eq!(
            exporter.peek_cell(1, 1).unwrap().content,
            EnumCellContent::Text("1850-01-01".to_string())
        );
        assert_eq!(
            exporter.peek_cell(1, 2).unwrap().content,
            EnumCellContent::Text(String::new())
        );
        let report = exporter.report();
        assert_eq!(report.cnt_cells_degraded, 2);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_registered_converter_and_unregistered_fallback() {
        #[derive(Debug)]
        struct Money(i64);
        impl std::fmt::Display for Money {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "Money({})", self.0)
            }
        }

        let mut exporter = SpreadsheetExporter::new(None, &["A", "B", "C"]).unwrap();
        exporter.register_converter::<Money, _>("Money", |val| {
            Ok(format!("${}.{:02}", val.0 / 100, val.0 % 100))
        });
        exporter.register_converter::<bool, _>("bool", |val| {
            Ok(if *val { "Yes" } else { "No" }.to_string())
        });

        let row = exporter.add_row().unwrap();
        exporter
            .add_cell(row, 0, SpecCellObject::new(Money(1250)))
            .unwrap();
        exporter
            .add_cell_with(
                row,
                1,
                SpecCellObject::new(Money(5)),
                0,
                Some("UnknownType"),
            )
            .unwrap();
        exporter.add_cell(row, 2, true).unwrap();

        assert_eq!(
            exporter.peek_cell(1, 0).unwrap().content,
            EnumCellContent::Text("$12.50".to_string())
        );
        assert_eq!(
            exporter.peek_cell(1, 1).unwrap().content,
            EnumCellContent::Text("Money(5)".to_string())
        );
        assert_eq!(
            exporter.peek_cell(1, 2).unwrap().content,
            EnumCellContent::Text("Yes".to_string())
        );
    }

    #[test]
    fn test_rows_past_window_are_flushed() {
        let options = SpecExportOptions {
            row_window_size: 3,
            ..Default::default()
        };
        let mut exporter = SpreadsheetExporter::with_options(None, &["N"], options).unwrap();
        let row_first = exporter.add_row().unwrap();
        exporter.add_cell(row_first, 0, 0).unwrap();
        for n in 1..10 {
            let row = exporter.add_row().unwrap();
            exporter.add_cell(row, 0, n).unwrap();
        }

        assert_eq!(exporter.n_rows(), 11);
        assert!(exporter.peek_row(row_first.row_idx).is_none());
        assert!(matches!(
            exporter.add_cell(row_first, 0, 1),
            Err(ExportError::RowFlushed { row_idx: 1, .. })
        ));
        assert_eq!(
            exporter.peek_cell(10, 0).unwrap().content,
            EnumCellContent::Number(9.0)
        );

        let mut v_buffer: Vec<u8> = Vec::new();
        exporter.write_to(&mut v_buffer).unwrap();
        assert!(v_buffer.starts_with(b"PK"));
    }

    #[test]
    fn test_set_data_list_resolves_dictionary_labels() {
        let mut exporter = SpreadsheetExporter::new(None, &["Status", "Type"]).unwrap();
        exporter.set_label_resolver(|value: &str, dict_type: &str| match (dict_type, value) {
            ("order_status", "1") => Ok("Paid".to_string()),
            _ => Err(format!("no label for {value}")),
        });

        let mut dict_resolved: IndexMap<String, EnumCellValue> = IndexMap::new();
        dict_resolved.insert("status".to_string(), "1".into());
        dict_resolved.insert("dict_type".to_string(), "order_status".into());

        let mut dict_missing: IndexMap<String, EnumCellValue> = IndexMap::new();
        dict_missing.insert("status".to_string(), "9".into());
        dict_missing.insert("dict_type".to_string(), "order_status".into());

        let mut dict_plain: IndexMap<String, EnumCellValue> = IndexMap::new();
        dict_plain.insert("status".to_string(), 1.into());

        exporter
            .set_data_list(&[dict_resolved, dict_missing, dict_plain])
            .unwrap();

        assert_eq!(exporter.n_rows(), 4);
        assert_eq!(
            exporter.peek_cell(1, 0).unwrap().content,
            EnumCellContent::Text("Paid".to_string())
        );
        assert_eq!(
            exporter.peek_cell(1, 1).unwrap().content,
            EnumCellContent::Text("order_status".to_string())
        );
        assert_eq!(
            exporter.peek_cell(2, 0).unwrap().content,
            EnumCellContent::Text(String::new())
        );
        assert_eq!(
            exporter.peek_cell(3, 0).unwrap().content,
            EnumCellContent::Number(1.0)
        );
    }

    #[test]
    fn test_set_data_frame_appends_rows() {
        let df_data = df!(
            "name" => ["Alice", "Bob"],
            "qty" => [3_i64, 4],
        )
        .unwrap();
        let mut exporter = SpreadsheetExporter::new(None, &["Name", "Qty"]).unwrap();
        exporter.set_data_frame(&df_data).unwrap();

        assert_eq!(exporter.n_rows(), 3);
        assert_eq!(
            exporter.peek_cell(2, 0).unwrap().content,
            EnumCellContent::Text("Bob".to_string())
        );
        assert_eq!(
            exporter.peek_cell(2, 1).unwrap().content,
            EnumCellContent::Number(4.0)
        );
    }

    #[test]
    fn test_dispose_is_idempotent_and_blocks_further_use() {
        let mut exporter = derive_sales_exporter();
        let row = exporter.add_row().unwrap();

        exporter.dispose();
        assert!(exporter.is_disposed());
        exporter.dispose();

        assert!(matches!(exporter.add_row(), Err(ExportError::InvalidState(_))));
        assert!(matches!(
            exporter.add_cell(row, 0, "x"),
            Err(ExportError::InvalidState(_))
        ));
        let mut v_buffer: Vec<u8> = Vec::new();
        assert!(matches!(
            exporter.write_to(&mut v_buffer),
            Err(ExportError::InvalidState(_))
        ));
        assert!(v_buffer.is_empty());
    }

    #[test]
    fn test_write_to_seekable_drains_window_into_archive() {
        let mut exporter = derive_sales_exporter();
        let row = exporter.add_row().unwrap();
        let cell = exporter.add_cell_with(row, 1, 100.5, 2, None).unwrap();
        assert_eq!((cell.row_idx(), cell.col_idx()), (row.row_idx(), 1));
        assert_eq!(cell.style().key, EnumStyleKey::DataCenter);

        let mut cursor = std::io::Cursor::new(Vec::new());
        exporter.write_to_seekable(&mut cursor).unwrap();

        assert!(cursor.get_ref().starts_with(b"PK"));
        assert!(exporter.peek_row(row.row_idx()).is_none());
        assert!(exporter.peek_row(0).is_none());
    }

    #[test]
    fn test_write_as_download_sets_headers_and_body() {
        let mut exporter = derive_sales_exporter();
        let row = exporter.add_row().unwrap();
        exporter.add_cell(row, 0, "Alice").unwrap();

        let mut response = http::Response::new(Vec::new());
        exporter
            .write_as_download(&mut response, "sales report.xlsx", None)
            .unwrap();

        assert_eq!(
            response.headers()[http::header::CONTENT_DISPOSITION],
            "attachment; filename=sales%20report.xlsx"
        );
        assert!(response.body().starts_with(b"PK"));
    }
}
