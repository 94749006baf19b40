//! Bounded row window.
//!
//! The most recent `row_window_size` rows stay editable in memory. Older rows
//! are handed, in row order, to a [`RowSink`]; the worksheet sink forwards
//! them to a constant-memory worksheet that spills to a temporary file.

use std::collections::{BTreeMap, VecDeque};

use rust_xlsxwriter::{Format, Note, Worksheet};
use tracing::trace;

use crate::convert::derive_excel_datetime;
use crate::error::{ExportError, ExportResult};
use crate::spec::{EnumCellContent, SpecStyleRef};
use crate::style::SpecStyleTable;
use crate::util::cast_row_num;

/// One resolved cell waiting in the window.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecBufferedCell {
    /// Resolved content.
    pub content: EnumCellContent,
    /// Style applied on flush.
    pub style: SpecStyleRef,
    /// Note attached to the cell.
    pub note: Option<String>,
}

/// One row waiting in the window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRowBuffer {
    /// Zero-based sheet row index.
    pub row_idx: u32,
    /// Row height in points.
    pub height: Option<f64>,
    /// Last column of a merge anchored at column 0.
    pub merge_col_last: Option<u16>,
    /// Cells by column.
    pub cells: BTreeMap<u16, SpecBufferedCell>,
}

/// Destination of rows leaving the window.
pub trait RowSink {
    fn write_row(&mut self, row: SpecRowBuffer) -> ExportResult<()>;
}

/// Fixed-capacity window over the most recent rows.
#[derive(Debug)]
pub struct RowWindow {
    n_rows_window_max: usize,
    l_rows: VecDeque<SpecRowBuffer>,
    n_row_next: u32,
}

impl RowWindow {
    pub fn new(n_rows_window_max: usize) -> Self {
        Self {
            n_rows_window_max,
            l_rows: VecDeque::with_capacity(n_rows_window_max.min(1024) + 1),
            n_row_next: 0,
        }
    }

    pub fn window_size(&self) -> usize {
        self.n_rows_window_max
    }

    /// Row cursor: number of rows appended so far.
    pub fn n_rows_total(&self) -> u32 {
        self.n_row_next
    }

    pub fn n_rows_buffered(&self) -> usize {
        self.l_rows.len()
    }

    /// Append a row at the cursor, evicting the oldest rows past capacity.
    pub fn push_row<S>(&mut self, height: Option<f64>, sink: &mut S) -> ExportResult<u32>
    where
        S: RowSink + ?Sized,
    {
        let n_row_idx = cast_row_num(self.n_row_next as usize)?;
        self.l_rows.push_back(SpecRowBuffer {
            row_idx: n_row_idx,
            height,
            ..Default::default()
        });
        self.n_row_next += 1;

        while self.l_rows.len() > self.n_rows_window_max {
            let Some(row) = self.l_rows.pop_front() else {
                break;
            };
            trace!(row_idx = row.row_idx, "evict row from window");
            sink.write_row(row)?;
        }
        Ok(n_row_idx)
    }

    /// Buffered row, or why it cannot be edited.
    pub fn row_mut(&mut self, row_idx: u32) -> ExportResult<&mut SpecRowBuffer> {
        if row_idx >= self.n_row_next {
            return Err(ExportError::InvalidState(format!(
                "row {row_idx} has not been added"
            )));
        }
        let n_window_size = self.n_rows_window_max;
        let n_row_first = self.first_buffered_row_idx().unwrap_or(self.n_row_next);
        if row_idx < n_row_first {
            return Err(ExportError::RowFlushed {
                row_idx,
                window_size: n_window_size,
            });
        }
        self.l_rows
            .get_mut((row_idx - n_row_first) as usize)
            .ok_or(ExportError::RowFlushed {
                row_idx,
                window_size: n_window_size,
            })
    }

    pub fn row(&self, row_idx: u32) -> Option<&SpecRowBuffer> {
        let n_row_first = self.first_buffered_row_idx()?;
        if row_idx < n_row_first {
            return None;
        }
        self.l_rows.get((row_idx - n_row_first) as usize)
    }

    pub fn first_buffered_row_idx(&self) -> Option<u32> {
        self.l_rows.front().map(|row| row.row_idx)
    }

    /// Hand every buffered row to `sink`; returns the number of rows flushed.
    pub fn flush_all<S>(&mut self, sink: &mut S) -> ExportResult<usize>
    where
        S: RowSink + ?Sized,
    {
        let mut n_flushed = 0;
        while let Some(row) = self.l_rows.pop_front() {
            sink.write_row(row)?;
            n_flushed += 1;
        }
        Ok(n_flushed)
    }

    /// Drop buffered rows without writing them; returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n_dropped = self.l_rows.len();
        self.l_rows.clear();
        n_dropped
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region WorksheetSink

/// Sink writing evicted rows into the export worksheet.
pub struct WorksheetRowSink<'a> {
    pub worksheet: &'a mut Worksheet,
    pub styles: &'a SpecStyleTable,
}

impl RowSink for WorksheetRowSink<'_> {
    fn write_row(&mut self, row: SpecRowBuffer) -> ExportResult<()> {
        let n_row_idx = row.row_idx;
        if let Some(height) = row.height {
            self.worksheet.set_row_height(n_row_idx, height)?;
        }

        for (n_col_idx, cell) in &row.cells {
            let format = self.styles.format(cell.style)?;
            match row.merge_col_last {
                Some(n_col_last) if *n_col_idx == 0 && n_col_last > 0 => {
                    let c_text = match &cell.content {
                        EnumCellContent::Text(val) => val.clone(),
                        EnumCellContent::Number(val) => val.to_string(),
                        EnumCellContent::Date(val) => val.format("%Y-%m-%d").to_string(),
                    };
                    self.worksheet
                        .merge_range(n_row_idx, 0, n_row_idx, n_col_last, &c_text, format)?;
                }
                _ => write_cell_content(
                    self.worksheet,
                    n_row_idx,
                    *n_col_idx,
                    &cell.content,
                    format,
                )?,
            }

            if let Some(c_note) = &cell.note {
                self.worksheet
                    .insert_note(n_row_idx, *n_col_idx, &Note::new(c_note.as_str()))?;
            }
        }
        Ok(())
    }
}

fn write_cell_content(
    worksheet: &mut Worksheet,
    row_idx: u32,
    col_idx: u16,
    content: &EnumCellContent,
    format: &Format,
) -> ExportResult<()> {
    match content {
        EnumCellContent::Text(val) if val.is_empty() => {
            worksheet.write_blank(row_idx, col_idx, format)?;
        }
        EnumCellContent::Text(val) => {
            worksheet.write_string_with_format(row_idx, col_idx, val, format)?;
        }
        EnumCellContent::Number(val) => {
            worksheet.write_number_with_format(row_idx, col_idx, *val, format)?;
        }
        EnumCellContent::Date(val) => {
            let datetime = derive_excel_datetime(val).map_err(ExportError::OutOfRange)?;
            worksheet.write_datetime_with_format(row_idx, col_idx, &datetime, format)?;
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
