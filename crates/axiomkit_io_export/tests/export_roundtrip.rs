use std::io::Cursor;

use axiomkit_io_export::{
    EnumCellValue, ExportError, SpecCellObject, SpecExportOptions, SpreadsheetExporter,
};
use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn open_xlsx(v_bytes: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
    open_workbook_from_rs(Cursor::new(v_bytes)).unwrap()
}

fn read_sheet(v_bytes: Vec<u8>, sheet: &str) -> calamine::Range<Data> {
    let mut workbook = open_xlsx(v_bytes);
    assert_eq!(workbook.sheet_names(), vec![sheet.to_string()]);
    workbook.worksheet_range(sheet).unwrap()
}

fn has_zip_entry(v_bytes: &[u8], name: &str) -> bool {
    v_bytes
        .windows(name.len())
        .any(|window| window == name.as_bytes())
}

fn cell(range: &calamine::Range<Data>, row: u32, col: u32) -> Data {
    range.get_value((row, col)).cloned().unwrap_or(Data::Empty)
}

#[test]
fn test_sales_export_reads_back() {
    let mut exporter =
        SpreadsheetExporter::new(Some("Sales"), &["Name", "Amount**in USD", "Date"]).unwrap();
    let row = exporter.add_row().unwrap();
    exporter.add_cell_with(row, 0, "Alice", 1, None).unwrap();
    exporter.add_cell(row, 1, 100.5).unwrap();
    exporter
        .add_cell(row, 2, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        .unwrap();
    let row = exporter.add_row().unwrap();
    exporter.add_cell(row, 0, "Bob").unwrap();
    exporter.add_cell(row, 1, EnumCellValue::None).unwrap();
    exporter.add_cell(row, 2, f64::INFINITY).unwrap();

    let mut v_bytes: Vec<u8> = Vec::new();
    exporter.write_to(&mut v_bytes).unwrap();
    exporter.dispose();

    assert!(has_zip_entry(&v_bytes, "xl/comments1.xml"));
    let mut workbook = open_xlsx(v_bytes.clone());
    workbook.load_merged_regions().unwrap();
    let l_merged: Vec<(String, (u32, u32), (u32, u32))> = workbook
        .merged_regions()
        .iter()
        .map(|(sheet, _, dims)| (sheet.clone(), dims.start, dims.end))
        .collect();
    assert_eq!(l_merged, vec![("Sales".to_string(), (0, 0), (0, 2))]);

    let range = read_sheet(v_bytes, "Sales");
    assert_eq!(range.height(), 4);
    assert_eq!(cell(&range, 0, 0), Data::String("Sales".to_string()));
    assert_eq!(cell(&range, 1, 0), Data::String("Name".to_string()));
    assert_eq!(cell(&range, 1, 1), Data::String("Amount".to_string()));
    assert_eq!(cell(&range, 2, 0), Data::String("Alice".to_string()));
    assert_eq!(cell(&range, 2, 1), Data::Float(100.5));
    match cell(&range, 2, 2) {
        Data::DateTime(val) => assert_eq!(val.as_f64(), 45352.0),
        other => panic!("expected a date cell, got {other:?}"),
    }
    assert_eq!(cell(&range, 3, 0), Data::String("Bob".to_string()));
    assert_eq!(cell(&range, 3, 1), Data::Empty);
    assert_eq!(cell(&range, 3, 2), Data::String("inf".to_string()));
}

#[test]
fn test_rows_beyond_window_keep_order() {
    let options = SpecExportOptions {
        row_window_size: 500,
        ..Default::default()
    };
    let mut exporter =
        SpreadsheetExporter::with_options(Some("Bulk"), &["Seq", "Label"], options).unwrap();
    let mut l_rows = Vec::new();
    for n in 0..1200_i64 {
        let row = exporter.add_row().unwrap();
        l_rows.push(row);
        exporter.add_cell(row, 0, n).unwrap();
        exporter.add_cell(row, 1, format!("row-{n}")).unwrap();
    }
    assert_eq!(exporter.n_rows(), 1202);
    assert_eq!(l_rows[0].row_idx(), 2);
    assert!(matches!(
        exporter.add_cell(l_rows[0], 0, "late"),
        Err(ExportError::RowFlushed { row_idx: 2, window_size: 500 })
    ));

    let mut v_bytes: Vec<u8> = Vec::new();
    exporter.write_to(&mut v_bytes).unwrap();

    let range = read_sheet(v_bytes, "Bulk");
    assert_eq!(range.height(), 1202);
    for n in [0_u32, 1, 499, 500, 777, 1199] {
        assert_eq!(cell(&range, n + 2, 0), Data::Float(f64::from(n)));
        assert_eq!(cell(&range, n + 2, 1), Data::String(format!("row-{n}")));
    }
}

#[test]
fn test_in_memory_worksheet_matches_spilled_output() {
    let options = SpecExportOptions {
        row_window_size: 2,
        if_spill_to_disk: false,
        ..Default::default()
    };
    let mut exporter = SpreadsheetExporter::with_options(None, &["Code"], options).unwrap();
    for c_code in ["A1", "B2", "C3", "D4"] {
        let row = exporter.add_row().unwrap();
        exporter.add_cell(row, 0, c_code).unwrap();
    }
    let mut v_bytes: Vec<u8> = Vec::new();
    exporter.write_to(&mut v_bytes).unwrap();

    let range = read_sheet(v_bytes, "Export");
    let l_codes: Vec<Data> = (1..5).map(|n| cell(&range, n, 0)).collect();
    assert_eq!(
        l_codes,
        ["A1", "B2", "C3", "D4"]
            .iter()
            .map(|val| Data::String(val.to_string()))
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_custom_type_without_converter_uses_display_text() {
    struct Sku(u32);
    impl std::fmt::Display for Sku {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "SKU-{:05}", self.0)
        }
    }

    let mut exporter = SpreadsheetExporter::new(Some("Items"), &["Sku"]).unwrap();
    let row = exporter.add_row().unwrap();
    exporter.add_cell(row, 0, SpecCellObject::new(Sku(42))).unwrap();

    let mut v_bytes: Vec<u8> = Vec::new();
    exporter.write_to(&mut v_bytes).unwrap();
    let range = read_sheet(v_bytes, "Items");
    assert_eq!(cell(&range, 2, 0), Data::String("SKU-00042".to_string()));
}

#[test]
fn test_write_to_file_and_missing_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.xlsx");

    let mut exporter = SpreadsheetExporter::new(Some("Report"), &["A"]).unwrap();
    let row = exporter.add_row().unwrap();
    exporter.add_cell(row, 0, 1).unwrap();
    exporter.write_to_file(&path).unwrap();
    exporter.dispose();

    let range = read_sheet(std::fs::read(&path).unwrap(), "Report");
    assert_eq!(cell(&range, 2, 0), Data::Float(1.0));

    let mut exporter = SpreadsheetExporter::new(Some("Report"), &["A"]).unwrap();
    let result = exporter.write_to_file(dir.path().join("missing").join("report.xlsx"));
    assert!(matches!(result, Err(ExportError::NotFound { .. })));
}

#[test]
fn test_saved_file_survives_repeated_dispose() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sales.xlsx");

    let mut exporter =
        SpreadsheetExporter::new(Some("Sales"), &["Name", "Amount**in USD"]).unwrap();
    let row = exporter.add_row().unwrap();
    exporter.add_cell(row, 0, "Alice").unwrap();
    exporter.add_cell(row, 1, 100.5).unwrap();
    exporter.write_to_file(&path).unwrap();
    let v_saved = std::fs::read(&path).unwrap();

    exporter.dispose();
    exporter.dispose();
    assert!(exporter.is_disposed());

    let v_after = std::fs::read(&path).unwrap();
    assert_eq!(v_after, v_saved);
    assert!(has_zip_entry(&v_after, "xl/comments1.xml"));

    let range = read_sheet(v_after, "Sales");
    assert_eq!(range.height(), 3);
    assert_eq!(cell(&range, 1, 1), Data::String("Amount".to_string()));
    assert_eq!(cell(&range, 2, 0), Data::String("Alice".to_string()));
    assert_eq!(cell(&range, 2, 1), Data::Float(100.5));
}

#[test]
fn test_write_to_seekable_reads_back() {
    let mut exporter = SpreadsheetExporter::new(None, &["Seq"]).unwrap();
    for n in 0..3 {
        let row = exporter.add_row().unwrap();
        exporter.add_cell(row, 0, n).unwrap();
    }
    let mut cursor = Cursor::new(Vec::new());
    exporter.write_to_seekable(&mut cursor).unwrap();

    let range = read_sheet(cursor.into_inner(), "Export");
    assert_eq!(range.height(), 4);
    assert_eq!(cell(&range, 3, 0), Data::Float(2.0));
}
