//! Integration tests for fastexcel

use fastexcel::reader::SheetRows;
use fastexcel::style::{BorderLineStyle, HorizontalAlign};
use fastexcel::{
    CellAddress, CellType, CellValue, ColWidth, ExcelError, ExcelReader, Record, Workbook,
    WorkbookBuilder,
};
use std::path::Path;
use tempfile::TempDir;

fn data_array() -> Vec<Record> {
    vec![
        Record::keyed([
            ("id", CellValue::Int(0)),
            ("integer", CellValue::Int(4573)),
            ("date", CellValue::from("1900-02-14")),
            ("name", CellValue::from("James Bond")),
        ]),
        Record::keyed([
            ("id", CellValue::Int(1)),
            ("integer", CellValue::Int(982630)),
            ("date", CellValue::from("2179-08-12")),
            ("name", CellValue::from("Ellen Louise Ripley")),
        ]),
        Record::keyed([
            ("id", CellValue::Int(2)),
            ("integer", CellValue::Int(7239)),
            ("date", CellValue::from("1753-01-31")),
            ("name", CellValue::from("Captain Jack Sparrow")),
        ]),
    ]
}

fn read(path: &Path) -> (ExcelReader, SheetRows) {
    assert!(path.exists());
    let reader = ExcelReader::open(path).unwrap();
    let cells = reader.read_rows(false, None, true).unwrap();
    (reader, cells)
}

/// Rendered value at a cell reference such as `"B7"`, `None` when absent or empty
fn value(cells: &SheetRows, cell: &str) -> Option<String> {
    let addr: CellAddress = cell.parse().unwrap();
    cells
        .get(&addr.row)
        .and_then(|row| row.get(&addr.column_letter()))
        .filter(|c| !c.value.is_empty())
        .map(|c| c.value.as_string())
}

fn values(cells: &SheetRows, refs: &[&str]) -> Vec<Option<String>> {
    refs.iter().map(|cell| value(cells, cell)).collect()
}

fn some(items: &[&str]) -> Vec<Option<String>> {
    items.iter().map(|s| Some(s.to_string())).collect()
}

fn storage() -> (TempDir, Workbook) {
    let dir = TempDir::new().unwrap();
    let book = WorkbookBuilder::new()
        .with_storage_dir(dir.path())
        .build()
        .unwrap();
    (dir, book)
}

#[test]
fn test_array() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test1.xlsx");

    let mut book = Workbook::create(&[]).unwrap();
    book.get_sheet(None).unwrap().write_data(data_array()).unwrap();
    book.save(&path).unwrap();

    let (_, cells) = read(&path);
    assert_eq!(
        values(&cells, &["A1", "B1", "C1", "D1"]),
        some(&["0", "4573", "1900-02-14", "James Bond"])
    );
}

#[test]
fn test_array_with_headers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test2.xlsx");

    let mut book = Workbook::create(&[]).unwrap();
    book.get_sheet(None)
        .unwrap()
        .with_headers(None)
        .write_data(data_array())
        .unwrap();
    book.save(&path).unwrap();

    let (_, cells) = read(&path);
    assert_eq!(
        values(&cells, &["A1", "B1", "C1", "D1"]),
        some(&["id", "integer", "date", "name"])
    );
    assert_eq!(
        values(&cells, &["A3", "B3", "C3", "D3"]),
        some(&["1", "982630", "2179-08-12", "Ellen Louise Ripley"])
    );
}

#[test]
fn test_dates_keep_their_type() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dates.xlsx");

    let mut book = Workbook::create(&[]).unwrap();
    book.get_sheet(None).unwrap().write_data(data_array()).unwrap();
    book.save(&path).unwrap();

    let reader = ExcelReader::open(&path).unwrap();
    let date = |y, m, d| {
        CellValue::Date(
            chrono::NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    };
    assert_eq!(reader.read_cell("Sheet1", 1, 3).unwrap(), date(1900, 2, 14));
    assert_eq!(reader.read_cell("Sheet1", 2, 3).unwrap(), date(2179, 8, 12));
    // Not representable as a serial date
    assert_eq!(
        reader.read_cell("Sheet1", 3, 3).unwrap(),
        CellValue::from("1753-01-31")
    );
    assert_eq!(reader.read_cell("Sheet1", 2, 2).unwrap(), CellValue::Int(982630));
}

#[test]
fn test_collection_with_headers() {
    let (_dir, mut book) = storage();

    book.get_sheet(None)
        .unwrap()
        .with_headers(Some(&["date", "name"][..]))
        .apply_font_style_bold()
        .apply_border("thin")
        .write_data(data_array())
        .unwrap();
    let saved = book.save_to("test4.xlsx").unwrap();

    let (reader, cells) = read(&saved);
    assert_eq!(
        values(&cells, &["A4", "B4", "C4", "D4"]),
        vec![
            Some("1753-01-31".to_string()),
            Some("Captain Jack Sparrow".to_string()),
            None,
            None
        ]
    );

    // Header row carries the row style, data rows do not
    let header = cells[&1]["A"].style.unwrap();
    let style = reader.get_complete_style_by_idx(header).unwrap();
    assert!(style.font.bold);
    assert_eq!(style.border.left.unwrap().style, BorderLineStyle::Thin);
    assert_eq!(style.border.bottom.unwrap().style, BorderLineStyle::Thin);
    assert_eq!(cells[&1]["B"].style, Some(header));
    assert_eq!(cells[&2]["B"].style, None);
}

#[test]
fn test_multiple_sheets() {
    let (_dir, mut book) = storage();

    book.make_sheet("Collection")
        .unwrap()
        .write_data(vec![
            Record::keyed([("id", CellValue::Int(1)), ("site", "google.com".into())]),
            Record::keyed([("id", CellValue::Int(2)), ("site.com", "youtube.com".into())]),
        ])
        .unwrap();
    book.make_sheet("Array")
        .unwrap()
        .write_data(vec![
            Record::keyed([("id", CellValue::Int(1)), ("name", "Helen".into())]),
            Record::keyed([("id", CellValue::Int(2)), ("name", "Peter".into())]),
        ])
        .unwrap();
    book.make_sheet("Callback")
        .unwrap()
        .write_data((1..=3i64).map(|i| [i, i * 2, i * 3]))
        .unwrap();
    let saved = book.save_to("test5.xlsx").unwrap();

    let mut reader = ExcelReader::open(&saved).unwrap();
    assert_eq!(
        reader.sheet_names(),
        vec!["Sheet1", "Collection", "Array", "Callback"]
    );

    reader.select_sheet("Collection").unwrap();
    let cells = reader.read_rows(false, None, true).unwrap();
    assert_eq!(value(&cells, "b2").as_deref(), Some("youtube.com"));

    reader.select_sheet("Array").unwrap();
    let cells = reader.read_rows(false, None, true).unwrap();
    assert_eq!(value(&cells, "b2").as_deref(), Some("Peter"));
    assert_eq!(cells.len(), 2);

    reader.select_sheet("Callback").unwrap();
    let cells = reader.read_rows(false, None, true).unwrap();
    assert_eq!(cells[&3]["C"].value, CellValue::Int(9));
}

#[test]
fn test_advanced() {
    let (_dir, mut book) = storage();

    {
        let mut sheet = book.get_sheet(None).unwrap();
        sheet.set_col_width("B", 12u32).unwrap();
        sheet
            .set_col_options("c", [("width", "12"), ("text-align", "center")])
            .unwrap();
        sheet.set_col_width("d", "auto").unwrap();

        let title = "This is demo of fastexcel";
        let area = sheet.begin_area();
        area.set_value("A2:D2", title)
            .apply_font_size(14.0)
            .apply_font_style_bold()
            .apply_text_center();
        area.set_value("a4:a5", "#")
            .set_value("b4:b5", "Number")
            .set_value("c4:d4", "Movie Character")
            .set_value("c5", "Birthday")
            .set_value("d5", "Name");
        area.with_range("a4:d5")
            .apply_bg_color("#ccc")
            .apply_font_style_bold()
            .apply_outer_border("thin")
            .apply_inner_border("thick")
            .apply_text_center();
        sheet.write_areas().unwrap();

        sheet.write_data(data_array()).unwrap();
    }
    let saved = book.save_to("test6.xlsx").unwrap();

    let (reader, cells) = read(&saved);
    assert_eq!(
        values(&cells, &["B7", "C7", "D7", "e7"]),
        vec![
            Some("982630".to_string()),
            Some("2179-08-12".to_string()),
            Some("Ellen Louise Ripley".to_string()),
            None
        ]
    );

    // Merge regions read back as single cells
    assert_eq!(value(&cells, "C4").as_deref(), Some("Movie Character"));
    assert_eq!(value(&cells, "D4"), None);
    assert_eq!(cells[&4]["C"].merge, Some("C4:D4".parse().unwrap()));
    assert_eq!(reader.merged_ranges("Sheet1").unwrap().len(), 4);

    // Outer edge thin, inner edge thick
    let corner = reader
        .get_complete_style_by_idx(cells[&4]["A"].style.unwrap())
        .unwrap();
    assert_eq!(corner.border.left.unwrap().style, BorderLineStyle::Thin);
    assert_eq!(corner.border.right.unwrap().style, BorderLineStyle::Thick);
    assert!(corner.fill.color.is_some());

    // Column C style applies to cells written after the option was set
    let birthday = reader
        .get_complete_style_by_idx(cells[&7]["C"].style.unwrap())
        .unwrap();
    assert_eq!(birthday.alignment.horizontal, Some(HorizontalAlign::Center));
    assert!(birthday.number_format.is_date());

    let sheet = reader.workbook().sheet("Sheet1").unwrap();
    assert_eq!(sheet.column_options(2).unwrap().width, Some(ColWidth::Fixed(12.0)));
    match sheet.column_options(4).unwrap().width {
        Some(ColWidth::Fixed(w)) => assert!(w > 12.0),
        other => panic!("auto width not resolved: {:?}", other),
    }
}

#[test]
fn test_identical_styles_share_one_index() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dedup.xlsx");

    let mut book = Workbook::create(&[]).unwrap();
    {
        let mut sheet = book.get_sheet(None).unwrap();
        sheet.write_row(["a", "b"]).unwrap();
        sheet
            .begin_area()
            .with_range("A1")
            .apply_font_style_bold()
            .apply_bg_color("FF0000")
            .with_range("B1")
            .apply_bg_color("#ff0000")
            .apply_font_style_bold();
    }
    book.save(&path).unwrap();

    let (_, cells) = read(&path);
    assert!(cells[&1]["A"].style.is_some());
    assert_eq!(cells[&1]["A"].style, cells[&1]["B"].style);
}

#[test]
fn test_reopen_and_save_preserves_content() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.xlsx");
    let second = dir.path().join("second.xlsx");

    let mut book = Workbook::create(&["Data"]).unwrap();
    {
        let mut sheet = book.get_sheet(None).unwrap();
        sheet.set_col_width("A", 30.0).unwrap();
        sheet.with_headers(None).apply_font_style_italic();
        sheet.write_data(data_array()).unwrap();
        sheet.begin_area().set_value("F1:G2", "note").apply_border("dashed");
    }
    book.save(&first).unwrap();

    let mut reopened = Workbook::open(&first).unwrap();
    reopened
        .get_sheet(Some("Data"))
        .unwrap()
        .set_cell("A10", "appended")
        .unwrap();
    reopened.save(&second).unwrap();

    let a = ExcelReader::open(&first).unwrap();
    let b = ExcelReader::open(&second).unwrap();
    let rows_a = a.read_rows(false, Some("Data"), true).unwrap();
    let rows_b = b.read_rows(false, Some("Data"), true).unwrap();

    for (row, cells) in &rows_a {
        for (col, cell) in cells {
            let other = &rows_b[row][col];
            assert_eq!(cell.value, other.value, "{}{}", col, row);
            assert_eq!(cell.merge, other.merge, "{}{}", col, row);
            let style_a = cell.style.map(|i| a.get_complete_style_by_idx(i).unwrap());
            let style_b = other.style.map(|i| b.get_complete_style_by_idx(i).unwrap());
            assert_eq!(style_a, style_b, "{}{}", col, row);
        }
    }
    assert_eq!(value(&rows_b, "A10").as_deref(), Some("appended"));
    assert_eq!(
        b.workbook().sheet("Data").unwrap().column_options(1).unwrap().width,
        Some(ColWidth::Fixed(30.0))
    );
}

#[test]
fn test_special_characters() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("special.xlsx");

    let texts = [
        "<tag> & \"quotes\" 'apostrophe'",
        "  leading and trailing  ",
        "line\nbreak\ttab",
        "Ünïcødé 日本語 🦀",
    ];
    let mut book = Workbook::create(&["Données"]).unwrap();
    book.get_sheet(None).unwrap().write_row(texts).unwrap();
    book.save(&path).unwrap();

    let reader = ExcelReader::open(&path).unwrap();
    assert_eq!(reader.sheet_names(), vec!["Données"]);
    let rows: Vec<_> = reader.rows("Données").unwrap().collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].to_strings(), texts);
}

#[test]
fn test_type_inference_policy() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("inference.xlsx");

    let mut book = Workbook::create(&[]).unwrap();
    book.get_sheet(None)
        .unwrap()
        .write_row(["42", "3.5", "007", "1.50", "2024-01-02 03:04:05", "true"])
        .unwrap();
    book.save(&path).unwrap();

    let reader = ExcelReader::open(&path).unwrap();
    let row = reader.rows("Sheet1").unwrap().next().unwrap();
    assert_eq!(row.get(0), Some(&CellValue::Int(42)));
    assert_eq!(row.get(1), Some(&CellValue::Float(3.5)));
    assert_eq!(row.get(2), Some(&CellValue::from("007")));
    assert_eq!(row.get(3), Some(&CellValue::from("1.50")));
    assert_eq!(
        row.get(4).and_then(|v| v.as_date()).map(|d| d.to_string()),
        Some("2024-01-02 03:04:05".to_string())
    );
    assert_eq!(row.get(5), Some(&CellValue::from("true")));
}

#[test]
fn test_large_dataset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("large.xlsx");

    let mut book = Workbook::create(&[]).unwrap();
    let written = book
        .get_sheet(None)
        .unwrap()
        .write_data((0..5_000i64).map(|i| {
            Record::keyed([
                ("id", CellValue::Int(i)),
                ("name", CellValue::from(format!("row-{}", i))),
                ("score", CellValue::Float(i as f64 / 4.0)),
            ])
        }))
        .unwrap();
    assert_eq!(written, 5_000);
    book.save(&path).unwrap();

    let reader = ExcelReader::open(&path).unwrap();
    assert_eq!(reader.dimensions("Sheet1").unwrap(), (5_000, 3));
    assert_eq!(
        reader.read_cell("Sheet1", 4_999, 2).unwrap(),
        CellValue::from("row-4998")
    );
}

#[test]
fn test_error_messages() {
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("missing.xlsx");
    assert!(matches!(
        ExcelReader::open(&missing),
        Err(ExcelError::IoError(_))
    ));

    let corrupt = dir.path().join("corrupt.xlsx");
    std::fs::write(&corrupt, b"definitely not a zip archive").unwrap();
    match Workbook::open(&corrupt) {
        Err(err @ ExcelError::InvalidFormat { .. }) => {
            assert!(err.to_string().contains("Invalid format"));
        }
        other => panic!("expected a format error, got {:?}", other.map(|_| ())),
    }

    let mut book = Workbook::create(&["Report"]).unwrap();
    assert!(matches!(
        book.make_sheet("report"),
        Err(ExcelError::DuplicateSheet(_))
    ));
    assert!(matches!(
        book.make_sheet("bad/name"),
        Err(ExcelError::InvalidSheetName { .. })
    ));
    let err = book.get_sheet(Some("Summary")).unwrap_err();
    assert!(err.is_lookup());
    assert!(err.to_string().contains("Available sheets: Report"));
    assert!(matches!(
        book.save_to("anywhere.xlsx"),
        Err(ExcelError::StorageNotConfigured)
    ));

    let unwritable = dir.path().join("no-such-dir").join("out.xlsx");
    assert!(matches!(
        book.save(&unwritable),
        Err(ExcelError::IoError(_))
    ));
}

#[test]
fn test_area_values_are_typed_like_row_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("area_values.xlsx");

    let mut book = Workbook::create(&[]).unwrap();
    {
        let mut sheet = book.get_sheet(None).unwrap();
        sheet.set_col_options("B", [("text-align", "center")]).unwrap();
        sheet.begin_area().set_value("A1:C1", "2024-05-01");
        sheet.begin_area().set_value("B3", "1979").apply_font_style_bold();
    }
    book.save(&path).unwrap();

    let (reader, cells) = read(&path);
    let released = &cells[&1]["A"];
    assert_eq!(released.cell_type, CellType::Date);
    assert_eq!(released.merge.map(|m| m.to_string()), Some("A1:C1".to_string()));
    let date_style = reader
        .get_complete_style_by_idx(released.style.unwrap())
        .unwrap();
    assert!(date_style.number_format.is_date());

    let year = &cells[&3]["B"];
    assert_eq!(year.value, CellValue::Int(1979));
    let style = reader.get_complete_style_by_idx(year.style.unwrap()).unwrap();
    assert_eq!(style.alignment.horizontal, Some(HorizontalAlign::Center));
    assert!(style.font.bold);
}

#[test]
fn test_control_characters_and_empty_strings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("controls.xlsx");

    let mut book = Workbook::create(&[]).unwrap();
    book.get_sheet(None)
        .unwrap()
        .write_row(["bell\u{7}ed", "", "tab\tkept"])
        .unwrap();
    book.save(&path).unwrap();

    let reader = ExcelReader::open(&path).unwrap();
    assert_eq!(
        reader.read_cell("Sheet1", 1, 1).unwrap(),
        CellValue::from("belled")
    );
    // an empty string has nothing to tell it apart from a blank cell once saved
    assert_eq!(reader.read_cell("Sheet1", 1, 2).unwrap(), CellValue::Empty);
    assert_eq!(
        reader.read_cell("Sheet1", 1, 3).unwrap(),
        CellValue::from("tab\tkept")
    );
}
