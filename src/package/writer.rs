//! Workbook serialization into the container

use super::archive::ArchiveWriter;
use super::shared_strings::SharedStrings;
use super::styles::StyleTable;
use super::xml_writer::XmlWriter;
use super::{
    worksheet_part, APP_PART, CONTENT_TYPES_PART, CORE_PART, NS_MAIN, NS_REL, ROOT_RELS_PART,
    SHARED_STRINGS_PART, STYLES_PART, WORKBOOK_PART, WORKBOOK_RELS_PART, XML_DECLARATION,
};
use crate::address::{column_letter, push_column_letter};
use crate::config::ExcelConfig;
use crate::error::{ExcelError, Result};
use crate::grid::CellData;
use crate::sheet::{ColWidth, Sheet};
use crate::style::StyleRegistry;
use crate::types::{to_excel_serial, CellValue};
use crate::workbook::Workbook;
use std::io::Write;
use std::path::Path;

/// Write every part of `book` into a new archive at `path`
pub(crate) fn write_workbook(book: &Workbook, path: &Path) -> Result<()> {
    if book.sheets.is_empty() {
        return Err(ExcelError::SerializationError(
            "a workbook needs at least one sheet".to_string(),
        ));
    }
    let mut archive = ArchiveWriter::create(path, book.config.compression_level)?;
    let mut strings = SharedStrings::new();

    for (i, sheet) in book.sheets.values().enumerate() {
        archive.start_part(&worksheet_part(i + 1))?;
        let mut w = XmlWriter::new(&mut archive);
        let ctx = SheetContext {
            styles: &book.styles,
            config: &book.config,
            selected: i == 0,
        };
        write_worksheet(&mut w, sheet, &ctx, &mut strings)?;
    }

    archive.start_part(SHARED_STRINGS_PART)?;
    strings.write_xml(&mut XmlWriter::new(&mut archive))?;

    archive.start_part(STYLES_PART)?;
    StyleTable::build(&book.styles).write_xml(&mut XmlWriter::new(&mut archive))?;

    let sheet_count = book.sheets.len();
    archive.write_part(CONTENT_TYPES_PART, content_types_xml(sheet_count).as_bytes())?;
    archive.write_part(ROOT_RELS_PART, ROOT_RELS_XML.as_bytes())?;
    archive.write_part(APP_PART, APP_XML.as_bytes())?;
    archive.write_part(CORE_PART, core_xml().as_bytes())?;

    archive.start_part(WORKBOOK_PART)?;
    write_workbook_xml(&mut XmlWriter::new(&mut archive), book)?;
    archive.write_part(WORKBOOK_RELS_PART, workbook_rels_xml(sheet_count).as_bytes())?;

    archive.finish()?;
    tracing::trace!(
        sheets = sheet_count,
        shared_strings = strings.count(),
        styles = book.styles.len(),
        "container written"
    );
    Ok(())
}

struct SheetContext<'a> {
    styles: &'a StyleRegistry,
    config: &'a ExcelConfig,
    selected: bool,
}

impl SheetContext<'_> {
    /// Style attribute value, or an error for indices the registry does not hold
    fn style_attr(&self, style: Option<u32>, at: &dyn Fn() -> String) -> Result<Option<u32>> {
        match style {
            None | Some(0) => Ok(None),
            Some(index) if (index as usize) < self.styles.len() => Ok(Some(index)),
            Some(index) => Err(ExcelError::SerializationError(format!(
                "{} references style {} but the registry holds {} styles",
                at(),
                index,
                self.styles.len()
            ))),
        }
    }
}

fn write_worksheet<W: Write>(
    w: &mut XmlWriter<W>,
    sheet: &Sheet,
    ctx: &SheetContext<'_>,
    strings: &mut SharedStrings,
) -> Result<()> {
    let grid = sheet.grid();
    w.declaration()?;
    w.start_element("worksheet")?;
    w.attribute("xmlns", NS_MAIN)?;
    w.attribute("xmlns:r", NS_REL)?;
    w.close_start_tag()?;

    w.start_element("dimension")?;
    match grid.dimension() {
        Some(range) => w.attribute("ref", &range.to_string())?,
        None => w.attribute("ref", "A1")?,
    }
    w.close_empty()?;

    w.write_str("<sheetViews><sheetView")?;
    if ctx.selected {
        w.attribute("tabSelected", "1")?;
    }
    w.write_str(" workbookViewId=\"0\"/></sheetViews>")?;
    w.write_str("<sheetFormatPr defaultRowHeight=\"15\"/>")?;

    write_cols(w, sheet, ctx)?;

    if grid.is_empty() {
        w.empty_element("sheetData")?;
    } else {
        w.write_str("<sheetData>")?;
        let mut reference = Vec::with_capacity(16);
        for (row, cells) in grid.rows() {
            w.start_element("row")?;
            w.attribute_int("r", row)?;
            w.close_start_tag()?;
            for (&col, cell) in cells {
                reference.clear();
                push_column_letter(&mut reference, col);
                reference.extend_from_slice(itoa::Buffer::new().format(row).as_bytes());
                write_cell(w, &reference, cell, ctx, strings)?;
            }
            w.end_element("row")?;
        }
        w.end_element("sheetData")?;
    }

    let merges = sheet.merges();
    if !merges.is_empty() {
        w.start_element("mergeCells")?;
        w.attribute_int("count", merges.len())?;
        w.close_start_tag()?;
        for range in merges {
            w.start_element("mergeCell")?;
            w.attribute("ref", &range.to_string())?;
            w.close_empty()?;
        }
        w.end_element("mergeCells")?;
    }

    w.write_str(
        "<pageMargins left=\"0.7\" right=\"0.7\" top=\"0.75\" bottom=\"0.75\" header=\"0.3\" footer=\"0.3\"/>",
    )?;
    w.end_element("worksheet")?;
    w.flush()
}

fn write_cols<W: Write>(w: &mut XmlWriter<W>, sheet: &Sheet, ctx: &SheetContext<'_>) -> Result<()> {
    let mut opened = false;
    for (&col, options) in &sheet.columns {
        let width = match options.width {
            Some(ColWidth::Fixed(width)) => Some(width),
            Some(ColWidth::Auto) => sheet
                .grid()
                .column(col)
                .map(|(_, cell)| rendered_len(&cell.value))
                .max()
                .filter(|len| *len > 0)
                .map(|len| ctx.config.auto_width(len)),
            None => None,
        };
        let style = ctx.style_attr(options.style, &|| {
            format!("column {}", column_letter(col))
        })?;
        if width.is_none() && style.is_none() {
            continue;
        }
        if !opened {
            w.write_str("<cols>")?;
            opened = true;
        }
        w.start_element("col")?;
        w.attribute_int("min", col)?;
        w.attribute_int("max", col)?;
        if let Some(width) = width {
            w.attribute_f64("width", width)?;
            w.attribute("customWidth", "1")?;
        }
        if let Some(style) = style {
            w.attribute_int("style", style)?;
        }
        w.close_empty()?;
    }
    if opened {
        w.end_element("cols")?;
    }
    Ok(())
}

/// Characters a value takes when displayed with its default format
fn rendered_len(value: &CellValue) -> usize {
    value.as_string().chars().count()
}

fn write_cell<W: Write>(
    w: &mut XmlWriter<W>,
    reference: &[u8],
    cell: &CellData,
    ctx: &SheetContext<'_>,
    strings: &mut SharedStrings,
) -> Result<()> {
    let style = ctx.style_attr(cell.style, &|| {
        format!("cell {}", String::from_utf8_lossy(reference))
    })?;
    if cell.value.is_empty() && style.is_none() {
        return Ok(());
    }

    w.write_raw(b"<c r=\"")?;
    w.write_raw(reference)?;
    w.write_raw(b"\"")?;
    if let Some(style) = style {
        w.attribute_int("s", style)?;
    }

    match &cell.value {
        CellValue::Empty => w.close_empty()?,
        CellValue::String(s) => write_shared(w, strings, s)?,
        CellValue::Int(i) => {
            w.write_raw(b"><v>")?;
            w.write_int(*i)?;
            w.write_raw(b"</v></c>")?;
        }
        CellValue::Float(f) if f.is_finite() => {
            w.write_raw(b"><v>")?;
            w.write_str(&f.to_string())?;
            w.write_raw(b"</v></c>")?;
        }
        CellValue::Float(_) => w.write_raw(b" t=\"e\"><v>#NUM!</v></c>")?,
        CellValue::Bool(b) => {
            w.write_raw(b" t=\"b\"><v>")?;
            w.write_raw(if *b { b"1" } else { b"0" })?;
            w.write_raw(b"</v></c>")?;
        }
        CellValue::Date(d) => match to_excel_serial(d) {
            Some(serial) => {
                w.write_raw(b"><v>")?;
                w.write_str(&serial.to_string())?;
                w.write_raw(b"</v></c>")?;
            }
            None => write_shared(w, strings, &cell.value.as_string())?,
        },
        CellValue::Error(e) => {
            w.write_raw(b" t=\"e\"><v>")?;
            w.write_escaped(e)?;
            w.write_raw(b"</v></c>")?;
        }
    }
    Ok(())
}

fn write_shared<W: Write>(w: &mut XmlWriter<W>, strings: &mut SharedStrings, s: &str) -> Result<()> {
    w.write_raw(b" t=\"s\"><v>")?;
    w.write_int(strings.add_string(s))?;
    w.write_raw(b"</v></c>")
}

fn write_workbook_xml<W: Write>(w: &mut XmlWriter<W>, book: &Workbook) -> Result<()> {
    w.declaration()?;
    w.start_element("workbook")?;
    w.attribute("xmlns", NS_MAIN)?;
    w.attribute("xmlns:r", NS_REL)?;
    w.close_start_tag()?;
    w.write_str("<bookViews><workbookView activeTab=\"0\"/></bookViews>")?;
    w.write_str("<sheets>")?;
    for (i, name) in book.sheets.keys().enumerate() {
        w.start_element("sheet")?;
        w.attribute("name", name)?;
        w.attribute_int("sheetId", i + 1)?;
        w.attribute("r:id", &format!("rId{}", i + 1))?;
        w.close_empty()?;
    }
    w.write_str("</sheets>")?;
    w.end_element("workbook")?;
    w.flush()
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"
<Override PartName="/{}" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            worksheet_part(i)
        ));
    }
    xml.push_str("\n</Types>");
    xml
}

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>fastexcel</Application>
</Properties>"#;

fn core_xml() -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"{}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:creator>fastexcel</dc:creator>
<dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>
<dcterms:modified xsi:type="dcterms:W3CDTF">{}</dcterms:modified>
</cp:coreProperties>"#,
        XML_DECLARATION, now, now
    )
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"
<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i, i
        ));
    }
    xml.push_str(&format!(
        r#"
<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#,
        sheet_count + 1,
        sheet_count + 2
    ));
    xml
}
