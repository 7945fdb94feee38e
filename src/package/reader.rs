//! Container parsing back into the grid + style model

use super::archive::ArchiveReader;
use super::styles::parse_styles;
use super::{worksheet_part, SHARED_STRINGS_PART, STYLES_PART, WORKBOOK_PART, WORKBOOK_RELS_PART};
use crate::address::{CellAddress, CellRange, MAX_COLS};
use crate::error::{ExcelError, Result};
use crate::grid::CellData;
use crate::sheet::{ColWidth, ColumnOptions, Sheet};
use crate::style::StyleRegistry;
use crate::types::{from_excel_serial, parse_iso_datetime, CellType, CellValue};
use crate::workbook::Workbook;
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use std::path::Path;

/// Largest integer an IEEE double holds exactly
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Read a container from disk into a [`Workbook`]
pub(crate) fn load(path: &Path) -> Result<Workbook> {
    let mut archive = ArchiveReader::open(path)?;
    tracing::trace!(parts = ?archive.part_names(), "container opened");

    let entries = parse_workbook(&archive.read_part(WORKBOOK_PART)?)?;
    if entries.is_empty() {
        return Err(ExcelError::format(WORKBOOK_PART, "workbook lists no sheets"));
    }
    let rels = match archive.read_optional(WORKBOOK_RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?,
        None => Vec::new(),
    };
    let target_of = |kind: &str, fallback: &str| {
        rels.iter()
            .find(|r| r.kind.ends_with(kind))
            .map(|r| resolve_target(&r.target))
            .unwrap_or_else(|| fallback.to_string())
    };

    let strings_part = target_of("/sharedStrings", SHARED_STRINGS_PART);
    let strings = match archive.read_optional(&strings_part)? {
        Some(xml) => parse_shared_strings(&xml, &strings_part)?,
        None => Vec::new(),
    };

    let styles_part = target_of("/styles", STYLES_PART);
    let mut styles = StyleRegistry::new();
    if let Some(xml) = archive.read_optional(&styles_part)? {
        let parsed = parse_styles(&xml)?;
        if !parsed.is_empty() {
            styles.clear();
            for style in parsed {
                styles.push_raw(style);
            }
        }
    }

    let mut sheets: IndexMap<String, Sheet> = IndexMap::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let part = entry
            .rel_id
            .as_deref()
            .and_then(|id| rels.iter().find(|r| r.id == id))
            .map(|r| resolve_target(&r.target))
            .unwrap_or_else(|| worksheet_part(i + 1));
        let xml = archive.read_part(&part)?;
        let sheet = WorksheetParser::new(&entry.name, &part, &strings, &styles).parse(&xml)?;
        if sheets.contains_key(&entry.name) {
            return Err(ExcelError::format(
                WORKBOOK_PART,
                format!("sheet '{}' is listed twice", entry.name),
            ));
        }
        sheets.insert(entry.name, sheet);
    }

    tracing::trace!(
        sheets = sheets.len(),
        shared_strings = strings.len(),
        styles = styles.len(),
        "container parsed"
    );
    Ok(Workbook::from_parts(sheets, styles))
}

struct SheetEntry {
    name: String,
    rel_id: Option<String>,
}

struct Relationship {
    id: String,
    kind: String,
    target: String,
}

/// Attribute value by local name
fn attr(e: &BytesStart<'_>, name: &[u8], part: &str) -> Result<Option<String>> {
    for a in e.attributes().with_checks(false) {
        let a = a.map_err(|err| ExcelError::format(part, err))?;
        if a.key.local_name().as_ref() == name {
            let value = a.unescape_value().map_err(|err| ExcelError::format(part, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn text(e: &BytesText<'_>, part: &str) -> Result<String> {
    Ok(e
        .unescape()
        .map_err(|err| ExcelError::format(part, err))?
        .into_owned())
}

/// Relationship targets are relative to `xl/` unless absolute
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn parse_workbook(xml: &[u8]) -> Result<Vec<SheetEntry>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut entries = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| ExcelError::format(WORKBOOK_PART, e))?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name", WORKBOOK_PART)?.ok_or_else(|| {
                    ExcelError::format(WORKBOOK_PART, "sheet element without a name")
                })?;
                entries.push(SheetEntry {
                    name,
                    rel_id: attr(&e, b"id", WORKBOOK_PART)?,
                });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}

fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>> {
    let part = WORKBOOK_RELS_PART;
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rels = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| ExcelError::format(part, e))?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id", part)?, attr(&e, b"Target", part)?)
                {
                    rels.push(Relationship {
                        id,
                        kind: attr(&e, b"Type", part)?.unwrap_or_default(),
                        target,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Plain text of every `<si>`, with rich-text runs concatenated and phonetic runs skipped
fn parse_shared_strings(xml: &[u8], part: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| ExcelError::format(part, e))?
        {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(e) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&text(&e, part)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Clone, Copy, PartialEq)]
enum Capture {
    Off,
    Value,
    InlineText,
}

/// Cell whose `<c>` element is open
struct PendingCell {
    row: u32,
    col: u32,
    style: Option<u32>,
    kind: Option<String>,
}

struct WorksheetParser<'a> {
    part: &'a str,
    strings: &'a [String],
    styles: &'a StyleRegistry,
    sheet: Sheet,
    row: u32,
    col: u32,
    cell: Option<PendingCell>,
    capture: Capture,
    in_inline: bool,
    in_phonetic: bool,
    raw: String,
}

impl<'a> WorksheetParser<'a> {
    fn new(name: &str, part: &'a str, strings: &'a [String], styles: &'a StyleRegistry) -> Self {
        WorksheetParser {
            part,
            strings,
            styles,
            sheet: Sheet::new(name),
            row: 0,
            col: 0,
            cell: None,
            capture: Capture::Off,
            in_inline: false,
            in_phonetic: false,
            raw: String::new(),
        }
    }

    fn parse(mut self, xml: &[u8]) -> Result<Sheet> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        loop {
            match reader
                .read_event_into(&mut buf)
                .map_err(|e| ExcelError::format(self.part, e))?
            {
                Event::Start(e) => self.start(&e, false)?,
                Event::Empty(e) => self.start(&e, true)?,
                Event::Text(e) if self.capture != Capture::Off && !self.in_phonetic => {
                    let chunk = text(&e, self.part)?;
                    self.raw.push_str(&chunk);
                }
                Event::End(e) => self.end(e.local_name().as_ref())?,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        tracing::trace!(
            sheet = self.sheet.name(),
            part = self.part,
            cells = self.sheet.grid.len(),
            merges = self.sheet.merges().len(),
            "worksheet parsed"
        );
        Ok(self.sheet)
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        match e.local_name().as_ref() {
            b"row" => {
                self.row = match attr(e, b"r", self.part)?.and_then(|r| r.trim().parse().ok()) {
                    Some(r) => r,
                    None => self.row + 1,
                };
                self.col = 0;
            }
            b"c" => {
                let (row, col) = match attr(e, b"r", self.part)?
                    .and_then(|r| r.parse::<CellAddress>().ok())
                {
                    Some(addr) => (addr.row, addr.col),
                    None => (self.row, self.col + 1),
                };
                self.row = row;
                self.col = col;
                let style = match attr(e, b"s", self.part)?.and_then(|s| s.trim().parse().ok()) {
                    None | Some(0) => None,
                    Some(index) if (index as usize) < self.styles.len() => Some(index),
                    Some(index) => {
                        tracing::warn!(
                            part = self.part,
                            row,
                            col,
                            style = index,
                            "cell references a style the file does not define"
                        );
                        None
                    }
                };
                self.raw.clear();
                self.cell = Some(PendingCell {
                    row,
                    col,
                    style,
                    kind: attr(e, b"t", self.part)?,
                });
                if empty {
                    self.finish_cell()?;
                }
            }
            b"v" if !empty && self.cell.is_some() => {
                self.raw.clear();
                self.capture = Capture::Value;
            }
            b"is" if !empty => self.in_inline = true,
            b"t" if !empty && self.in_inline => self.capture = Capture::InlineText,
            b"rPh" if !empty => self.in_phonetic = true,
            b"col" => self.column(e)?,
            b"mergeCell" => {
                if let Some(range) = attr(e, b"ref", self.part)?
                    .and_then(|r| r.parse::<CellRange>().ok())
                {
                    self.sheet.add_merge(range);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) -> Result<()> {
        match name {
            b"v" | b"t" => self.capture = Capture::Off,
            b"is" => self.in_inline = false,
            b"rPh" => self.in_phonetic = false,
            b"c" => self.finish_cell()?,
            _ => {}
        }
        Ok(())
    }

    fn column(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let min: u32 = attr(e, b"min", self.part)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let max: u32 = attr(e, b"max", self.part)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(min);
        if min == 0 {
            return Ok(());
        }
        let width = attr(e, b"width", self.part)?
            .and_then(|v| v.parse::<f64>().ok())
            .map(ColWidth::Fixed);
        let style = attr(e, b"style", self.part)?
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|s| *s != 0 && (*s as usize) < self.styles.len());
        if width.is_none() && style.is_none() {
            return Ok(());
        }
        for col in min..=max.min(MAX_COLS) {
            self.sheet.columns.insert(
                col,
                ColumnOptions {
                    width,
                    facets: Vec::new(),
                    style,
                },
            );
        }
        Ok(())
    }

    fn finish_cell(&mut self) -> Result<()> {
        let Some(cell) = self.cell.take() else {
            return Ok(());
        };
        self.capture = Capture::Off;
        let raw = std::mem::take(&mut self.raw);
        let value = self.decode(&cell, raw);
        if value.is_empty() && cell.style.is_none() {
            return Ok(());
        }
        let data = CellData {
            cell_type: CellType::of(&value),
            value,
            style: cell.style,
        };
        self.sheet
            .grid
            .set_raw(cell.row, cell.col, data)
            .map_err(|e| ExcelError::format(self.part, e))
    }

    fn decode(&self, cell: &PendingCell, raw: String) -> CellValue {
        match cell.kind.as_deref() {
            Some("s") => {
                let entry = raw
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.strings.get(i));
                match entry {
                    Some(s) if s.is_empty() => CellValue::Empty,
                    Some(s) => CellValue::String(s.clone()),
                    None => {
                        tracing::warn!(
                            part = self.part,
                            row = cell.row,
                            col = cell.col,
                            index = raw.as_str(),
                            "dangling shared string index"
                        );
                        CellValue::Empty
                    }
                }
            }
            Some("inlineStr") | Some("str") => {
                if raw.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::String(raw)
                }
            }
            Some("b") => CellValue::Bool(matches!(raw.trim(), "1" | "true")),
            Some("e") => CellValue::Error(raw),
            Some("d") => match parse_iso_datetime(raw.trim()) {
                Some(d) => CellValue::Date(d),
                None => CellValue::String(raw),
            },
            None | Some("n") => self.decode_number(cell, raw),
            Some(other) => {
                tracing::warn!(
                    part = self.part,
                    row = cell.row,
                    col = cell.col,
                    kind = other,
                    "unknown cell type, reading as text"
                );
                if raw.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::String(raw)
                }
            }
        }
    }

    fn decode_number(&self, cell: &PendingCell, raw: String) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        let is_date = cell
            .style
            .and_then(|s| self.styles.resolve(s).ok())
            .is_some_and(|style| style.number_format.is_date());
        if !is_date {
            if let Ok(i) = trimmed.parse::<i64>() {
                return CellValue::Int(i);
            }
        }
        match trimmed.parse::<f64>() {
            Ok(f) if is_date => from_excel_serial(f)
                .map(CellValue::Date)
                .unwrap_or(CellValue::Float(f)),
            Ok(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => CellValue::Int(f as i64),
            Ok(f) => CellValue::Float(f),
            Err(_) => CellValue::String(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{NumberFormat, StyleFacet};
    use chrono::NaiveDate;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cols><col min="2" max="3" width="18.5" customWidth="1"/></cols>
<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><v>4573</v></c><c r="C1" s="1"><v>61</v></c><c r="D1" t="b"><v>1</v></c></row>
<row r="2"><c t="inlineStr"><is><t>inline &amp; text</t></is></c><c><v>2.5</v></c><c t="s"><v>9</v></c><c t="e"><v>#DIV/0!</v></c></row>
<row r="4"><c r="C4" t="str"><v>Movie Character</v></c></row>
</sheetData>
<mergeCells count="1"><mergeCell ref="C4:D4"/></mergeCells>
</worksheet>"#;

    #[test]
    fn test_parse_worksheet() {
        let strings = vec!["James Bond".to_string()];
        let mut styles = StyleRegistry::new();
        styles
            .apply(None, &[StyleFacet::NumberFormat(NumberFormat::date())])
            .unwrap();

        let sheet = WorksheetParser::new("Data", "xl/worksheets/sheet1.xml", &strings, &styles)
            .parse(SHEET.as_bytes())
            .unwrap();
        let grid = sheet.grid();
        assert_eq!(grid.value(1, 1), &CellValue::String("James Bond".into()));
        assert_eq!(grid.value(1, 2), &CellValue::Int(4573));
        let date = NaiveDate::from_ymd_opt(1900, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(grid.value(1, 3), &CellValue::Date(date));
        assert_eq!(grid.value(1, 4), &CellValue::Bool(true));
        assert_eq!(grid.value(2, 1), &CellValue::String("inline & text".into()));
        assert_eq!(grid.value(2, 2), &CellValue::Float(2.5));
        assert!(grid.get_cell(2, 3).is_none());
        assert_eq!(grid.value(2, 4), &CellValue::Error("#DIV/0!".into()));
        assert_eq!(grid.value(4, 3), &CellValue::String("Movie Character".into()));
        assert_eq!(sheet.merges()[0].to_string(), "C4:D4");
        assert_eq!(
            sheet.column_options(3).unwrap().width,
            Some(ColWidth::Fixed(18.5))
        );
    }

    #[test]
    fn test_shared_strings_rich_text() {
        let xml = br#"<sst><si><t>plain</t></si><si><r><t>rich </t></r><r><t xml:space="preserve">text</t></r><rPh><t>skip</t></rPh></si><si/></sst>"#;
        let strings = parse_shared_strings(xml, SHARED_STRINGS_PART).unwrap();
        assert_eq!(strings, vec!["plain", "rich text", ""]);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("/xl/worksheets/a.xml"), "xl/worksheets/a.xml");
    }

    #[test]
    fn test_malformed_sheet_names_part() {
        let strings = Vec::new();
        let styles = StyleRegistry::new();
        let result = WorksheetParser::new("S", "xl/worksheets/sheet1.xml", &strings, &styles)
            .parse(b"<worksheet><sheetData><row></sheetData></worksheet>");
        match result {
            Err(ExcelError::InvalidFormat { part, .. }) => {
                assert_eq!(part, "xl/worksheets/sheet1.xml")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
