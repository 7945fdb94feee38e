//! `xl/styles.xml`: style table writer and parser
//!
//! Registry descriptors are split into deduplicated font, fill, border and
//! number-format tables; one `cellXfs` entry is written per registry index so
//! that a cell's `s` attribute is exactly its registry index.

use super::xml_writer::XmlWriter;
use super::{NS_MAIN, STYLES_PART};
use crate::error::{ExcelError, Result};
use crate::style::{
    Alignment, Border, BorderEdge, BorderLineStyle, Color, Edge, Fill, Font, FontSize,
    HorizontalAlign, NumberFormat, Style, StyleRegistry, VerticalAlign,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::Write;

const DEFAULT_FONT_NAME: &str = "Calibri";
const DEFAULT_FONT_POINTS: f64 = 11.0;
/// First id available for custom number formats
const FIRST_CUSTOM_NUM_FMT: u32 = 164;

/// Indices of one `cellXfs` record
struct XfRecord<'a> {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: &'a Alignment,
}

/// Deduplicated component tables for one registry
pub(crate) struct StyleTable<'a> {
    num_fmts: Vec<(u32, &'a str)>,
    fonts: Vec<&'a Font>,
    /// Solid fill colours; fill id is position + 2 (0 = none, 1 = gray125)
    fills: Vec<Color>,
    borders: Vec<&'a Border>,
    xfs: Vec<XfRecord<'a>>,
}

impl<'a> StyleTable<'a> {
    pub(crate) fn build(registry: &'a StyleRegistry) -> Self {
        let mut font_map: HashMap<&Font, usize> = HashMap::new();
        let mut fill_map: HashMap<Color, usize> = HashMap::new();
        let mut border_map: HashMap<&Border, usize> = HashMap::new();
        let mut fmt_map: HashMap<&str, u32> = HashMap::new();

        let mut table = StyleTable {
            num_fmts: Vec::new(),
            fonts: Vec::new(),
            fills: Vec::new(),
            borders: Vec::new(),
            xfs: Vec::with_capacity(registry.len()),
        };
        // The first font and border are the defaults every xf falls back to.
        static DEFAULT_FONT: Font = Font {
            bold: false,
            italic: false,
            underline: false,
            size: None,
            color: None,
            name: None,
        };
        static DEFAULT_BORDER: Border = Border {
            left: None,
            right: None,
            top: None,
            bottom: None,
        };
        table.fonts.push(&DEFAULT_FONT);
        font_map.insert(&DEFAULT_FONT, 0);
        table.borders.push(&DEFAULT_BORDER);
        border_map.insert(&DEFAULT_BORDER, 0);

        for style in registry.iter() {
            let font_id = *font_map.entry(&style.font).or_insert_with(|| {
                table.fonts.push(&style.font);
                table.fonts.len() - 1
            });
            let fill_id = match style.fill.color {
                None => 0,
                Some(color) => *fill_map.entry(color).or_insert_with(|| {
                    table.fills.push(color);
                    table.fills.len() + 1
                }),
            };
            let border_id = *border_map.entry(&style.border).or_insert_with(|| {
                table.borders.push(&style.border);
                table.borders.len() - 1
            });
            let num_fmt_id = match &style.number_format {
                NumberFormat::General => 0,
                NumberFormat::Builtin(id) => *id,
                NumberFormat::Custom(code) => *fmt_map.entry(code.as_str()).or_insert_with(|| {
                    let id = FIRST_CUSTOM_NUM_FMT + table.num_fmts.len() as u32;
                    table.num_fmts.push((id, code.as_str()));
                    id
                }),
            };
            table.xfs.push(XfRecord {
                num_fmt_id,
                font_id,
                fill_id,
                border_id,
                alignment: &style.alignment,
            });
        }
        table
    }

    pub(crate) fn write_xml<W: Write>(&self, w: &mut XmlWriter<W>) -> Result<()> {
        w.declaration()?;
        w.start_element("styleSheet")?;
        w.attribute("xmlns", NS_MAIN)?;
        w.close_start_tag()?;

        if !self.num_fmts.is_empty() {
            w.start_element("numFmts")?;
            w.attribute_int("count", self.num_fmts.len())?;
            w.close_start_tag()?;
            for (id, code) in &self.num_fmts {
                w.start_element("numFmt")?;
                w.attribute_int("numFmtId", *id)?;
                w.attribute("formatCode", code)?;
                w.close_empty()?;
            }
            w.end_element("numFmts")?;
        }

        w.start_element("fonts")?;
        w.attribute_int("count", self.fonts.len())?;
        w.close_start_tag()?;
        for font in &self.fonts {
            write_font(w, font)?;
        }
        w.end_element("fonts")?;

        w.start_element("fills")?;
        w.attribute_int("count", self.fills.len() + 2)?;
        w.close_start_tag()?;
        w.write_str("<fill><patternFill patternType=\"none\"/></fill>")?;
        w.write_str("<fill><patternFill patternType=\"gray125\"/></fill>")?;
        for color in &self.fills {
            w.write_str("<fill><patternFill patternType=\"solid\"><fgColor")?;
            w.attribute("rgb", &color.argb_hex())?;
            w.write_str("/><bgColor indexed=\"64\"/></patternFill></fill>")?;
        }
        w.end_element("fills")?;

        w.start_element("borders")?;
        w.attribute_int("count", self.borders.len())?;
        w.close_start_tag()?;
        for border in &self.borders {
            write_border(w, border)?;
        }
        w.end_element("borders")?;

        w.write_str(
            "<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>",
        )?;

        w.start_element("cellXfs")?;
        w.attribute_int("count", self.xfs.len())?;
        w.close_start_tag()?;
        for xf in &self.xfs {
            write_xf(w, xf)?;
        }
        w.end_element("cellXfs")?;

        w.write_str(
            "<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>",
        )?;
        w.write_str("<dxfs count=\"0\"/>")?;
        w.end_element("styleSheet")?;
        w.flush()
    }
}

fn write_font<W: Write>(w: &mut XmlWriter<W>, font: &Font) -> Result<()> {
    w.write_str("<font>")?;
    if font.bold {
        w.empty_element("b")?;
    }
    if font.italic {
        w.empty_element("i")?;
    }
    if font.underline {
        w.empty_element("u")?;
    }
    let points = font.size.map(|s| s.points()).unwrap_or(DEFAULT_FONT_POINTS);
    w.start_element("sz")?;
    w.attribute_f64("val", points)?;
    w.close_empty()?;
    if let Some(color) = font.color {
        w.start_element("color")?;
        w.attribute("rgb", &color.argb_hex())?;
        w.close_empty()?;
    }
    w.start_element("name")?;
    w.attribute("val", font.name.as_deref().unwrap_or(DEFAULT_FONT_NAME))?;
    w.close_empty()?;
    w.write_str("<family val=\"2\"/>")?;
    w.end_element("font")
}

fn write_border<W: Write>(w: &mut XmlWriter<W>, border: &Border) -> Result<()> {
    w.write_str("<border>")?;
    for (edge, tag) in Edge::ALL.iter().zip(["left", "right", "top", "bottom"]) {
        match border.edge(*edge) {
            None => w.empty_element(tag)?,
            Some(line) => {
                w.start_element(tag)?;
                w.attribute("style", line.style.as_str())?;
                match line.color {
                    Some(color) => {
                        w.close_start_tag()?;
                        w.start_element("color")?;
                        w.attribute("rgb", &color.argb_hex())?;
                        w.close_empty()?;
                        w.end_element(tag)?;
                    }
                    None => {
                        w.close_start_tag()?;
                        w.write_str("<color auto=\"1\"/>")?;
                        w.end_element(tag)?;
                    }
                }
            }
        }
    }
    w.write_str("<diagonal/></border>")
}

fn write_xf<W: Write>(w: &mut XmlWriter<W>, xf: &XfRecord<'_>) -> Result<()> {
    w.start_element("xf")?;
    w.attribute_int("numFmtId", xf.num_fmt_id)?;
    w.attribute_int("fontId", xf.font_id)?;
    w.attribute_int("fillId", xf.fill_id)?;
    w.attribute_int("borderId", xf.border_id)?;
    w.attribute_int("xfId", 0u32)?;
    if xf.num_fmt_id != 0 {
        w.attribute("applyNumberFormat", "1")?;
    }
    if xf.font_id != 0 {
        w.attribute("applyFont", "1")?;
    }
    if xf.fill_id != 0 {
        w.attribute("applyFill", "1")?;
    }
    if xf.border_id != 0 {
        w.attribute("applyBorder", "1")?;
    }
    let alignment = xf.alignment;
    if alignment.is_default() {
        return w.close_empty();
    }
    w.attribute("applyAlignment", "1")?;
    w.close_start_tag()?;
    w.start_element("alignment")?;
    if let Some(h) = alignment.horizontal {
        w.attribute("horizontal", h.as_str())?;
    }
    if let Some(v) = alignment.vertical {
        w.attribute("vertical", v.as_str())?;
    }
    if alignment.wrap_text {
        w.attribute("wrapText", "1")?;
    }
    w.close_empty()?;
    w.end_element("xf")
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

#[derive(Default)]
struct RawXf {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Alignment,
}

fn fmt_err(e: impl std::fmt::Display) -> ExcelError {
    ExcelError::format(STYLES_PART, e)
}

/// Attribute value by local name
fn attr(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for a in e.attributes().with_checks(false) {
        let a = a.map_err(fmt_err)?;
        if a.key.local_name().as_ref() == name {
            return Ok(Some(a.unescape_value().map_err(fmt_err)?.into_owned()));
        }
    }
    Ok(None)
}

/// `<b/>`, `<b val="1"/>` and `<b val="true"/>` are on; `val="0"`/`"false"`/`"none"` are off
fn flag_on(e: &BytesStart<'_>) -> Result<bool> {
    Ok(!matches!(
        attr(e, b"val")?.as_deref(),
        Some("0") | Some("false") | Some("none")
    ))
}

fn rgb_color(e: &BytesStart<'_>) -> Result<Option<Color>> {
    Ok(attr(e, b"rgb")?.and_then(|v| v.parse::<Color>().ok()))
}

fn parse_id<T: std::str::FromStr + Default>(e: &BytesStart<'_>, name: &[u8]) -> Result<T> {
    Ok(attr(e, name)?
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default())
}

/// Accumulates the component tables while walking the style sheet
#[derive(Default)]
struct StyleSheetParser {
    section: Option<Section>,
    num_fmts: HashMap<u32, String>,
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<Border>,
    xfs: Vec<RawXf>,

    font: Font,
    fill: Fill,
    solid: bool,
    border: Border,
    edge: Option<(Edge, BorderEdge)>,
    xf: Option<RawXf>,
}

impl StyleSheetParser {
    fn start(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        let name = e.local_name();
        let section = match name.as_ref() {
            b"numFmts" => Some(Section::NumFmts),
            b"fonts" => Some(Section::Fonts),
            b"fills" => Some(Section::Fills),
            b"borders" => Some(Section::Borders),
            b"cellXfs" => Some(Section::CellXfs),
            b"cellStyleXfs" | b"dxfs" => None,
            _ => {
                return match self.section {
                    Some(section) => self.element(section, e, empty),
                    None => Ok(()),
                }
            }
        };
        if !empty {
            self.section = section;
        }
        Ok(())
    }

    fn element(&mut self, section: Section, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        match (section, e.local_name().as_ref()) {
            (Section::NumFmts, b"numFmt") => {
                let id: u32 = parse_id(e, b"numFmtId")?;
                if let Some(code) = attr(e, b"formatCode")? {
                    self.num_fmts.insert(id, code);
                }
            }

            (Section::Fonts, b"font") => {
                self.font = Font::default();
                if empty {
                    self.fonts.push(Font::default());
                }
            }
            (Section::Fonts, b"b") => self.font.bold = flag_on(e)?,
            (Section::Fonts, b"i") => self.font.italic = flag_on(e)?,
            (Section::Fonts, b"u") => self.font.underline = flag_on(e)?,
            (Section::Fonts, b"sz") => {
                if let Some(points) = attr(e, b"val")?.and_then(|v| v.parse::<f64>().ok()) {
                    self.font.size = Some(FontSize::from_points(points));
                }
            }
            (Section::Fonts, b"color") => self.font.color = rgb_color(e)?,
            (Section::Fonts, b"name") => self.font.name = attr(e, b"val")?,

            (Section::Fills, b"fill") => {
                self.fill = Fill::default();
                self.solid = false;
                if empty {
                    self.fills.push(Fill::default());
                }
            }
            (Section::Fills, b"patternFill") => {
                self.solid = attr(e, b"patternType")?.as_deref() == Some("solid");
            }
            (Section::Fills, b"fgColor") if self.solid => self.fill.color = rgb_color(e)?,

            (Section::Borders, b"border") => {
                self.border = Border::default();
                if empty {
                    self.borders.push(Border::default());
                }
            }
            (Section::Borders, side) if edge_of(side).is_some() => {
                let line = attr(e, b"style")?
                    .and_then(|s| s.parse::<BorderLineStyle>().ok())
                    .map(BorderEdge::from);
                self.edge = edge_of(side).zip(line);
                if empty {
                    set_edge(&mut self.border, self.edge.take());
                }
            }
            (Section::Borders, b"color") => {
                if let Some((_, line)) = self.edge.as_mut() {
                    line.color = rgb_color(e)?;
                }
            }

            (Section::CellXfs, b"xf") => {
                let record = RawXf {
                    num_fmt_id: parse_id(e, b"numFmtId")?,
                    font_id: parse_id(e, b"fontId")?,
                    fill_id: parse_id(e, b"fillId")?,
                    border_id: parse_id(e, b"borderId")?,
                    alignment: Alignment::default(),
                };
                if empty {
                    self.xfs.push(record);
                } else {
                    self.xf = Some(record);
                }
            }
            (Section::CellXfs, b"alignment") => {
                if let Some(record) = self.xf.as_mut() {
                    record.alignment = parse_alignment(e)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) {
        let Some(section) = self.section else {
            return;
        };
        match (section, name) {
            (_, b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs") => self.section = None,
            (Section::Fonts, b"font") => self.fonts.push(std::mem::take(&mut self.font)),
            (Section::Fills, b"fill") => self.fills.push(std::mem::take(&mut self.fill)),
            (Section::Borders, b"border") => self.borders.push(std::mem::take(&mut self.border)),
            (Section::Borders, side) if edge_of(side).is_some() => {
                set_edge(&mut self.border, self.edge.take())
            }
            (Section::CellXfs, b"xf") => {
                if let Some(record) = self.xf.take() {
                    self.xfs.push(record);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Vec<Style> {
        let StyleSheetParser {
            num_fmts,
            fonts,
            fills,
            borders,
            xfs,
            ..
        } = self;
        xfs.into_iter()
            .map(|raw| Style {
                font: fonts
                    .get(raw.font_id)
                    .cloned()
                    .map(normalize_font)
                    .unwrap_or_default(),
                fill: fills.get(raw.fill_id).cloned().unwrap_or_default(),
                border: borders.get(raw.border_id).cloned().unwrap_or_default(),
                alignment: raw.alignment,
                number_format: match raw.num_fmt_id {
                    0 => NumberFormat::General,
                    id => match num_fmts.get(&id) {
                        Some(code) => NumberFormat::Custom(code.clone()),
                        None => NumberFormat::Builtin(id),
                    },
                },
            })
            .collect()
    }
}

fn edge_of(name: &[u8]) -> Option<Edge> {
    match name {
        b"left" | b"start" => Some(Edge::Left),
        b"right" | b"end" => Some(Edge::Right),
        b"top" => Some(Edge::Top),
        b"bottom" => Some(Edge::Bottom),
        _ => None,
    }
}

/// Parse `xl/styles.xml` into one descriptor per `cellXfs` entry, in file order.
///
/// Components the model cannot express (theme colours, gradient fills, fonts
/// beyond name/size/colour/b/i/u) are ignored. The default font (Calibri 11)
/// maps back to unset size and name.
pub(crate) fn parse_styles(xml: &[u8]) -> Result<Vec<Style>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut parser = StyleSheetParser::default();

    loop {
        match reader.read_event_into(&mut buf).map_err(fmt_err)? {
            Event::Start(e) => parser.start(&e, false)?,
            Event::Empty(e) => parser.start(&e, true)?,
            Event::End(e) => parser.end(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let styles = parser.finish();
    tracing::trace!(styles = styles.len(), "parsed style table");
    Ok(styles)
}

fn set_edge(border: &mut Border, edge: Option<(Edge, BorderEdge)>) {
    if let Some((which, line)) = edge {
        match which {
            Edge::Left => border.left = Some(line),
            Edge::Right => border.right = Some(line),
            Edge::Top => border.top = Some(line),
            Edge::Bottom => border.bottom = Some(line),
        }
    }
}

fn parse_alignment(e: &BytesStart<'_>) -> Result<Alignment> {
    Ok(Alignment {
        horizontal: attr(e, b"horizontal")?.and_then(|h| h.parse::<HorizontalAlign>().ok()),
        vertical: attr(e, b"vertical")?.and_then(|v| v.parse::<VerticalAlign>().ok()),
        wrap_text: matches!(attr(e, b"wrapText")?.as_deref(), Some("1") | Some("true")),
    })
}

/// Calibri 11 is what the writer emits for unset size and name
fn normalize_font(mut font: Font) -> Font {
    if font.size == Some(FontSize::from_points(DEFAULT_FONT_POINTS)) {
        font.size = None;
    }
    if font.name.as_deref() == Some(DEFAULT_FONT_NAME) {
        font.name = None;
    }
    font
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleFacet;

    fn render(registry: &StyleRegistry) -> String {
        let mut out = Vec::new();
        StyleTable::build(registry)
            .write_xml(&mut XmlWriter::new(&mut out))
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_components_are_deduplicated() {
        let mut registry = StyleRegistry::new();
        let red: Color = "#FF0000".parse().unwrap();
        registry.apply(None, &[StyleFacet::Bold]).unwrap();
        registry
            .apply(None, &[StyleFacet::Bold, StyleFacet::Fill(red)])
            .unwrap();
        registry.apply(None, &[StyleFacet::Fill(red)]).unwrap();

        let table = StyleTable::build(&registry);
        assert_eq!(table.fonts.len(), 2);
        assert_eq!(table.fills, vec![red]);
        assert_eq!(table.xfs.len(), 4);
        assert_eq!(table.xfs[2].fill_id, 2);
        assert_eq!(table.xfs[3].font_id, 0);
    }

    #[test]
    fn test_custom_number_formats_start_at_164() {
        let mut registry = StyleRegistry::new();
        registry
            .apply(None, &[StyleFacet::NumberFormat(NumberFormat::date())])
            .unwrap();
        registry
            .apply(None, &[StyleFacet::NumberFormat(NumberFormat::Builtin(4))])
            .unwrap();
        let xml = render(&registry);
        assert!(xml.contains("<numFmt numFmtId=\"164\" formatCode=\"yyyy-mm-dd\"/>"));
        assert!(xml.contains("numFmtId=\"4\""));
        assert!(xml.contains("<cellXfs count=\"3\">"));
    }

    #[test]
    fn test_write_then_parse_keeps_descriptors() {
        let mut registry = StyleRegistry::new();
        let facets = [
            StyleFacet::Bold,
            StyleFacet::FontSize(FontSize::from_points(14.0)),
            StyleFacet::FontColor("#336699".parse().unwrap()),
            StyleFacet::Fill("#FFFF00".parse().unwrap()),
            StyleFacet::Border(Edge::Top, BorderLineStyle::Thick.into()),
            StyleFacet::HorizontalAlign(HorizontalAlign::Center),
            StyleFacet::WrapText,
            StyleFacet::NumberFormat(NumberFormat::datetime()),
        ];
        let index = registry.apply(None, &facets).unwrap().unwrap();

        let parsed = parse_styles(render(&registry).as_bytes()).unwrap();
        assert_eq!(parsed.len(), registry.len());
        assert_eq!(parsed[0], Style::default());
        assert_eq!(&parsed[index as usize], registry.resolve(index).unwrap());
    }

    #[test]
    fn test_parse_foreign_style_sheet() {
        let xml = br#"<?xml version="1.0"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="2"><font><sz val="10"/><name val="Arial"/></font><font><b val="0"/><i/><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left style="medium"><color rgb="FF00FF00"/></left><right/><top/><bottom/><diagonal/></border></borders>
<cellXfs count="2"><xf numFmtId="14" fontId="0" fillId="0" borderId="0"/><xf numFmtId="0" fontId="1" fillId="1" borderId="0"><alignment vertical="top"/></xf></cellXfs>
</styleSheet>"#;
        let parsed = parse_styles(xml).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].number_format, NumberFormat::Builtin(14));
        assert_eq!(parsed[0].font.name.as_deref(), Some("Arial"));
        let left = parsed[0].border.left.unwrap();
        assert_eq!(left.style, BorderLineStyle::Medium);
        assert_eq!(left.color, Some(Color(0xFF00FF00)));
        assert!(!parsed[1].font.bold);
        assert!(parsed[1].font.italic);
        assert_eq!(parsed[1].font.size, None);
        assert_eq!(parsed[1].fill.color, None);
        assert_eq!(parsed[1].alignment.vertical, Some(VerticalAlign::Top));
    }
}
