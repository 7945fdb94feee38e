//! Queued value and formatting operations over cell ranges
//!
//! An [`Area`] records operations without touching the sheet. Nothing is
//! validated or written until the sheet flushes its pending areas
//! (`SheetWriter::write_areas` or saving the workbook), where operations run
//! in the order they were queued and the last write wins per cell and facet.
//!
//! ```no_run
//! use fastexcel::Workbook;
//!
//! # fn main() -> fastexcel::Result<()> {
//! let mut book = Workbook::create(&[])?;
//! let mut sheet = book.get_sheet(None)?;
//! sheet
//!     .begin_area()
//!     .set_value("A2:D2", "Title")
//!     .apply_font_size(14.0)
//!     .apply_font_style_bold()
//!     .apply_text_center();
//! sheet.write_areas()?;
//! # Ok(())
//! # }
//! ```

use crate::address::CellRange;
use crate::error::{ExcelError, Result};
use crate::sheet::{parse_number_format, Sheet};
use crate::style::{
    BorderEdge, BorderLineStyle, Color, Edge, FontSize, HorizontalAlign, StyleFacet,
    StyleRegistry, VerticalAlign,
};
use crate::types::CellValue;
use crate::writer::store_value;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BorderScope {
    All,
    Outer,
    Inner,
}

/// Formatting whose arguments are parsed when the area is flushed
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Format {
    Facets(Vec<StyleFacet>),
    Fill(String),
    FontColor(String),
    Border(BorderScope, String),
    HorizontalAlign(String),
    VerticalAlign(String),
}

impl Format {
    /// Facets applied identically to every cell; outer and inner borders depend
    /// on the cell position and yield nothing here
    pub(crate) fn uniform_facets(&self) -> Result<Vec<StyleFacet>> {
        let facets = match self {
            Format::Facets(facets) => facets.clone(),
            Format::Fill(color) => vec![StyleFacet::Fill(Color::from_str(color)?)],
            Format::FontColor(color) => vec![StyleFacet::FontColor(Color::from_str(color)?)],
            Format::HorizontalAlign(align) => {
                vec![StyleFacet::HorizontalAlign(HorizontalAlign::from_str(align)?)]
            }
            Format::VerticalAlign(align) => {
                vec![StyleFacet::VerticalAlign(VerticalAlign::from_str(align)?)]
            }
            Format::Border(BorderScope::All, line) => {
                StyleFacet::all_borders(BorderLineStyle::from_str(line)?).to_vec()
            }
            Format::Border(_, _) => Vec::new(),
        };
        Ok(facets)
    }

    pub(crate) fn bold() -> Self {
        Format::Facets(vec![StyleFacet::Bold])
    }

    pub(crate) fn italic() -> Self {
        Format::Facets(vec![StyleFacet::Italic])
    }

    pub(crate) fn font_size(points: f64) -> Self {
        Format::Facets(vec![StyleFacet::FontSize(FontSize::from_points(points))])
    }

    pub(crate) fn text_center() -> Self {
        Format::Facets(vec![
            StyleFacet::HorizontalAlign(HorizontalAlign::Center),
            StyleFacet::VerticalAlign(VerticalAlign::Center),
        ])
    }

    pub(crate) fn wrap() -> Self {
        Format::Facets(vec![StyleFacet::WrapText])
    }

    pub(crate) fn number_format(code: &str) -> Self {
        Format::Facets(vec![StyleFacet::NumberFormat(parse_number_format(code))])
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AreaOp {
    SetValue { range: String, value: CellValue },
    Format { range: Option<String>, format: Format },
}

/// Chainable queue of operations on ranges of one sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Area {
    ops: Vec<AreaOp>,
    current: Option<String>,
}

impl Area {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a value. A range wider than one cell keeps the value in its
    /// top-left cell and becomes a merge region. Later `apply_*` calls
    /// target this range.
    pub fn set_value(&mut self, range: &str, value: impl Into<CellValue>) -> &mut Self {
        self.ops.push(AreaOp::SetValue {
            range: range.to_string(),
            value: value.into(),
        });
        self.current = Some(range.to_string());
        self
    }

    /// Target later `apply_*` calls at another range; queued operations are unaffected
    pub fn with_range(&mut self, range: &str) -> &mut Self {
        self.current = Some(range.to_string());
        self
    }

    fn format(&mut self, format: Format) -> &mut Self {
        self.ops.push(AreaOp::Format {
            range: self.current.clone(),
            format,
        });
        self
    }

    /// Same border line on every edge of every cell
    pub fn apply_border(&mut self, style: &str) -> &mut Self {
        self.format(Format::Border(BorderScope::All, style.to_string()))
    }

    /// Border along the perimeter of the range only
    pub fn apply_outer_border(&mut self, style: &str) -> &mut Self {
        self.format(Format::Border(BorderScope::Outer, style.to_string()))
    }

    /// Border between cells inside the range only
    pub fn apply_inner_border(&mut self, style: &str) -> &mut Self {
        self.format(Format::Border(BorderScope::Inner, style.to_string()))
    }

    pub fn apply_bg_color(&mut self, color: &str) -> &mut Self {
        self.format(Format::Fill(color.to_string()))
    }

    pub fn apply_font_style_bold(&mut self) -> &mut Self {
        self.format(Format::bold())
    }

    pub fn apply_font_style_italic(&mut self) -> &mut Self {
        self.format(Format::italic())
    }

    pub fn apply_font_size(&mut self, points: f64) -> &mut Self {
        self.format(Format::font_size(points))
    }

    pub fn apply_font_color(&mut self, color: &str) -> &mut Self {
        self.format(Format::FontColor(color.to_string()))
    }

    /// Center horizontally and vertically
    pub fn apply_text_center(&mut self) -> &mut Self {
        self.format(Format::text_center())
    }

    pub fn apply_text_align(&mut self, align: &str) -> &mut Self {
        self.format(Format::HorizontalAlign(align.to_string()))
    }

    pub fn apply_vertical_align(&mut self, align: &str) -> &mut Self {
        self.format(Format::VerticalAlign(align.to_string()))
    }

    pub fn apply_text_wrap(&mut self) -> &mut Self {
        self.format(Format::wrap())
    }

    /// Format code or shortcut such as `@date`, `@money`, `0.00%`
    pub fn apply_number_format(&mut self, format: &str) -> &mut Self {
        self.format(Format::number_format(format))
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Parse every queued range and argument without touching a sheet
    pub(crate) fn resolve(&self) -> Result<ResolvedArea> {
        let mut ops = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            let resolved = match op {
                AreaOp::SetValue { range, value } => {
                    Resolved::Value(CellRange::from_str(range)?, value.clone().infer())
                }
                AreaOp::Format { range, format } => {
                    let range = range.as_deref().ok_or_else(|| {
                        ExcelError::InvalidCell("area formatting applied before any range".into())
                    })?;
                    let range = CellRange::from_str(range)?;
                    match format {
                        Format::Border(scope @ (BorderScope::Outer | BorderScope::Inner), line) => {
                            let line = BorderLineStyle::from_str(line)?;
                            Resolved::Border(range, *scope, line.into())
                        }
                        format => Resolved::Uniform(range, format.uniform_facets()?),
                    }
                }
            };
            ops.push(resolved);
        }
        Ok(ResolvedArea(ops))
    }
}

#[derive(Debug)]
enum Resolved {
    Value(CellRange, CellValue),
    Uniform(CellRange, Vec<StyleFacet>),
    Border(CellRange, BorderScope, BorderEdge),
}

/// An area whose ranges and arguments are known to be valid
#[derive(Debug)]
pub(crate) struct ResolvedArea(Vec<Resolved>);

impl ResolvedArea {
    /// Run the operations against the sheet, in queue order
    pub(crate) fn apply(self, sheet: &mut Sheet, styles: &mut StyleRegistry) -> Result<()> {
        let count = self.0.len();
        for op in self.0 {
            match op {
                Resolved::Value(range, value) => {
                    store_value(sheet, styles, range.start.row, range.start.col, value, &[])?;
                    sheet.add_merge(range);
                }
                Resolved::Uniform(range, facets) => {
                    for cell in range.cells() {
                        let style = styles.apply(sheet.grid.style_of(cell.row, cell.col), &facets)?;
                        sheet.grid.set_style(cell.row, cell.col, style)?;
                    }
                }
                Resolved::Border(range, scope, line) => {
                    apply_border(sheet, styles, &range, scope, line)?;
                }
            }
        }
        tracing::trace!(sheet = sheet.name(), operations = count, "area flushed");
        Ok(())
    }
}

fn apply_border(
    sheet: &mut Sheet,
    styles: &mut StyleRegistry,
    range: &CellRange,
    scope: BorderScope,
    line: BorderEdge,
) -> Result<()> {
    for cell in range.cells() {
        let (top, bottom) = (cell.row == range.start.row, cell.row == range.end.row);
        let (left, right) = (cell.col == range.start.col, cell.col == range.end.col);
        let edges = Edge::ALL.into_iter().filter(|edge| {
            let outer = match edge {
                Edge::Top => top,
                Edge::Bottom => bottom,
                Edge::Left => left,
                Edge::Right => right,
            };
            match scope {
                BorderScope::All => true,
                BorderScope::Outer => outer,
                BorderScope::Inner => !outer,
            }
        });
        let facets: Vec<StyleFacet> = edges.map(|edge| StyleFacet::Border(edge, line)).collect();
        if facets.is_empty() {
            continue;
        }
        let style = styles.apply(sheet.grid.style_of(cell.row, cell.col), &facets)?;
        sheet.grid.set_style(cell.row, cell.col, style)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellType;

    fn run(area: &Area, sheet: &mut Sheet, styles: &mut StyleRegistry) -> Result<()> {
        area.resolve()?.apply(sheet, styles)
    }

    fn flush(area: &Area) -> (Sheet, StyleRegistry) {
        let mut sheet = Sheet::new("Test");
        let mut styles = StyleRegistry::new();
        run(area, &mut sheet, &mut styles).unwrap();
        (sheet, styles)
    }

    #[test]
    fn test_merged_value_lands_in_top_left() {
        let mut area = Area::new();
        area.set_value("C4:D4", "Movie Character");
        let (sheet, _) = flush(&area);

        assert_eq!(sheet.grid.value(4, 3), &CellValue::from("Movie Character"));
        assert!(sheet.grid.get_cell(4, 4).is_none());
        assert_eq!(sheet.merges()[0].to_string(), "C4:D4");
    }

    #[test]
    fn test_apply_targets_last_range() {
        let mut area = Area::new();
        area.set_value("a1", "x")
            .apply_font_style_bold()
            .with_range("B2")
            .apply_font_style_italic();
        let (sheet, styles) = flush(&area);

        let a1 = styles.resolve(sheet.grid.style_of(1, 1).unwrap()).unwrap();
        let b2 = styles.resolve(sheet.grid.style_of(2, 2).unwrap()).unwrap();
        assert!(a1.font.bold && !a1.font.italic);
        assert!(b2.font.italic && !b2.font.bold);
        assert_eq!(sheet.grid.get_cell(2, 2).unwrap().cell_type, CellType::Empty);
    }

    #[test]
    fn test_same_facets_share_style_index() {
        let mut area = Area::new();
        area.with_range("A1:B2").apply_bg_color("#ccc").apply_font_style_bold();
        let (sheet, styles) = flush(&area);

        let idx = sheet.grid.style_of(1, 1);
        assert!(idx.is_some());
        assert_eq!(sheet.grid.style_of(2, 2), idx);
        assert_eq!(styles.len(), 3);
    }

    #[test]
    fn test_outer_and_inner_borders() {
        let mut area = Area::new();
        area.with_range("A4:B5")
            .apply_outer_border("thin")
            .apply_inner_border("thick");
        let (sheet, styles) = flush(&area);

        let a4 = styles.resolve(sheet.grid.style_of(4, 1).unwrap()).unwrap();
        assert_eq!(a4.border.top.unwrap().style, BorderLineStyle::Thin);
        assert_eq!(a4.border.left.unwrap().style, BorderLineStyle::Thin);
        assert_eq!(a4.border.right.unwrap().style, BorderLineStyle::Thick);
        assert_eq!(a4.border.bottom.unwrap().style, BorderLineStyle::Thick);

        let b5 = styles.resolve(sheet.grid.style_of(5, 2).unwrap()).unwrap();
        assert_eq!(b5.border.bottom.unwrap().style, BorderLineStyle::Thin);
        assert_eq!(b5.border.top.unwrap().style, BorderLineStyle::Thick);
    }

    #[test]
    fn test_last_write_wins() {
        let mut area = Area::new();
        area.set_value("A1", "first")
            .apply_bg_color("#ff0000")
            .set_value("A1", "second")
            .apply_bg_color("#00ff00");
        let (sheet, styles) = flush(&area);

        assert_eq!(sheet.grid.value(1, 1), &CellValue::from("second"));
        let style = styles.resolve(sheet.grid.style_of(1, 1).unwrap()).unwrap();
        assert_eq!(style.fill.color, Some(Color::rgb(0, 0xFF, 0)));
    }

    #[test]
    fn test_invalid_arguments_surface_on_flush() {
        let mut area = Area::new();
        area.set_value("A1", 1i64).apply_border("wavy");
        let mut sheet = Sheet::new("Test");
        let mut styles = StyleRegistry::new();
        assert!(matches!(
            run(&area, &mut sheet, &mut styles),
            Err(ExcelError::InvalidOption { .. })
        ));
        assert!(sheet.grid.is_empty());

        let mut area = Area::new();
        area.apply_font_style_bold();
        assert!(run(&area, &mut sheet, &mut styles).is_err());

        let mut area = Area::new();
        area.set_value("A0:B1", "x");
        assert!(matches!(
            run(&area, &mut sheet, &mut styles),
            Err(ExcelError::InvalidCell(_))
        ));
    }
}
