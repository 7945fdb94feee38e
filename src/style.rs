//! Style descriptors and the style registry
//!
//! A [`Style`] is a composite of independent facets (font, fill, border per edge,
//! alignment, number format). Descriptors are immutable values: applying a
//! [`StyleFacet`] produces a new descriptor, and the [`StyleRegistry`] interns
//! descriptors so structurally equal styles always share one index.

use crate::error::{ExcelError, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Number format code used for date cells
pub const DATE_FORMAT: &str = "yyyy-mm-dd";
/// Number format code used for date-time cells
pub const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// ARGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// `AARRGGBB` as used by the `rgb` attribute
    pub fn argb_hex(&self) -> String {
        format!("{:08X}", self.0)
    }
}

impl FromStr for Color {
    type Err = ExcelError;

    /// Accepts `#rgb`, `#rrggbb` and `aarrggbb`, with or without `#`
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || ExcelError::option("color", format!("'{}' is not a hex colour", s));
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let expanded = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 | 8 => hex.to_string(),
            _ => return Err(bad()),
        };
        let value = u32::from_str_radix(&expanded, 16).map_err(|_| bad())?;
        Ok(if expanded.len() == 6 {
            Color(0xFF00_0000 | value)
        } else {
            Color(value)
        })
    }
}

/// Font size stored in hundredths of a point so descriptors stay hashable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontSize(u32);

impl FontSize {
    pub fn from_points(points: f64) -> Self {
        FontSize((points.max(0.0) * 100.0).round() as u32)
    }

    pub fn points(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Font {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub size: Option<FontSize>,
    pub color: Option<Color>,
    pub name: Option<String>,
}

/// Solid background fill; `color: None` means no fill
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fill {
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BorderLineStyle {
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
}

impl BorderLineStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderLineStyle::Thin => "thin",
            BorderLineStyle::Medium => "medium",
            BorderLineStyle::Thick => "thick",
            BorderLineStyle::Dashed => "dashed",
            BorderLineStyle::Dotted => "dotted",
            BorderLineStyle::Double => "double",
            BorderLineStyle::Hair => "hair",
        }
    }
}

impl FromStr for BorderLineStyle {
    type Err = ExcelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thin" => Ok(BorderLineStyle::Thin),
            "medium" => Ok(BorderLineStyle::Medium),
            "thick" => Ok(BorderLineStyle::Thick),
            "dashed" => Ok(BorderLineStyle::Dashed),
            "dotted" => Ok(BorderLineStyle::Dotted),
            "double" => Ok(BorderLineStyle::Double),
            "hair" => Ok(BorderLineStyle::Hair),
            other => Err(ExcelError::option(
                "border",
                format!("unknown border style '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BorderEdge {
    pub style: BorderLineStyle,
    pub color: Option<Color>,
}

impl From<BorderLineStyle> for BorderEdge {
    fn from(style: BorderLineStyle) -> Self {
        BorderEdge { style, color: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Border {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
}

impl Border {
    pub fn edge(&self, edge: Edge) -> Option<BorderEdge> {
        match edge {
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
        }
    }

    fn edge_mut(&mut self, edge: Edge) -> &mut Option<BorderEdge> {
        match edge {
            Edge::Left => &mut self.left,
            Edge::Right => &mut self.right,
            Edge::Top => &mut self.top,
            Edge::Bottom => &mut self.bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
    Fill,
    Justify,
}

impl HorizontalAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            HorizontalAlign::Left => "left",
            HorizontalAlign::Center => "center",
            HorizontalAlign::Right => "right",
            HorizontalAlign::Fill => "fill",
            HorizontalAlign::Justify => "justify",
        }
    }
}

impl FromStr for HorizontalAlign {
    type Err = ExcelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(HorizontalAlign::Left),
            "center" | "centre" => Ok(HorizontalAlign::Center),
            "right" => Ok(HorizontalAlign::Right),
            "fill" => Ok(HorizontalAlign::Fill),
            "justify" => Ok(HorizontalAlign::Justify),
            other => Err(ExcelError::option(
                "text-align",
                format!("unknown alignment '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

impl VerticalAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerticalAlign::Top => "top",
            VerticalAlign::Center => "center",
            VerticalAlign::Bottom => "bottom",
        }
    }
}

impl FromStr for VerticalAlign {
    type Err = ExcelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(VerticalAlign::Top),
            "center" | "middle" => Ok(VerticalAlign::Center),
            "bottom" => Ok(VerticalAlign::Bottom),
            other => Err(ExcelError::option(
                "vertical-align",
                format!("unknown alignment '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    pub horizontal: Option<HorizontalAlign>,
    pub vertical: Option<VerticalAlign>,
    pub wrap_text: bool,
}

impl Alignment {
    pub fn is_default(&self) -> bool {
        *self == Alignment::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumberFormat {
    #[default]
    General,
    /// Predefined format id (1..=163) as understood by spreadsheet applications
    Builtin(u32),
    /// Custom format code
    Custom(String),
}

impl NumberFormat {
    pub fn date() -> Self {
        NumberFormat::Custom(DATE_FORMAT.to_string())
    }

    pub fn datetime() -> Self {
        NumberFormat::Custom(DATETIME_FORMAT.to_string())
    }

    /// Whether numbers under this format are dates
    pub fn is_date(&self) -> bool {
        match self {
            NumberFormat::General => false,
            NumberFormat::Builtin(id) => matches!(id, 14..=22 | 45..=47),
            NumberFormat::Custom(code) => is_date_code(code),
        }
    }
}

/// Scan a format code for date/time tokens outside quoted literals and brackets
fn is_date_code(code: &str) -> bool {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;
    for ch in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            'y' | 'Y' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' | 'm' | 'M'
                if !in_quotes && !in_brackets =>
            {
                return true
            }
            _ => {}
        }
    }
    false
}

/// Composite formatting descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Style {
    pub font: Font,
    pub fill: Fill,
    pub border: Border,
    pub alignment: Alignment,
    pub number_format: NumberFormat,
}

/// One formatting change; applying it to a style overrides exactly that facet
#[derive(Debug, Clone, PartialEq)]
pub enum StyleFacet {
    Bold,
    Italic,
    Underline,
    FontSize(FontSize),
    FontColor(Color),
    FontName(String),
    Fill(Color),
    Border(Edge, BorderEdge),
    HorizontalAlign(HorizontalAlign),
    VerticalAlign(VerticalAlign),
    WrapText,
    NumberFormat(NumberFormat),
}

impl StyleFacet {
    /// The same line style on all four edges
    pub fn all_borders(style: BorderLineStyle) -> [StyleFacet; 4] {
        Edge::ALL.map(|edge| StyleFacet::Border(edge, style.into()))
    }
}

impl Style {
    pub fn is_default(&self) -> bool {
        *self == Style::default()
    }

    /// New descriptor equal to `self` with one facet overridden
    pub fn with(&self, facet: &StyleFacet) -> Style {
        let mut style = self.clone();
        match facet {
            StyleFacet::Bold => style.font.bold = true,
            StyleFacet::Italic => style.font.italic = true,
            StyleFacet::Underline => style.font.underline = true,
            StyleFacet::FontSize(size) => style.font.size = Some(*size),
            StyleFacet::FontColor(color) => style.font.color = Some(*color),
            StyleFacet::FontName(name) => style.font.name = Some(name.clone()),
            StyleFacet::Fill(color) => style.fill.color = Some(*color),
            StyleFacet::Border(edge, line) => *style.border.edge_mut(*edge) = Some(*line),
            StyleFacet::HorizontalAlign(h) => style.alignment.horizontal = Some(*h),
            StyleFacet::VerticalAlign(v) => style.alignment.vertical = Some(*v),
            StyleFacet::WrapText => style.alignment.wrap_text = true,
            StyleFacet::NumberFormat(fmt) => style.number_format = fmt.clone(),
        }
        style
    }

    /// Flatten into `(facet, key, value)` triples for display and lookups
    pub fn describe(&self) -> Vec<(&'static str, String, String)> {
        let mut out = Vec::new();
        let font = &self.font;
        if font.bold {
            out.push(("font", "bold".to_string(), "true".to_string()));
        }
        if font.italic {
            out.push(("font", "italic".to_string(), "true".to_string()));
        }
        if font.underline {
            out.push(("font", "underline".to_string(), "true".to_string()));
        }
        if let Some(size) = font.size {
            out.push(("font", "size".to_string(), size.points().to_string()));
        }
        if let Some(color) = font.color {
            out.push(("font", "color".to_string(), color.argb_hex()));
        }
        if let Some(name) = &font.name {
            out.push(("font", "name".to_string(), name.clone()));
        }
        if let Some(color) = self.fill.color {
            out.push(("fill", "color".to_string(), color.argb_hex()));
        }
        for (edge, key) in Edge::ALL.iter().zip(["left", "right", "top", "bottom"]) {
            if let Some(line) = self.border.edge(*edge) {
                out.push(("border", key.to_string(), line.style.as_str().to_string()));
            }
        }
        if let Some(h) = self.alignment.horizontal {
            out.push(("alignment", "horizontal".to_string(), h.as_str().to_string()));
        }
        if let Some(v) = self.alignment.vertical {
            out.push(("alignment", "vertical".to_string(), v.as_str().to_string()));
        }
        if self.alignment.wrap_text {
            out.push(("alignment", "wrap".to_string(), "true".to_string()));
        }
        match &self.number_format {
            NumberFormat::General => {}
            NumberFormat::Builtin(id) => {
                out.push(("format", "id".to_string(), id.to_string()));
            }
            NumberFormat::Custom(code) => {
                out.push(("format", "code".to_string(), code.clone()));
            }
        }
        out
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .describe()
            .into_iter()
            .map(|(facet, key, value)| format!("{}.{}={}", facet, key, value))
            .collect();
        if parts.is_empty() {
            f.write_str("default")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

/// Style table shared by every sheet of a workbook.
///
/// Index 0 is always the default style. Equal descriptors resolve to the
/// first index they were interned under.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    styles: Vec<Style>,
    style_map: HashMap<Style, u32>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        let mut registry = StyleRegistry {
            styles: Vec::with_capacity(16),
            style_map: HashMap::with_capacity(16),
        };
        registry.intern(Style::default());
        registry
    }

    /// Add a descriptor and get its index, reusing the index of an equal descriptor
    pub fn intern(&mut self, style: Style) -> u32 {
        if let Some(&index) = self.style_map.get(&style) {
            return index;
        }
        let index = self.styles.len() as u32;
        self.styles.push(style.clone());
        self.style_map.insert(style, index);
        index
    }

    /// Append without deduplication, keeping file-defined indices stable when reading
    pub(crate) fn push_raw(&mut self, style: Style) -> u32 {
        let index = self.styles.len() as u32;
        self.style_map.entry(style.clone()).or_insert(index);
        self.styles.push(style);
        index
    }

    /// Start over with an empty table (used before loading a file's style table)
    pub(crate) fn clear(&mut self) {
        self.styles.clear();
        self.style_map.clear();
    }

    pub fn resolve(&self, index: u32) -> Result<&Style> {
        self.styles
            .get(index as usize)
            .ok_or(ExcelError::StyleNotFound {
                index,
                count: self.styles.len(),
            })
    }

    /// Apply facets on top of an existing cell style and intern the result.
    ///
    /// The base descriptor is never modified. `None` stands for the default style.
    pub fn apply(&mut self, base: Option<u32>, facets: &[StyleFacet]) -> Result<Option<u32>> {
        if facets.is_empty() {
            return Ok(base);
        }
        let mut style = match base {
            Some(index) => self.resolve(index)?.clone(),
            None => Style::default(),
        };
        for facet in facets {
            style = style.with(facet);
        }
        let index = self.intern(style);
        Ok((index != 0).then_some(index))
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Style> {
        self.styles.iter()
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
