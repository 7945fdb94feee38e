//! Worksheet model: cell grid, column overrides, merges and pending areas

use crate::address::{column_index, CellRange};
use crate::area::{Area, Format};
use crate::error::{ExcelError, Result};
use crate::grid::CellGrid;
use crate::style::{Color, FontSize, HorizontalAlign, NumberFormat, StyleFacet, VerticalAlign};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const MAX_SHEET_NAME_LEN: usize = 31;
const FORBIDDEN_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Check a sheet name against the container's naming rules
pub fn validate_sheet_name(name: &str) -> Result<()> {
    let reject = |reason: &str| ExcelError::InvalidSheetName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.trim().is_empty() {
        return Err(reject("name is empty"));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(reject("name is longer than 31 characters"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(reject(&format!("character '{}' is not allowed", ch)));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(reject("name cannot start or end with an apostrophe"));
    }
    Ok(())
}

/// Column width override
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColWidth {
    /// Width in character units
    Fixed(f64),
    /// Fit the longest rendered value, computed when saving
    Auto,
}

impl From<f64> for ColWidth {
    fn from(width: f64) -> Self {
        ColWidth::Fixed(width)
    }
}

impl From<u32> for ColWidth {
    fn from(width: u32) -> Self {
        ColWidth::Fixed(width as f64)
    }
}

impl From<&str> for ColWidth {
    /// `"auto"` or a number; anything unparsable falls back to `Auto`
    fn from(width: &str) -> Self {
        width.parse().unwrap_or(ColWidth::Auto)
    }
}

impl FromStr for ColWidth {
    type Err = ExcelError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ColWidth::Auto);
        }
        match s.parse::<f64>() {
            Ok(w) if w.is_finite() && w >= 0.0 => Ok(ColWidth::Fixed(w)),
            _ => Err(ExcelError::option(
                "width",
                format!("expected a number or 'auto', got '{}'", s),
            )),
        }
    }
}

/// Per-column overrides set through `set_col_width` / `set_col_options`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnOptions {
    pub width: Option<ColWidth>,
    /// Facets applied to every cell written afterwards in this column
    pub facets: Vec<StyleFacet>,
    /// Interned style of the facets alone, emitted on the `<col>` element
    pub style: Option<u32>,
}

impl ColumnOptions {
    /// Merge one `key => value` option into these overrides
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        let key_lc = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key_lc.as_str() {
            "width" => self.width = Some(value.parse()?),
            "text-align" | "align" => self
                .facets
                .push(StyleFacet::HorizontalAlign(HorizontalAlign::from_str(value)?)),
            "vertical-align" | "valign" => self
                .facets
                .push(StyleFacet::VerticalAlign(VerticalAlign::from_str(value)?)),
            "text-wrap" => {
                if parse_flag(key, value)? {
                    self.facets.push(StyleFacet::WrapText);
                }
            }
            "font-style" => {
                for part in value.split(|c: char| c == ',' || c.is_whitespace()) {
                    match part.to_ascii_lowercase().as_str() {
                        "" | "normal" => {}
                        "bold" => self.facets.push(StyleFacet::Bold),
                        "italic" => self.facets.push(StyleFacet::Italic),
                        "underline" => self.facets.push(StyleFacet::Underline),
                        other => {
                            return Err(ExcelError::option(
                                key,
                                format!("unknown font style '{}'", other),
                            ))
                        }
                    }
                }
            }
            "font-size" => {
                let points: f64 = value
                    .parse()
                    .map_err(|_| ExcelError::option(key, format!("'{}' is not a size", value)))?;
                self.facets
                    .push(StyleFacet::FontSize(FontSize::from_points(points)));
            }
            "font-color" | "color" => self.facets.push(StyleFacet::FontColor(value.parse()?)),
            "font-name" | "font" => self.facets.push(StyleFacet::FontName(value.to_string())),
            "fill" | "bg-color" => self.facets.push(StyleFacet::Fill(Color::from_str(value)?)),
            "format" => self
                .facets
                .push(StyleFacet::NumberFormat(parse_number_format(value))),
            _ => {
                return Err(ExcelError::option(key, "unknown column option"));
            }
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ExcelError::option(key, format!("'{}' is not a flag", value))),
    }
}

/// Format shortcuts (`@date`, `@integer`, ...) or a raw format code
pub fn parse_number_format(code: &str) -> NumberFormat {
    match code.to_ascii_lowercase().as_str() {
        "" | "general" | "@general" => NumberFormat::General,
        "@date" => NumberFormat::date(),
        "@datetime" => NumberFormat::datetime(),
        "@integer" => NumberFormat::Builtin(1),
        "@float" => NumberFormat::Builtin(2),
        "@money" => NumberFormat::Builtin(4),
        "@percent" => NumberFormat::Builtin(10),
        "@text" | "@string" => NumberFormat::Builtin(49),
        _ => NumberFormat::Custom(code.to_string()),
    }
}

/// Parse a column given as letters (`"B"`) or a 1-based number (`"2"`)
pub(crate) fn parse_column(col: &str) -> Result<u32> {
    let col = col.trim();
    match col.parse::<u32>() {
        Ok(n) if (1..=crate::address::MAX_COLS).contains(&n) => Ok(n),
        Ok(_) => Err(ExcelError::InvalidCell(col.to_string())),
        Err(_) => column_index(col),
    }
}

/// How the row writer derives the header row
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum HeaderMode {
    #[default]
    Off,
    /// Take the keys of the first keyed record
    Derive,
    /// Explicit column order
    Fixed(Vec<String>),
}

/// One named worksheet owned by a [`Workbook`](crate::Workbook)
#[derive(Clone, Default)]
pub struct Sheet {
    name: String,
    pub(crate) grid: CellGrid,
    pub(crate) columns: BTreeMap<u32, ColumnOptions>,
    merges: Vec<CellRange>,
    pub(crate) pending: Vec<Area>,
    pub(crate) header: HeaderMode,
    /// Keys of the header row once it has been written
    pub(crate) header_keys: Option<Vec<String>>,
    /// Formatting for the next row written by the row writer
    pub(crate) row_formats: Vec<Format>,
    /// Row after the last one placed by the row writer
    pub(crate) cursor: u32,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// Merge regions in the order they were added
    pub fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    /// Overrides for one column (1-based)
    pub fn column_options(&self, col: u32) -> Option<&ColumnOptions> {
        self.columns.get(&col)
    }

    /// Number of areas queued and not yet flushed
    pub fn pending_areas(&self) -> usize {
        self.pending.len()
    }

    /// Header keys in column order, once a header row exists
    pub fn header(&self) -> Option<&[String]> {
        self.header_keys.as_deref()
    }

    /// Register a merge region; existing merges overlapping it are replaced.
    ///
    /// Values in the covered cells other than the top-left one are cleared.
    pub fn add_merge(&mut self, range: CellRange) {
        if range.is_single() {
            return;
        }
        let before = self.merges.len();
        self.merges.retain(|m| !m.overlaps(&range));
        if self.merges.len() != before {
            tracing::debug!(
                sheet = self.name.as_str(),
                merge = %range,
                replaced = before - self.merges.len(),
                "merge replaced overlapping regions"
            );
        }
        for cell in range.cells().skip(1) {
            self.grid.clear_value(cell.row, cell.col);
        }
        self.merges.push(range);
    }

    /// Merge region covering a cell, if any
    pub fn merge_at(&self, row: u32, col: u32) -> Option<CellRange> {
        let cell = crate::address::CellAddress { row, col };
        self.merges.iter().copied().find(|m| m.contains(cell))
    }

    /// Row the row writer places its next row on
    pub(crate) fn next_row(&self) -> u32 {
        let merged = self.merges.iter().map(|m| m.end.row).max().unwrap_or(0);
        self.cursor.max(self.grid.max_row().max(merged) + 1)
    }
}

impl fmt::Debug for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sheet")
            .field("name", &self.name)
            .field("cells", &self.grid.len())
            .field("max_row", &self.grid.max_row())
            .field("max_col", &self.grid.max_col())
            .field("merges", &self.merges.len())
            .field("pending_areas", &self.pending.len())
            .finish()
    }
}
