//! Sparse cell storage for one worksheet

use crate::address::{CellAddress, CellRange};
use crate::error::Result;
use crate::types::{CellType, CellValue};
use std::collections::BTreeMap;

static EMPTY: CellValue = CellValue::Empty;

/// Value, type tag and style index of one stored cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellData {
    pub value: CellValue,
    pub cell_type: CellType,
    /// `None` is the default style
    pub style: Option<u32>,
}

impl CellData {
    fn empty() -> Self {
        CellData {
            value: CellValue::Empty,
            cell_type: CellType::Empty,
            style: None,
        }
    }
}

/// Row-major sparse grid. Unset cells read as empty.
#[derive(Debug, Clone, Default)]
pub struct CellGrid {
    rows: BTreeMap<u32, BTreeMap<u32, CellData>>,
    max_row: u32,
    max_col: u32,
}

impl CellGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value using the automatic type policy ([`CellValue::infer`]).
    ///
    /// A `None` style keeps whatever style the cell already had.
    pub fn set_cell(
        &mut self,
        row: u32,
        col: u32,
        value: impl Into<CellValue>,
        style: Option<u32>,
    ) -> Result<()> {
        let value = value.into().infer();
        self.store(row, col, value, style)
    }

    /// Store a value under a declared type instead of inferring one
    pub fn set_cell_as(
        &mut self,
        row: u32,
        col: u32,
        value: impl Into<CellValue>,
        cell_type: CellType,
        style: Option<u32>,
    ) -> Result<()> {
        let value = value.into().coerce(cell_type)?;
        self.store(row, col, value, style)
    }

    /// Store an already-typed value as-is (used when loading files)
    pub(crate) fn set_raw(&mut self, row: u32, col: u32, data: CellData) -> Result<()> {
        CellAddress::new(row, col)?;
        self.extend(row, col);
        self.rows.entry(row).or_default().insert(col, data);
        Ok(())
    }

    /// Store a value that is already normalized
    pub(crate) fn store(
        &mut self,
        row: u32,
        col: u32,
        value: CellValue,
        style: Option<u32>,
    ) -> Result<()> {
        CellAddress::new(row, col)?;
        self.extend(row, col);
        let cell = self
            .rows
            .entry(row)
            .or_default()
            .entry(col)
            .or_insert_with(CellData::empty);
        cell.cell_type = CellType::of(&value);
        cell.value = value;
        if style.is_some() {
            cell.style = style;
        }
        Ok(())
    }

    /// Replace the style of a cell, creating an empty styled cell if needed
    pub fn set_style(&mut self, row: u32, col: u32, style: Option<u32>) -> Result<()> {
        CellAddress::new(row, col)?;
        self.extend(row, col);
        self.rows
            .entry(row)
            .or_default()
            .entry(col)
            .or_insert_with(CellData::empty)
            .style = style;
        Ok(())
    }

    /// Drop the value of a cell but keep its style
    pub fn clear_value(&mut self, row: u32, col: u32) {
        if let Some(cell) = self.rows.get_mut(&row).and_then(|r| r.get_mut(&col)) {
            cell.value = CellValue::Empty;
            cell.cell_type = CellType::Empty;
        }
    }

    pub fn get_cell(&self, row: u32, col: u32) -> Option<&CellData> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    /// Value at a position, `Empty` for unset cells
    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        self.get_cell(row, col).map(|c| &c.value).unwrap_or(&EMPTY)
    }

    pub fn style_of(&self, row: u32, col: u32) -> Option<u32> {
        self.get_cell(row, col).and_then(|c| c.style)
    }

    /// Highest row touched so far (0 for an empty grid)
    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    /// Highest column touched so far (0 for an empty grid)
    pub fn max_col(&self) -> u32 {
        self.max_col
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Bounding box of all stored cells
    pub fn dimension(&self) -> Option<CellRange> {
        let min_row = *self.rows.keys().next()?;
        let min_col = self.rows.values().filter_map(|r| r.keys().next()).min()?;
        Some(CellRange::new(
            CellAddress {
                row: min_row,
                col: *min_col,
            },
            CellAddress {
                row: self.max_row,
                col: self.max_col,
            },
        ))
    }

    pub fn row(&self, row: u32) -> Option<&BTreeMap<u32, CellData>> {
        self.rows.get(&row)
    }

    /// Stored rows in ascending order
    pub fn rows(&self) -> impl Iterator<Item = (u32, &BTreeMap<u32, CellData>)> {
        self.rows.iter().map(|(r, cells)| (*r, cells))
    }

    /// Stored cells of one column, top to bottom
    pub fn column(&self, col: u32) -> impl Iterator<Item = (u32, &CellData)> {
        self.rows
            .iter()
            .filter_map(move |(r, cells)| cells.get(&col).map(|c| (*r, c)))
    }

    fn extend(&mut self, row: u32, col: u32) {
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }
}
