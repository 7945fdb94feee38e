//! Reading spreadsheets back as rows, keyed cells and styles

use crate::address::{column_letter, CellRange};
use crate::error::{ExcelError, Result};
use crate::sheet::Sheet;
use crate::style::Style;
use crate::types::{CellType, CellValue, Row};
use crate::workbook::Workbook;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::Path;

/// One cell as returned by [`ExcelReader::read_rows`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReadCell {
    pub value: CellValue,
    pub cell_type: CellType,
    /// Style index, only filled when styles were requested
    pub style: Option<u32>,
    /// Set on the top-left cell of a merge region
    pub merge: Option<CellRange>,
}

impl ReadCell {
    fn empty() -> Self {
        ReadCell {
            value: CellValue::Empty,
            cell_type: CellType::Empty,
            style: None,
            merge: None,
        }
    }
}

/// Row number to (column letter to cell), both in ascending order
pub type SheetRows = BTreeMap<u32, IndexMap<String, ReadCell>>;

/// Excel file reader
///
/// The whole container is parsed on open; the reader then serves any sheet
/// without going back to disk.
#[derive(Debug)]
pub struct ExcelReader {
    workbook: Workbook,
    selected: usize,
}

impl ExcelReader {
    /// Open an Excel file for reading
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fastexcel::ExcelReader;
    ///
    /// let reader = ExcelReader::open("data.xlsx").unwrap();
    /// println!("Available sheets: {:?}", reader.sheet_names());
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_workbook(Workbook::open(path)?))
    }

    /// Read from a workbook already in memory
    pub fn from_workbook(workbook: Workbook) -> Self {
        ExcelReader {
            workbook,
            selected: 0,
        }
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Give the parsed workbook back, e.g. to edit and save it
    pub fn into_workbook(self) -> Workbook {
        self.workbook
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook
            .sheet_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.workbook.sheet_count()
    }

    /// Make `name` the sheet used when no sheet is passed explicitly
    pub fn select_sheet(&mut self, name: &str) -> Result<&mut Self> {
        let index = self
            .workbook
            .sheets()
            .position(|s| s.name() == name)
            .or_else(|| {
                let wanted = name.to_lowercase();
                self.workbook
                    .sheets()
                    .position(|s| s.name().to_lowercase() == wanted)
            })
            .ok_or_else(|| self.not_found(name))?;
        self.selected = index;
        Ok(self)
    }

    /// Name of the currently selected sheet
    pub fn selected_sheet(&self) -> &str {
        self.workbook
            .sheets()
            .nth(self.selected)
            .map(Sheet::name)
            .unwrap_or_default()
    }

    fn sheet(&self, name: Option<&str>) -> Result<&Sheet> {
        match name {
            Some(name) => self
                .workbook
                .sheet(name)
                .ok_or_else(|| self.not_found(name)),
            None => self
                .workbook
                .sheets()
                .nth(self.selected)
                .ok_or_else(|| self.not_found("")),
        }
    }

    fn not_found(&self, name: &str) -> ExcelError {
        ExcelError::SheetNotFound {
            sheet: name.to_string(),
            available: self.sheet_names().join(", "),
        }
    }

    /// Read a sheet as row number to (column letter to cell).
    ///
    /// Without `flatten` only stored cells are returned; cells hidden under a
    /// merge region are left out unless they carry a style and styles were
    /// requested. With `flatten` every row that has data is padded with empty
    /// cells from column A to the last used column.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fastexcel::ExcelReader;
    ///
    /// # fn main() -> fastexcel::Result<()> {
    /// let reader = ExcelReader::open("movies.xlsx")?;
    /// let rows = reader.read_rows(false, Some("Movies"), false)?;
    /// if let Some(cell) = rows.get(&2).and_then(|row| row.get("B")) {
    ///     println!("{}", cell.value);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_rows(
        &self,
        flatten: bool,
        sheet: Option<&str>,
        include_style: bool,
    ) -> Result<SheetRows> {
        let sheet = self.sheet(sheet)?;
        let grid = sheet.grid();
        let max_col = grid.max_col();
        let mut rows = SheetRows::new();

        for (row, cells) in grid.rows() {
            let mut out = IndexMap::new();
            if flatten {
                for col in 1..=max_col {
                    out.insert(column_letter(col), ReadCell::empty());
                }
            }
            for (&col, data) in cells {
                let merge = sheet
                    .merge_at(row, col)
                    .filter(|m| m.start.row == row && m.start.col == col);
                let style = if include_style { data.style } else { None };
                if !flatten && data.value.is_empty() && style.is_none() && merge.is_none() {
                    continue;
                }
                out.insert(
                    column_letter(col),
                    ReadCell {
                        value: data.value.clone(),
                        cell_type: data.cell_type,
                        style,
                        merge,
                    },
                );
            }
            if !out.is_empty() {
                rows.insert(row, out);
            }
        }
        tracing::trace!(
            sheet = sheet.name(),
            rows = rows.len(),
            flatten,
            "rows read"
        );
        Ok(rows)
    }

    /// Positional rows from row 1 to the last used row, each padded to the last used column
    pub fn rows(&self, sheet: &str) -> Result<RowIterator<'_>> {
        Ok(RowIterator::new(self.sheet(Some(sheet))?))
    }

    /// Value at a 1-based row and column; unset cells read as empty
    pub fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<CellValue> {
        Ok(self.sheet(Some(sheet))?.grid().value(row, col).clone())
    }

    /// Used size of a sheet as (rows, cols)
    pub fn dimensions(&self, sheet: &str) -> Result<(u32, u32)> {
        let grid = self.sheet(Some(sheet))?.grid();
        Ok((grid.max_row(), grid.max_col()))
    }

    pub fn merged_ranges(&self, sheet: &str) -> Result<Vec<CellRange>> {
        Ok(self.sheet(Some(sheet))?.merges().to_vec())
    }

    /// Full descriptor behind a style index from [`read_rows`](Self::read_rows)
    pub fn get_complete_style_by_idx(&self, index: u32) -> Result<Style> {
        self.workbook.style(index).cloned()
    }
}

/// Iterator over the rows of one sheet
pub struct RowIterator<'a> {
    sheet: &'a Sheet,
    current_row: u32,
    max_row: u32,
    max_col: u32,
}

impl<'a> RowIterator<'a> {
    fn new(sheet: &'a Sheet) -> Self {
        RowIterator {
            sheet,
            current_row: 1,
            max_row: sheet.grid().max_row(),
            max_col: sheet.grid().max_col(),
        }
    }
}

impl Iterator for RowIterator<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row > self.max_row {
            return None;
        }
        let row_idx = self.current_row;
        self.current_row += 1;

        let grid = self.sheet.grid();
        let cells = (1..=self.max_col)
            .map(|col| grid.value(row_idx, col).clone())
            .collect();
        Some(Row::new(row_idx, cells))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.max_row + 1).saturating_sub(self.current_row) as usize;
        (left, Some(left))
    }
}
