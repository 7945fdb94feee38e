//! Cell addressing: column letters, `C5`-style references and `A2:D2` ranges

use crate::error::{ExcelError, Result};
use std::fmt;
use std::str::FromStr;

/// Last addressable row in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;
/// Last addressable column in a worksheet (`XFD`)
pub const MAX_COLS: u32 = 16_384;

/// Convert a 1-based column number to letters (1 -> A, 26 -> Z, 27 -> AA)
pub fn column_letter(col: u32) -> String {
    let mut buf = Vec::with_capacity(3);
    push_column_letter(&mut buf, col);
    // Only ASCII uppercase letters are ever pushed.
    String::from_utf8_lossy(&buf).into_owned()
}

/// Append column letters for a 1-based column number to a byte buffer
pub(crate) fn push_column_letter(buffer: &mut Vec<u8>, mut n: u32) {
    if n == 0 {
        return;
    }
    let mut tmp = [0u8; 10];
    let mut len = 0;
    while n > 0 {
        let rem = (n - 1) % 26;
        tmp[len] = b'A' + rem as u8;
        len += 1;
        n = (n - 1) / 26;
    }
    for i in (0..len).rev() {
        buffer.push(tmp[i]);
    }
}

/// Parse column letters (case-insensitive) into a 1-based column number
pub fn column_index(letters: &str) -> Result<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return Err(ExcelError::InvalidCell(letters.to_string()));
    }
    let mut col = 0u32;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(ExcelError::InvalidCell(letters.to_string()));
        }
        col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    if col > MAX_COLS {
        return Err(ExcelError::InvalidCell(letters.to_string()));
    }
    Ok(col)
}

/// A single cell position (both coordinates 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    /// Create a checked address
    pub fn new(row: u32, col: u32) -> Result<Self> {
        if row == 0 || row > MAX_ROWS || col == 0 || col > MAX_COLS {
            return Err(ExcelError::InvalidCell(format!("R{}C{}", row, col)));
        }
        Ok(CellAddress { row, col })
    }

    /// Get Excel-style cell reference (e.g., "A1", "B2")
    pub fn reference(&self) -> String {
        format!("{}{}", column_letter(self.col), self.row)
    }

    pub fn column_letter(&self) -> String {
        column_letter(self.col)
    }
}

impl FromStr for CellAddress {
    type Err = ExcelError;

    fn from_str(s: &str) -> Result<Self> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| ExcelError::InvalidCell(s.to_string()))?;
        let (letters, digits) = cleaned.split_at(split);
        let col = column_index(letters).map_err(|_| ExcelError::InvalidCell(s.to_string()))?;
        let row: u32 = digits
            .parse()
            .map_err(|_| ExcelError::InvalidCell(s.to_string()))?;
        CellAddress::new(row, col).map_err(|_| ExcelError::InvalidCell(s.to_string()))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.col), self.row)
    }
}

/// Rectangular block of cells; `start` is always the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Build a range from any two corners
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        CellRange {
            start: CellAddress {
                row: a.row.min(b.row),
                col: a.col.min(b.col),
            },
            end: CellAddress {
                row: a.row.max(b.row),
                col: a.col.max(b.col),
            },
        }
    }

    pub fn single(cell: CellAddress) -> Self {
        CellRange {
            start: cell,
            end: cell,
        }
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, cell: CellAddress) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    /// Iterate all cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.start.row..=self.end.row).flat_map(move |row| {
            (self.start.col..=self.end.col).map(move |col| CellAddress { row, col })
        })
    }

    pub fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn width(&self) -> u32 {
        self.end.col - self.start.col + 1
    }
}

impl FromStr for CellRange {
    type Err = ExcelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((a, b)) => Ok(CellRange::new(a.parse()?, b.parse()?)),
            None => Ok(CellRange::single(s.parse()?)),
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}
