//! Type definitions for spreadsheet data: cell values, type tags and inference

use crate::error::{ExcelError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;

/// Represents a single cell value in a worksheet
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValue {
    /// Empty cell
    Empty,
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Date or date-time value
    Date(NaiveDateTime),
    /// Error value read from a file (e.g. `#DIV/0!`)
    Error(String),
}

/// Type tag stored next to every cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellType {
    Empty,
    String,
    Number,
    Bool,
    Date,
    Error,
}

impl CellType {
    /// Type tag of an already-normalized value
    pub fn of(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => CellType::Empty,
            CellValue::String(_) => CellType::String,
            CellValue::Int(_) | CellValue::Float(_) => CellType::Number,
            CellValue::Bool(_) => CellType::Bool,
            CellValue::Date(_) => CellType::Date,
            CellValue::Error(_) => CellType::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Empty => "empty",
            CellType::String => "string",
            CellType::Number => "number",
            CellType::Bool => "bool",
            CellType::Date => "date",
            CellType::Error => "error",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CellValue {
    /// Convert cell value to string
    pub fn as_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::String(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => format_date(d),
            CellValue::Error(e) => e.clone(),
        }
    }

    /// Check if cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Try to convert to integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            CellValue::Float(f) => Some(*f as i64),
            CellValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(f) => Some(*f),
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Date(d) => to_excel_serial(d),
            CellValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            CellValue::Int(i) => Some(*i != 0),
            CellValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::String(s) => parse_iso_datetime(s),
            _ => None,
        }
    }

    /// Apply the automatic type policy.
    ///
    /// Strings that are canonical numerals become numbers, ISO dates become dates,
    /// everything else stays text. Dates before 1900-01-01 cannot be stored as serial
    /// numbers and degrade to their ISO text.
    pub fn infer(self) -> CellValue {
        match self {
            CellValue::String(s) => infer_str(&s).unwrap_or(CellValue::String(s)),
            CellValue::Date(d) if to_excel_serial(&d).is_none() => {
                CellValue::String(format_date(&d))
            }
            CellValue::Float(f) if !f.is_finite() => CellValue::String(f.to_string()),
            other => other,
        }
    }

    /// Convert to a declared type instead of inferring one
    pub fn coerce(self, to: CellType) -> Result<CellValue> {
        let fail = |v: &CellValue| {
            ExcelError::option(
                "type",
                format!("cannot store {:?} as {}", v, to.as_str()),
            )
        };
        let value = match (to, self) {
            (_, CellValue::Empty) | (CellType::Empty, _) => CellValue::Empty,
            (CellType::String, v) => CellValue::String(v.as_string()),
            (CellType::Number, v @ (CellValue::Int(_) | CellValue::Float(_))) => v,
            (CellType::Number, CellValue::Bool(b)) => CellValue::Int(b as i64),
            (CellType::Number, v) => match v.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    CellValue::Int(f as i64)
                }
                Some(f) => CellValue::Float(f),
                None => return Err(fail(&v)),
            },
            (CellType::Bool, v) => CellValue::Bool(v.as_bool().ok_or_else(|| fail(&v))?),
            (CellType::Date, CellValue::Int(i)) => {
                CellValue::Date(from_excel_serial(i as f64).ok_or_else(|| fail(&CellValue::Int(i)))?)
            }
            (CellType::Date, CellValue::Float(f)) => {
                CellValue::Date(from_excel_serial(f).ok_or_else(|| fail(&CellValue::Float(f)))?)
            }
            (CellType::Date, v) => CellValue::Date(v.as_date().ok_or_else(|| fail(&v))?),
            (CellType::Error, v) => CellValue::Error(v.as_string()),
        };
        Ok(value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&String> for CellValue {
    fn from(s: &String) -> Self {
        CellValue::String(s.clone())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i as i64)
    }
}

impl From<u32> for CellValue {
    fn from(i: u32) -> Self {
        CellValue::Int(i as i64)
    }
}

impl From<usize> for CellValue {
    fn from(i: usize) -> Self {
        CellValue::Int(i as i64)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(d: NaiveDateTime) -> Self {
        CellValue::Date(d)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d.and_time(NaiveTime::MIN))
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Represents a row of cells read from a sheet
#[derive(Debug, Clone)]
pub struct Row {
    /// Row number (1-based, as in the file)
    pub index: u32,
    /// Cells in this row, column A first
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(index: u32, cells: Vec<CellValue>) -> Self {
        Row { index, cells }
    }

    /// Get cell at column index (0-based)
    pub fn get(&self, col: usize) -> Option<&CellValue> {
        self.cells.get(col)
    }

    /// Get number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if row is empty
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() || self.cells.iter().all(|c| c.is_empty())
    }

    /// Convert row to vector of strings
    pub fn to_strings(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.as_string()).collect()
    }
}

fn format_date(d: &NaiveDateTime) -> String {
    if d.time() == NaiveTime::MIN {
        d.format("%Y-%m-%d").to_string()
    } else {
        d.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Number or date for strings matching the inference policy, `None` for plain text
fn infer_str(s: &str) -> Option<CellValue> {
    if let Some(number) = parse_canonical_number(s) {
        return Some(number);
    }
    parse_iso_datetime(s)
        .filter(|d| to_excel_serial(d).is_some())
        .map(CellValue::Date)
}

/// Digits with at most one '.', accepted only when the number prints back identically
fn parse_canonical_number(s: &str) -> Option<CellValue> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    match s.bytes().filter(|b| *b == b'.').count() {
        0 => {
            let i: i64 = s.parse().ok()?;
            let mut buf = itoa::Buffer::new();
            (buf.format(i) == s).then_some(CellValue::Int(i))
        }
        1 => {
            let f: f64 = s.parse().ok()?;
            (f.is_finite() && f.to_string() == s).then_some(CellValue::Float(f))
        }
        _ => None,
    }
}

/// `YYYY-MM-DD`, optionally followed by ` HH:MM[:SS]` or `THH:MM[:SS]`
pub(crate) fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let bytes = s.as_bytes();
    if bytes.len() < 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let date = NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()?;
    let rest = &s[10..];
    if rest.is_empty() {
        return Some(date.and_time(NaiveTime::MIN));
    }
    let time = rest.strip_prefix(' ').or_else(|| rest.strip_prefix('T'))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .ok()?;
    Some(date.and_time(time))
}

fn serial_epoch() -> NaiveDate {
    // Day 0 of the 1900 date system ("1900-01-00").
    NaiveDate::from_ymd_opt(1899, 12, 31).unwrap_or(NaiveDate::MIN)
}

fn leap_bug_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 3, 1).unwrap_or(NaiveDate::MIN)
}

/// Serial number in the 1900 date system, `None` before 1900-01-01.
///
/// Serials from 61 on include the phantom 1900-02-29 that spreadsheet
/// applications keep for compatibility.
pub fn to_excel_serial(d: &NaiveDateTime) -> Option<f64> {
    let date = d.date();
    let mut days = (date - serial_epoch()).num_days();
    if days < 1 {
        return None;
    }
    if date >= leap_bug_cutoff() {
        days += 1;
    }
    let seconds = d.time().num_seconds_from_midnight() as f64;
    Some(days as f64 + seconds / 86_400.0)
}

/// Inverse of [`to_excel_serial`]; serial 60 (the phantom leap day) maps to 1900-02-28
pub fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_466.0 {
        return None;
    }
    let mut days = serial.trunc() as i64;
    let mut seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    if seconds >= 86_400 {
        days += 1;
        seconds -= 86_400;
    }
    if days >= 60 {
        days -= 1;
    }
    let date = serial_epoch().checked_add_signed(Duration::days(days))?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, 0)?;
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_cell_value_conversions() {
        let val = CellValue::Int(42);
        assert_eq!(val.as_i64(), Some(42));
        assert_eq!(val.as_f64(), Some(42.0));

        let val = CellValue::String("true".to_string());
        assert_eq!(val.as_bool(), Some(true));
    }

    #[test]
    fn test_numeric_inference_is_canonical() {
        assert_eq!(CellValue::from("42").infer(), CellValue::Int(42));
        assert_eq!(CellValue::from("0").infer(), CellValue::Int(0));
        assert_eq!(CellValue::from("3.5").infer(), CellValue::Float(3.5));
        // Leading zeros, trailing zeros and bare dots stay text so they round-trip.
        assert_eq!(CellValue::from("007").infer(), CellValue::from("007"));
        assert_eq!(CellValue::from("1.50").infer(), CellValue::from("1.50"));
        assert_eq!(CellValue::from("1.").infer(), CellValue::from("1."));
        assert_eq!(CellValue::from(".5").infer(), CellValue::from(".5"));
        assert_eq!(CellValue::from("-5").infer(), CellValue::from("-5"));
        assert_eq!(CellValue::from("1.2.3").infer(), CellValue::from("1.2.3"));
        assert_eq!(
            CellValue::from("99999999999999999999").infer(),
            CellValue::from("99999999999999999999")
        );
        assert_eq!(CellValue::from("").infer(), CellValue::from(""));
    }

    #[test]
    fn test_date_inference() {
        assert_eq!(
            CellValue::from("2179-08-12").infer(),
            CellValue::Date(date(2179, 8, 12))
        );
        let with_time = CellValue::from("2024-01-02 03:04:05").infer();
        assert_eq!(with_time.as_string(), "2024-01-02 03:04:05");
        assert_eq!(
            CellValue::from("2024-01-02T03:04").infer().as_string(),
            "2024-01-02 03:04:00"
        );
        // Not representable as a serial number: kept as text.
        assert_eq!(
            CellValue::from("1753-01-31").infer(),
            CellValue::from("1753-01-31")
        );
        assert_eq!(
            CellValue::from("2024-13-01").infer(),
            CellValue::from("2024-13-01")
        );
        assert_eq!(
            CellValue::Date(date(1753, 1, 31)).infer(),
            CellValue::from("1753-01-31")
        );
    }

    #[test]
    fn test_serial_dates() {
        assert_eq!(to_excel_serial(&date(1900, 1, 1)), Some(1.0));
        assert_eq!(to_excel_serial(&date(1900, 2, 14)), Some(45.0));
        assert_eq!(to_excel_serial(&date(1900, 3, 1)), Some(61.0));
        assert_eq!(to_excel_serial(&date(2024, 1, 1)), Some(45292.0));
        assert_eq!(to_excel_serial(&date(1899, 12, 31)), None);

        assert_eq!(from_excel_serial(45.0), Some(date(1900, 2, 14)));
        assert_eq!(from_excel_serial(61.0), Some(date(1900, 3, 1)));
        assert_eq!(from_excel_serial(45292.5).unwrap().to_string(), "2024-01-01 12:00:00");
        assert_eq!(from_excel_serial(0.5), None);
    }

    #[test]
    fn test_coerce_declared_types() {
        assert_eq!(
            CellValue::Int(7).coerce(CellType::String).unwrap(),
            CellValue::from("7")
        );
        assert_eq!(
            CellValue::from("007").coerce(CellType::Number).unwrap(),
            CellValue::Int(7)
        );
        assert_eq!(
            CellValue::Int(45).coerce(CellType::Date).unwrap(),
            CellValue::Date(date(1900, 2, 14))
        );
        assert!(CellValue::from("abc").coerce(CellType::Number).is_err());
        assert_eq!(
            CellValue::Empty.coerce(CellType::Number).unwrap(),
            CellValue::Empty
        );
    }
}
