//! Row and cell writing for one sheet
//!
//! [`SheetWriter`] is the write handle returned by
//! [`Workbook::get_sheet`](crate::Workbook::get_sheet) and
//! [`Workbook::make_sheet`](crate::Workbook::make_sheet). It places records
//! from any source on consecutive rows, derives header rows, holds column
//! overrides and queues formatting areas.

use crate::address::CellAddress;
use crate::area::{Area, BorderScope, Format};
use crate::error::Result;
use crate::record::IntoRecord;
use crate::sheet::{parse_column, ColWidth, HeaderMode, Sheet};
use crate::style::{NumberFormat, StyleFacet, StyleRegistry};
use crate::types::{CellType, CellValue};
use chrono::{NaiveTime, Timelike};

/// Write handle for one sheet of a workbook
///
/// # Examples
///
/// ```no_run
/// use fastexcel::{CellValue, Record, Workbook};
///
/// # fn main() -> fastexcel::Result<()> {
/// let mut book = Workbook::create(&["Report"])?;
/// let mut sheet = book.get_sheet(Some("Report"))?;
///
/// sheet.with_headers(None).apply_font_style_bold().write_data(vec![
///     Record::keyed([("id", CellValue::Int(1)), ("name", "Helen".into())]),
///     Record::keyed([("id", CellValue::Int(2)), ("name", "Peter".into())]),
/// ])?;
///
/// book.save("report.xlsx")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SheetWriter<'a> {
    sheet: &'a mut Sheet,
    styles: &'a mut StyleRegistry,
}

impl<'a> SheetWriter<'a> {
    pub(crate) fn new(sheet: &'a mut Sheet, styles: &'a mut StyleRegistry) -> Self {
        SheetWriter { sheet, styles }
    }

    pub fn name(&self) -> &str {
        self.sheet.name()
    }

    /// Read access to the sheet being written
    pub fn sheet(&self) -> &Sheet {
        self.sheet
    }

    /// Emit a header row before the next record.
    ///
    /// With `None` the header is taken from the keys of the first keyed
    /// record. With explicit keys, every keyed record is reindexed against
    /// them: missing keys give empty cells and extra keys are dropped.
    pub fn with_headers(&mut self, keys: Option<&[&str]>) -> &mut Self {
        self.sheet.header = match keys {
            Some(keys) => HeaderMode::Fixed(keys.iter().map(|k| k.to_string()).collect()),
            None => HeaderMode::Derive,
        };
        self
    }

    /// Write records from any source, each on its own row.
    ///
    /// The source is pulled one record at a time, so lazily generated
    /// sources are never collected up front. Returns the number of records
    /// written.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fastexcel::Workbook;
    ///
    /// # fn main() -> fastexcel::Result<()> {
    /// let mut book = Workbook::create(&[])?;
    /// let mut sheet = book.make_sheet("Callback")?;
    /// sheet.write_data((1..=3i64).map(|i| [i, i * 2, i * 3]))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn write_data<I>(&mut self, source: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: IntoRecord,
    {
        let mut written = 0;
        for item in source {
            let record = item.into_record();
            match std::mem::take(&mut self.sheet.header) {
                HeaderMode::Off => {}
                HeaderMode::Derive => {
                    if let Some(keys) = record.keys() {
                        self.write_header(&keys[..])?;
                    }
                }
                HeaderMode::Fixed(keys) => {
                    self.write_header(&keys[..])?;
                }
            }
            let values = match &self.sheet.header_keys {
                Some(keys) => record.project(keys),
                None => record.into_values(),
            };
            self.place_row(values)?;
            written += 1;
        }
        tracing::debug!(sheet = self.sheet.name(), records = written, "records written");
        Ok(written)
    }

    /// Write a header row now and reindex later keyed records against it
    pub fn write_header<S: AsRef<str>>(&mut self, keys: &[S]) -> Result<u32> {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let values = keys
            .iter()
            .map(|k| CellValue::String(k.clone()))
            .collect();
        let row = self.place_row_as_text(values)?;
        self.sheet.header_keys = Some(keys);
        self.sheet.header = HeaderMode::Off;
        Ok(row)
    }

    /// Write one row of positional values, ignoring any header; returns its row number
    pub fn write_row<I, V>(&mut self, values: I) -> Result<u32>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.place_row(values.into_iter().map(Into::into).collect())
    }

    /// Write a single cell by reference, e.g. `"B3"`
    pub fn set_cell(&mut self, cell: &str, value: impl Into<CellValue>) -> Result<&mut Self> {
        let addr: CellAddress = cell.parse()?;
        self.put(addr.row, addr.col, value.into().infer(), &[])?;
        Ok(self)
    }

    /// Like [`set_cell`](Self::set_cell) but stores the value under a declared
    /// type instead of inferring one; `"007"` as [`CellType::String`] keeps its zeros
    pub fn set_cell_as(
        &mut self,
        cell: &str,
        value: impl Into<CellValue>,
        cell_type: CellType,
    ) -> Result<&mut Self> {
        let addr: CellAddress = cell.parse()?;
        self.put(addr.row, addr.col, value.into().coerce(cell_type)?, &[])?;
        Ok(self)
    }

    /// Width of a column given by letters (`"B"`): a number of characters or `"auto"`
    pub fn set_col_width(&mut self, col: &str, width: impl Into<ColWidth>) -> Result<&mut Self> {
        let col = parse_column(col)?;
        self.sheet.columns.entry(col).or_default().width = Some(width.into());
        Ok(self)
    }

    /// Column overrides as `key => value` pairs (`width`, `text-align`,
    /// `font-style`, `font-size`, `font-color`, `fill`, `format`, ...)
    ///
    /// Style options apply to cells written in the column afterwards.
    pub fn set_col_options<I, K, V>(&mut self, col: &str, options: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let col = parse_column(col)?;
        let mut column = self.sheet.columns.get(&col).cloned().unwrap_or_default();
        for (key, value) in options {
            column.set_option(key.as_ref(), value.as_ref())?;
        }
        column.style = self.styles.apply(None, &column.facets)?;
        self.sheet.columns.insert(col, column);
        Ok(self)
    }

    /// Queue a new formatting area; it is applied by [`write_areas`](Self::write_areas) or on save
    pub fn begin_area(&mut self) -> &mut Area {
        let index = self.sheet.pending.len();
        self.sheet.pending.push(Area::new());
        &mut self.sheet.pending[index]
    }

    /// Apply every queued area in order, then clear the queue
    pub fn write_areas(&mut self) -> Result<&mut Self> {
        flush_areas(self.sheet, self.styles)?;
        Ok(self)
    }

    fn row_format(&mut self, format: Format) -> &mut Self {
        self.sheet.row_formats.push(format);
        self
    }

    /// Bold font on the next row written
    pub fn apply_font_style_bold(&mut self) -> &mut Self {
        self.row_format(Format::bold())
    }

    pub fn apply_font_style_italic(&mut self) -> &mut Self {
        self.row_format(Format::italic())
    }

    pub fn apply_font_size(&mut self, points: f64) -> &mut Self {
        self.row_format(Format::font_size(points))
    }

    pub fn apply_font_color(&mut self, color: &str) -> &mut Self {
        self.row_format(Format::FontColor(color.to_string()))
    }

    pub fn apply_bg_color(&mut self, color: &str) -> &mut Self {
        self.row_format(Format::Fill(color.to_string()))
    }

    /// Border on every edge of each cell of the next row written
    pub fn apply_border(&mut self, style: &str) -> &mut Self {
        self.row_format(Format::Border(BorderScope::All, style.to_string()))
    }

    pub fn apply_text_center(&mut self) -> &mut Self {
        self.row_format(Format::text_center())
    }

    pub fn apply_text_align(&mut self, align: &str) -> &mut Self {
        self.row_format(Format::HorizontalAlign(align.to_string()))
    }

    pub fn apply_vertical_align(&mut self, align: &str) -> &mut Self {
        self.row_format(Format::VerticalAlign(align.to_string()))
    }

    pub fn apply_text_wrap(&mut self) -> &mut Self {
        self.row_format(Format::wrap())
    }

    pub fn apply_number_format(&mut self, code: &str) -> &mut Self {
        self.row_format(Format::number_format(code))
    }

    /// Header cells stay text even when a key looks like a number
    fn place_row_as_text(&mut self, values: Vec<CellValue>) -> Result<u32> {
        self.place(values, false)
    }

    fn place_row(&mut self, values: Vec<CellValue>) -> Result<u32> {
        self.place(values, true)
    }

    fn place(&mut self, values: Vec<CellValue>, infer: bool) -> Result<u32> {
        let row = self.sheet.next_row();
        let mut row_facets = Vec::new();
        for format in std::mem::take(&mut self.sheet.row_formats) {
            row_facets.extend(format.uniform_facets()?);
        }
        for (i, value) in values.into_iter().enumerate() {
            let value = if infer { value.infer() } else { value };
            self.put(row, i as u32 + 1, value, &row_facets)?;
        }
        self.sheet.cursor = row + 1;
        Ok(row)
    }

    fn put(&mut self, row: u32, col: u32, value: CellValue, extra: &[StyleFacet]) -> Result<()> {
        store_value(self.sheet, self.styles, row, col, value, extra)
    }
}

/// Store one normalized value with date, column and extra facets layered in that order.
///
/// Every value written to a sheet goes through here, whether it comes from the
/// row writer, `set_cell` or an area.
pub(crate) fn store_value(
    sheet: &mut Sheet,
    styles: &mut StyleRegistry,
    row: u32,
    col: u32,
    value: CellValue,
    extra: &[StyleFacet],
) -> Result<()> {
    let mut facets = Vec::new();
    if let CellValue::Date(d) = &value {
        let has_date_format = sheet
            .grid
            .style_of(row, col)
            .and_then(|idx| styles.resolve(idx).ok())
            .map(|s| s.number_format.is_date())
            .unwrap_or(false);
        if !has_date_format {
            facets.push(StyleFacet::NumberFormat(date_format_for(d.time())));
        }
    }
    if let Some(column) = sheet.columns.get(&col) {
        facets.extend(column.facets.iter().cloned());
    }
    facets.extend(extra.iter().cloned());

    let existing = sheet.grid.get_cell(row, col).is_some();
    if value.is_empty() && facets.is_empty() && !existing {
        // keep the grid sparse; the address is still validated
        CellAddress::new(row, col)?;
        return Ok(());
    }
    let style = styles.apply(sheet.grid.style_of(row, col), &facets)?;
    sheet.grid.store(row, col, value, style)
}

fn date_format_for(time: NaiveTime) -> NumberFormat {
    if time.num_seconds_from_midnight() == 0 {
        NumberFormat::date()
    } else {
        NumberFormat::datetime()
    }
}

/// Apply and clear the pending areas of a sheet.
///
/// Every area is parsed before any of them touches the sheet; on a parse
/// error the sheet and its queue are left as they were.
pub(crate) fn flush_areas(sheet: &mut Sheet, styles: &mut StyleRegistry) -> Result<()> {
    let resolved = sheet
        .pending
        .iter()
        .map(Area::resolve)
        .collect::<Result<Vec<_>>>()?;
    sheet.pending.clear();
    for area in resolved {
        area.apply(sheet, styles)?;
    }
    Ok(())
}
