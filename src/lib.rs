//! # fastexcel
//!
//! A Rust library for reading and writing XLSX workbooks: streaming row
//! sources, deduplicated cell styles and area-based formatting.
//!
//! ## Features
//!
//! - **Row Writer**: Feed any lazy sequence of keyed or positional records; records are pulled one at a time
//! - **Headers**: Derive the header row from the first keyed record, or fix the key order up front
//! - **Style Registry**: Structurally equal styles always share one index in the saved file
//! - **Areas**: Queue values, merges, borders, fills and fonts over ranges and apply them in order
//! - **Columns**: Fixed or automatic widths and per-column styles
//! - **Reading**: Rows keyed by column letter with type tags, style indices and merge regions
//! - **Atomic Save**: A failed save never leaves a half-written file under the target name
//!
//! ## Quick Start
//!
//! ### Writing
//!
//! ```rust,no_run
//! use fastexcel::{Record, Workbook};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut book = Workbook::create(&["Movies"])?;
//! let mut sheet = book.get_sheet(None)?;
//!
//! sheet.with_headers(None).apply_font_style_bold();
//! sheet.write_data(vec![
//!     Record::keyed([("Title", "Alien"), ("Year", "1979")]),
//!     Record::keyed([("Title", "Aliens"), ("Year", "1986")]),
//! ])?;
//! sheet.set_col_width("A", "auto")?;
//!
//! sheet
//!     .begin_area()
//!     .set_value("A5:B5", "Movie Character")
//!     .apply_outer_border("thin")
//!     .apply_bg_color("#FFFF00");
//!
//! book.save("movies.xlsx")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading
//!
//! ```rust,no_run
//! use fastexcel::ExcelReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = ExcelReader::open("movies.xlsx")?;
//! for (row, cells) in reader.read_rows(false, Some("Movies"), true)? {
//!     for (col, cell) in cells {
//!         println!("{}{} = {} ({})", col, row, cell.value, cell.cell_type);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod area;
pub mod config;
pub mod error;
pub mod grid;
mod package;
pub mod reader;
pub mod record;
pub mod sheet;
pub mod storage;
pub mod style;
pub mod types;
pub mod workbook;
pub mod writer;

pub use address::{CellAddress, CellRange};
pub use area::Area;
pub use config::{ExcelConfig, WorkbookBuilder};
pub use error::{ExcelError, Result};
pub use grid::{CellData, CellGrid};
pub use reader::{ExcelReader, ReadCell};
pub use record::{IntoRecord, Record};
pub use sheet::{ColWidth, ColumnOptions, Sheet};
pub use storage::{StorageDir, StoragePath};
pub use style::{Style, StyleFacet, StyleRegistry};
pub use types::{CellType, CellValue, Row};
pub use workbook::Workbook;
pub use writer::SheetWriter;
