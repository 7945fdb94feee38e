//! OOXML container codec
//!
//! Serializes a [`Workbook`](crate::Workbook) into the multi-part zip container
//! and parses such a container back into the grid + style model.
//!
//! - `archive`: zip entries through `s-zip`
//! - `xml_writer`: buffered XML emitter with escaping
//! - `shared_strings`: string table deduplication
//! - `styles`: style table writer and parser
//! - `writer` / `reader`: whole-workbook save and load

pub(crate) mod archive;
pub(crate) mod reader;
pub(crate) mod shared_strings;
pub(crate) mod styles;
pub(crate) mod writer;
pub(crate) mod xml_writer;

pub(crate) use reader::load;
pub(crate) use writer::write_workbook;

pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub(crate) const ROOT_RELS_PART: &str = "_rels/.rels";
pub(crate) const APP_PART: &str = "docProps/app.xml";
pub(crate) const CORE_PART: &str = "docProps/core.xml";
pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";
pub(crate) const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub(crate) const STYLES_PART: &str = "xl/styles.xml";
pub(crate) const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

pub(crate) const XML_DECLARATION: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";
pub(crate) const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub(crate) const NS_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Part name of the n-th worksheet (1-based)
pub(crate) fn worksheet_part(n: usize) -> String {
    format!("xl/worksheets/sheet{}.xml", n)
}
