//! Shared strings table for string deduplication

use super::xml_writer::XmlWriter;
use super::NS_MAIN;
use crate::error::Result;
use std::collections::HashMap;
use std::io::Write;

/// Shared strings table that deduplicates strings across the workbook
pub(crate) struct SharedStrings {
    strings: Vec<String>,
    string_map: HashMap<String, u32>,
    /// Total references, including repeats
    references: usize,
}

impl SharedStrings {
    pub(crate) fn new() -> Self {
        SharedStrings {
            strings: Vec::with_capacity(1000),
            string_map: HashMap::with_capacity(1000),
            references: 0,
        }
    }

    /// Add a string reference and get its index
    pub(crate) fn add_string(&mut self, s: &str) -> u32 {
        self.references += 1;
        if let Some(&index) = self.string_map.get(s) {
            return index;
        }
        let index = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.string_map.insert(s.to_string(), index);
        index
    }

    /// Number of unique strings
    pub(crate) fn count(&self) -> usize {
        self.strings.len()
    }

    pub(crate) fn write_xml<W: Write>(&self, writer: &mut XmlWriter<W>) -> Result<()> {
        writer.declaration()?;
        writer.start_element("sst")?;
        writer.attribute("xmlns", NS_MAIN)?;
        writer.attribute_int("count", self.references)?;
        writer.attribute_int("uniqueCount", self.strings.len())?;
        writer.close_start_tag()?;

        for s in &self.strings {
            writer.write_str("<si>")?;
            // Leading/trailing whitespace is dropped by readers unless preserved.
            if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
                writer.write_str("<t xml:space=\"preserve\">")?;
            } else {
                writer.write_str("<t>")?;
            }
            writer.write_escaped(s)?;
            writer.write_str("</t></si>")?;
        }

        writer.end_element("sst")?;
        writer.flush()?;
        Ok(())
    }
}

impl Default for SharedStrings {
    fn default() -> Self {
        Self::new()
    }
}
