//! Buffered XML writer with minimal allocations

use crate::error::Result;
use std::io::Write;

/// Writes XML straight to the underlying sink through a small reusable buffer
pub(crate) struct XmlWriter<W: Write> {
    writer: W,
    buffer: Vec<u8>,
    num: itoa::Buffer,
    /// Control characters removed since the last flush
    dropped: usize,
}

impl<W: Write> XmlWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        XmlWriter {
            writer,
            buffer: Vec::with_capacity(8192),
            num: itoa::Buffer::new(),
            dropped: 0,
        }
    }

    /// `<?xml ...?>` header every part starts with
    pub(crate) fn declaration(&mut self) -> Result<()> {
        self.write_str(super::XML_DECLARATION)
    }

    #[inline]
    pub(crate) fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > 4096 {
            self.flush_buffer()?;
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_raw(s.as_bytes())
    }

    /// `<name` (attributes may follow)
    #[inline]
    pub(crate) fn start_element(&mut self, name: &str) -> Result<()> {
        self.write_raw(b"<")?;
        self.write_str(name)
    }

    #[inline]
    pub(crate) fn end_element(&mut self, name: &str) -> Result<()> {
        self.write_raw(b"</")?;
        self.write_str(name)?;
        self.write_raw(b">")
    }

    /// `<name/>`
    #[inline]
    pub(crate) fn empty_element(&mut self, name: &str) -> Result<()> {
        self.write_raw(b"<")?;
        self.write_str(name)?;
        self.write_raw(b"/>")
    }

    #[inline]
    pub(crate) fn attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.write_raw(b" ")?;
        self.write_str(name)?;
        self.write_raw(b"=\"")?;
        self.write_escaped(value)?;
        self.write_raw(b"\"")
    }

    #[inline]
    pub(crate) fn attribute_int<I: itoa::Integer>(&mut self, name: &str, value: I) -> Result<()> {
        self.write_raw(b" ")?;
        self.write_str(name)?;
        self.write_raw(b"=\"")?;
        self.write_int(value)?;
        self.write_raw(b"\"")
    }

    pub(crate) fn attribute_f64(&mut self, name: &str, value: f64) -> Result<()> {
        self.write_raw(b" ")?;
        self.write_str(name)?;
        self.write_raw(b"=\"")?;
        self.write_str(&value.to_string())?;
        self.write_raw(b"\"")
    }

    #[inline]
    pub(crate) fn write_int<I: itoa::Integer>(&mut self, value: I) -> Result<()> {
        let formatted = self.num.format(value);
        self.buffer.extend_from_slice(formatted.as_bytes());
        Ok(())
    }

    /// `>`
    #[inline]
    pub(crate) fn close_start_tag(&mut self) -> Result<()> {
        self.write_raw(b">")
    }

    /// `/>`
    #[inline]
    pub(crate) fn close_empty(&mut self) -> Result<()> {
        self.write_raw(b"/>")
    }

    /// Text or attribute content with XML escaping.
    ///
    /// Control characters that XML 1.0 cannot carry are dropped and counted;
    /// the next [`flush`](Self::flush) reports them with a warning.
    #[inline]
    pub(crate) fn write_escaped(&mut self, text: &str) -> Result<()> {
        for byte in text.bytes() {
            match byte {
                b'&' => self.buffer.extend_from_slice(b"&amp;"),
                b'<' => self.buffer.extend_from_slice(b"&lt;"),
                b'>' => self.buffer.extend_from_slice(b"&gt;"),
                b'"' => self.buffer.extend_from_slice(b"&quot;"),
                b'\'' => self.buffer.extend_from_slice(b"&apos;"),
                b'\t' | b'\n' | b'\r' => self.buffer.push(byte),
                0x00..=0x1F => self.dropped += 1,
                _ => self.buffer.push(byte),
            }
        }
        if self.buffer.len() > 4096 {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn dropped_controls(&self) -> usize {
        self.dropped
    }

    /// Flush buffer to underlying writer
    pub(crate) fn flush(&mut self) -> Result<()> {
        if self.dropped > 0 {
            tracing::warn!(
                dropped = self.dropped,
                "control characters removed from text, XML cannot store them"
            );
            self.dropped = 0;
        }
        self.flush_buffer()?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_writer() {
        let mut output = Vec::new();
        let mut writer = XmlWriter::new(&mut output);

        writer.start_element("row").unwrap();
        writer.attribute_int("r", 42u32).unwrap();
        writer.attribute("spans", "1:3").unwrap();
        writer.close_start_tag().unwrap();
        writer.empty_element("c").unwrap();
        writer.end_element("row").unwrap();
        writer.flush().unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "<row r=\"42\" spans=\"1:3\"><c/></row>"
        );
    }

    #[test]
    fn test_xml_escaping() {
        let mut output = Vec::new();
        let mut writer = XmlWriter::new(&mut output);

        writer.write_escaped("Fish & \"Chips\" <b>\u{1}é").unwrap();
        writer.write_escaped("tab\tkept\u{7}\u{1b}").unwrap();
        assert_eq!(writer.dropped_controls(), 3);
        writer.flush().unwrap();
        assert_eq!(writer.dropped_controls(), 0);

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Fish &amp; &quot;Chips&quot; &lt;b&gt;étab\tkept"
        );
    }
}
