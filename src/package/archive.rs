//! Zip container access on top of `s-zip`

use crate::error::{ExcelError, Result};
use s_zip::{StreamingZipReader, StreamingZipWriter};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Pseudo part name used when the archive itself cannot be read
pub(crate) const CONTAINER: &str = "[container]";

/// Streams parts into a new archive; each part is compressed as it is written
pub(crate) struct ArchiveWriter {
    zip: StreamingZipWriter<File>,
    current: Option<String>,
}

impl ArchiveWriter {
    pub(crate) fn create(path: &Path, compression_level: u32) -> Result<Self> {
        let zip = StreamingZipWriter::with_compression(path, compression_level.min(9))
            .map_err(|e| ExcelError::WriteError(e.to_string()))?;
        Ok(ArchiveWriter { zip, current: None })
    }

    /// Open a new entry; the previous one is closed implicitly
    pub(crate) fn start_part(&mut self, name: &str) -> Result<()> {
        tracing::trace!(part = name, "writing part");
        self.zip
            .start_entry(name)
            .map_err(|e| ExcelError::WriteError(format!("{}: {}", name, e)))?;
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Write a whole part in one go
    pub(crate) fn write_part(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.start_part(name)?;
        self.write_all(data)?;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<()> {
        self.zip
            .finish()
            .map_err(|e| ExcelError::WriteError(e.to_string()))?;
        Ok(())
    }
}

impl Write for ArchiveWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.current.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "no archive entry started",
            ));
        }
        self.zip
            .write_data(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Random access to the parts of an existing archive
pub(crate) struct ArchiveReader {
    zip: StreamingZipReader,
}

impl ArchiveReader {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        // Surface missing or unreadable paths as IO errors, not format errors.
        std::fs::metadata(path)?;
        let zip = StreamingZipReader::open(path).map_err(|e| ExcelError::format(CONTAINER, e))?;
        Ok(ArchiveReader { zip })
    }

    pub(crate) fn has_part(&self, name: &str) -> bool {
        self.zip.entries().iter().any(|e| e.name == name)
    }

    pub(crate) fn part_names(&self) -> Vec<String> {
        self.zip.entries().iter().map(|e| e.name.clone()).collect()
    }

    /// Decompressed bytes of a part; a missing part is a format error naming it
    pub(crate) fn read_part(&mut self, name: &str) -> Result<Vec<u8>> {
        if !self.has_part(name) {
            return Err(ExcelError::format(name, "part missing from container"));
        }
        self.zip
            .read_entry_by_name(name)
            .map_err(|e| ExcelError::format(name, e))
    }

    /// Like [`read_part`](Self::read_part) but `None` when the part does not exist
    pub(crate) fn read_optional(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        if self.has_part(name) {
            self.read_part(name).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.zip");

        let mut writer = ArchiveWriter::create(&path, 6).unwrap();
        writer.write_part("a.xml", b"<a/>").unwrap();
        writer.start_part("dir/b.xml").unwrap();
        writer.write_all(b"<b>").unwrap();
        writer.write_all(b"</b>").unwrap();
        writer.finish().unwrap();

        let mut reader = ArchiveReader::open(&path).unwrap();
        assert!(reader.has_part("dir/b.xml"));
        assert_eq!(reader.read_part("dir/b.xml").unwrap(), b"<b></b>");
        assert!(reader.read_optional("c.xml").unwrap().is_none());
        match reader.read_part("c.xml") {
            Err(ExcelError::InvalidFormat { part, .. }) => assert_eq!(part, "c.xml"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ArchiveReader::open(&dir.path().join("nope.xlsx"));
        assert!(matches!(result, Err(ExcelError::IoError(_))));
    }

    #[test]
    fn test_open_garbage_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.xlsx");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();
        match ArchiveReader::open(&path) {
            Err(ExcelError::InvalidFormat { part, .. }) => assert_eq!(part, CONTAINER),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
