//! Workbook: ordered named sheets sharing one style registry

use crate::config::ExcelConfig;
use crate::error::{ExcelError, Result};
use crate::package;
use crate::sheet::{validate_sheet_name, Sheet};
use crate::storage::{StorageDir, StoragePath};
use crate::style::{Style, StyleRegistry};
use crate::writer::{flush_areas, SheetWriter};
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Unit of save and open.
///
/// Sheets keep their insertion order, which is the tab order in the saved
/// file. Every sheet is owned by the workbook and written through a
/// [`SheetWriter`] borrowed from it.
///
/// # Examples
///
/// ```no_run
/// use fastexcel::Workbook;
///
/// # fn main() -> fastexcel::Result<()> {
/// let mut book = Workbook::create(&["Collection", "Array"])?;
/// book.get_sheet(Some("Array"))?
///     .write_data(vec![vec!["1", "Helen"], vec!["2", "Peter"]])?;
/// book.save("multiple.xlsx")?;
///
/// let reopened = fastexcel::Workbook::open("multiple.xlsx")?;
/// assert_eq!(reopened.sheet_names(), vec!["Collection", "Array"]);
/// # Ok(())
/// # }
/// ```
pub struct Workbook {
    pub(crate) sheets: IndexMap<String, Sheet>,
    pub(crate) styles: StyleRegistry,
    pub(crate) config: ExcelConfig,
    storage: Option<Box<dyn StoragePath>>,
}

impl Workbook {
    /// New workbook with the given sheets, or one default sheet when `names` is empty
    pub fn create(names: &[&str]) -> Result<Self> {
        Self::with_config(names, ExcelConfig::default())
    }

    /// Like [`create`](Self::create); a configured storage directory becomes the `save_to` resolver
    pub fn with_config(names: &[&str], config: ExcelConfig) -> Result<Self> {
        let storage = config
            .storage_path
            .as_ref()
            .map(|dir| Box::new(StorageDir::new(dir)) as Box<dyn StoragePath>);
        let mut book = Workbook {
            sheets: IndexMap::new(),
            styles: StyleRegistry::new(),
            config,
            storage,
        };
        if names.is_empty() {
            let name = book.config.default_sheet_name.clone();
            book.add_sheet(&name)?;
        }
        for name in names {
            book.add_sheet(name)?;
        }
        Ok(book)
    }

    /// Parse an existing file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let book = package::load(path)?;
        tracing::debug!(
            path = %path.display(),
            sheets = book.sheets.len(),
            styles = book.styles.len(),
            "workbook opened"
        );
        Ok(book)
    }

    pub(crate) fn from_parts(sheets: IndexMap<String, Sheet>, styles: StyleRegistry) -> Self {
        Workbook {
            sheets,
            styles,
            config: ExcelConfig::default(),
            storage: None,
        }
    }

    /// Write handle for a sheet; `None` selects the first sheet.
    ///
    /// Names are matched exactly first, then case-insensitively.
    pub fn get_sheet(&mut self, name: Option<&str>) -> Result<SheetWriter<'_>> {
        match name {
            None => self.writer_at(0, ""),
            Some(name) => match self.index_of(name) {
                Some(index) => self.writer_at(index, name),
                None => Err(self.not_found(name)),
            },
        }
    }

    /// Append a new sheet and return its write handle
    pub fn make_sheet(&mut self, name: &str) -> Result<SheetWriter<'_>> {
        let index = self.add_sheet(name)?;
        self.writer_at(index, name)
    }

    fn writer_at(&mut self, index: usize, name: &str) -> Result<SheetWriter<'_>> {
        if index >= self.sheets.len() {
            return Err(self.not_found(name));
        }
        let Workbook { sheets, styles, .. } = self;
        let (_, sheet) = sheets
            .get_index_mut(index)
            .ok_or_else(|| ExcelError::SheetNotFound {
                sheet: name.to_string(),
                available: String::new(),
            })?;
        Ok(SheetWriter::new(sheet, styles))
    }

    fn add_sheet(&mut self, name: &str) -> Result<usize> {
        validate_sheet_name(name)?;
        if let Some(existing) = self.index_of(name) {
            let (taken, _) = self
                .sheets
                .get_index(existing)
                .ok_or_else(|| ExcelError::DuplicateSheet(name.to_string()))?;
            return Err(ExcelError::DuplicateSheet(taken.clone()));
        }
        let (index, _) = self
            .sheets
            .insert_full(name.to_string(), Sheet::new(name));
        tracing::trace!(sheet = name, index, "sheet added");
        Ok(index)
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.sheets.get_index_of(name).or_else(|| {
            let wanted = name.to_lowercase();
            self.sheets
                .keys()
                .position(|k| k.to_lowercase() == wanted)
        })
    }

    fn not_found(&self, name: &str) -> ExcelError {
        ExcelError::SheetNotFound {
            sheet: name.to_string(),
            available: self.sheet_names().join(", "),
        }
    }

    /// Read access to a sheet by name
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.index_of(name)
            .and_then(|i| self.sheets.get_index(i))
            .map(|(_, sheet)| sheet)
    }

    /// Sheets in tab order
    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets.values()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    /// Descriptor behind a style index
    pub fn style(&self, index: u32) -> Result<&Style> {
        self.styles.resolve(index)
    }

    pub fn config(&self) -> &ExcelConfig {
        &self.config
    }

    /// Resolver used by [`save_to`](Self::save_to)
    pub fn set_storage<S: StoragePath + 'static>(&mut self, storage: S) {
        self.storage = Some(Box::new(storage));
    }

    pub(crate) fn set_storage_boxed(&mut self, storage: Box<dyn StoragePath>) {
        self.storage = Some(storage);
    }

    /// Flush the pending areas of every sheet
    pub fn write_areas(&mut self) -> Result<()> {
        for sheet in self.sheets.values_mut() {
            flush_areas(sheet, &mut self.styles)?;
        }
        Ok(())
    }

    /// Save to `path`.
    ///
    /// Pending areas are flushed first. The file is written next to the target
    /// under a temporary name and renamed over it once complete, so a failed
    /// save never leaves a partial file under the final name.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.write_areas()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".fastexcel-")
            .suffix(".tmp")
            .tempfile_in(dir)?
            .into_temp_path();
        package::write_workbook(self, &temp)?;
        temp.persist(path).map_err(|e| ExcelError::IoError(e.error))?;

        tracing::debug!(
            path = %path.display(),
            sheets = self.sheets.len(),
            styles = self.styles.len(),
            "workbook saved"
        );
        Ok(())
    }

    /// Save under the configured storage directory and return the absolute path.
    ///
    /// Missing parent directories are created.
    pub fn save_to<P: AsRef<Path>>(&mut self, relative: P) -> Result<PathBuf> {
        let storage = self
            .storage
            .as_ref()
            .ok_or(ExcelError::StorageNotConfigured)?;
        let target = storage.resolve_storage_path(relative.as_ref());
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.save(&target)?;
        Ok(target)
    }
}

impl fmt::Debug for Workbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workbook")
            .field("sheets", &self.sheets.values().collect::<Vec<_>>())
            .field("styles", &self.styles.len())
            .field("config", &self.config)
            .field("storage", &self.storage.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    #[test]
    fn test_create_defaults_to_one_sheet() {
        let book = Workbook::create(&[]).unwrap();
        assert_eq!(book.sheet_names(), vec!["Sheet1"]);
    }

    #[test]
    fn test_duplicate_names_are_rejected_case_insensitively() {
        let mut book = Workbook::create(&["Collection"]).unwrap();
        match book.make_sheet("collection") {
            Err(ExcelError::DuplicateSheet(name)) => assert_eq!(name, "Collection"),
            other => panic!("unexpected: {:?}", other.map(|w| w.name().to_string())),
        }
        assert!(matches!(
            Workbook::create(&["A", "A"]),
            Err(ExcelError::DuplicateSheet(_))
        ));
    }

    #[test]
    fn test_get_sheet_lookup() {
        let mut book = Workbook::create(&["Collection", "Array"]).unwrap();
        assert_eq!(book.get_sheet(None).unwrap().name(), "Collection");
        assert_eq!(book.get_sheet(Some("array")).unwrap().name(), "Array");
        match book.get_sheet(Some("Callback")) {
            Err(err @ ExcelError::SheetNotFound { .. }) => {
                assert!(err.is_lookup());
                assert!(err.to_string().contains("Collection, Array"));
            }
            other => panic!("unexpected: {:?}", other.map(|w| w.name().to_string())),
        }
    }

    #[test]
    fn test_make_sheet_returns_writer_for_new_sheet() {
        let mut book = Workbook::create(&["Collection"]).unwrap();
        book.make_sheet("Callback")
            .unwrap()
            .write_row(["1", "Helen"])
            .unwrap();
        book.get_sheet(Some("callback"))
            .unwrap()
            .write_row(["2", "Peter"])
            .unwrap();

        assert_eq!(book.sheet_names(), vec!["Collection", "Callback"]);
        let grid = book.sheet("Callback").unwrap().grid();
        assert_eq!(grid.value(2, 2), &CellValue::from("Peter"));
        assert!(book.sheet("Collection").unwrap().grid().is_empty());
    }

    #[test]
    fn test_sheets_are_isolated() {
        let mut book = Workbook::create(&["Collection", "Array"]).unwrap();
        book.get_sheet(Some("Array"))
            .unwrap()
            .set_cell("B2", "Peter")
            .unwrap();
        assert!(book.sheet("Collection").unwrap().grid().is_empty());
        assert_eq!(
            book.sheet("Array").unwrap().grid().value(2, 2),
            &CellValue::from("Peter")
        );
    }

    #[test]
    fn test_failed_save_leaves_no_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut book = Workbook::create(&[]).unwrap();
        let (_, sheet) = book.sheets.get_index_mut(0).unwrap();
        sheet.grid.set_cell(1, 1, "x", Some(99)).unwrap();
        let target = dir.path().join("broken.xlsx");
        assert!(matches!(
            book.save(&target),
            Err(ExcelError::SerializationError(_))
        ));
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_to_requires_storage() {
        let mut book = Workbook::create(&[]).unwrap();
        assert!(matches!(
            book.save_to("a.xlsx"),
            Err(ExcelError::StorageNotConfigured)
        ));
    }

    #[test]
    fn test_save_to_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut book = Workbook::create(&[]).unwrap();
        book.set_storage(StorageDir::new(dir.path()));
        let saved = book.save_to("nested/deeper/out.xlsx").unwrap();
        assert_eq!(saved, dir.path().join("nested/deeper/out.xlsx"));
        assert!(saved.exists());
    }
}
