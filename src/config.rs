//! Workbook configuration and builder

use crate::error::Result;
use crate::storage::StoragePath;
use crate::workbook::Workbook;
use std::path::PathBuf;

/// Environment variable holding the base directory for `save_to`
pub const STORAGE_PATH_ENV: &str = "FASTEXCEL_STORAGE_PATH";
/// Environment variable holding the deflate level (0-9)
pub const COMPRESSION_LEVEL_ENV: &str = "FASTEXCEL_COMPRESSION_LEVEL";

/// Settings shared by every save of a workbook
#[derive(Debug, Clone, PartialEq)]
pub struct ExcelConfig {
    /// Name of the sheet created when `Workbook::create` gets no names
    pub default_sheet_name: String,
    /// Deflate level for container parts, 0 (store) to 9
    pub compression_level: u32,
    /// Base directory used by `save_to` when no resolver is set explicitly
    pub storage_path: Option<PathBuf>,
    /// Characters added to the longest value when sizing `auto` columns
    pub auto_width_padding: f64,
    /// Upper bound for `auto` column widths
    pub max_auto_width: f64,
}

impl Default for ExcelConfig {
    fn default() -> Self {
        ExcelConfig {
            default_sheet_name: "Sheet1".to_string(),
            compression_level: 6,
            storage_path: None,
            auto_width_padding: 2.0,
            max_auto_width: 100.0,
        }
    }
}

impl ExcelConfig {
    /// Defaults overridden by `FASTEXCEL_STORAGE_PATH` and `FASTEXCEL_COMPRESSION_LEVEL`
    pub fn from_env() -> Self {
        let mut config = ExcelConfig::default();
        if let Some(path) = std::env::var_os(STORAGE_PATH_ENV).filter(|p| !p.is_empty()) {
            config.storage_path = Some(PathBuf::from(path));
        }
        if let Some(level) = std::env::var(COMPRESSION_LEVEL_ENV)
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
        {
            config.compression_level = level.min(9);
        }
        config
    }

    /// Width of an `auto` column whose longest rendered value has `chars` characters
    pub fn auto_width(&self, chars: usize) -> f64 {
        (chars as f64 * 1.2 + self.auto_width_padding).min(self.max_auto_width)
    }
}

/// Builder for configured workbooks
///
/// # Examples
///
/// ```no_run
/// use fastexcel::WorkbookBuilder;
///
/// # fn main() -> fastexcel::Result<()> {
/// let mut book = WorkbookBuilder::new()
///     .with_sheets(&["Collection", "Array"])
///     .with_storage_dir("/var/app/storage")
///     .with_compression_level(9)
///     .build()?;
/// book.save_to("exports/report.xlsx")?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct WorkbookBuilder {
    config: ExcelConfig,
    sheets: Vec<String>,
    storage: Option<Box<dyn StoragePath>>,
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit configuration (e.g. [`ExcelConfig::from_env`])
    pub fn with_config(mut self, config: ExcelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sheets(mut self, names: &[&str]) -> Self {
        self.sheets = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Name of the sheet created when no sheet names are given
    pub fn with_sheet_name(mut self, name: &str) -> Self {
        self.config.default_sheet_name = name.to_string();
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.config.compression_level = level.min(9);
        self
    }

    pub fn with_storage_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.storage_path = Some(dir.into());
        self
    }

    /// Custom resolver for `save_to`; takes precedence over the storage directory
    pub fn with_storage<S: StoragePath + 'static>(mut self, storage: S) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    pub fn build(self) -> Result<Workbook> {
        let names: Vec<&str> = self.sheets.iter().map(String::as_str).collect();
        let mut workbook = Workbook::with_config(&names, self.config)?;
        if let Some(storage) = self.storage {
            workbook.set_storage_boxed(storage);
        }
        Ok(workbook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExcelConfig::default();
        assert_eq!(config.default_sheet_name, "Sheet1");
        assert_eq!(config.compression_level, 6);
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn test_auto_width_is_capped() {
        let config = ExcelConfig::default();
        assert!((config.auto_width(10) - 14.0).abs() < 1e-9);
        assert_eq!(config.auto_width(500), 100.0);
    }

    #[test]
    fn test_builder_sheet_name() {
        let book = WorkbookBuilder::new()
            .with_sheet_name("Data")
            .with_compression_level(42)
            .build()
            .unwrap();
        assert_eq!(book.sheet_names(), vec!["Data"]);
        assert_eq!(book.config().compression_level, 9);
    }

    #[test]
    fn test_builder_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut book = WorkbookBuilder::new()
            .with_storage_dir(dir.path())
            .build()
            .unwrap();
        let saved = book.save_to("exports/a.xlsx").unwrap();
        assert!(saved.starts_with(dir.path()));
        assert!(saved.exists());

        let other = tempfile::tempdir().unwrap();
        let base = other.path().to_path_buf();
        let mut book = WorkbookBuilder::new()
            .with_storage_dir(dir.path())
            .with_storage(move |rel: &std::path::Path| base.join("custom").join(rel))
            .build()
            .unwrap();
        let saved = book.save_to("b.xlsx").unwrap();
        assert_eq!(saved, other.path().join("custom").join("b.xlsx"));
    }
}
