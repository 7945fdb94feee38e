//! Error types for the fastexcel library

use thiserror::Error;

/// Result type alias for fastexcel operations
pub type Result<T> = std::result::Result<T, ExcelError>;

/// Main error type for all spreadsheet operations
#[derive(Error, Debug)]
pub enum ExcelError {
    /// IO error wrapper (unreadable / unwritable path)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A container part is missing, corrupt or not recognised
    #[error("Invalid format in '{part}': {message}")]
    InvalidFormat { part: String, message: String },

    /// Internal invariant violated while serializing a workbook
    #[error("Serialization failed: {0}")]
    SerializationError(String),

    /// Invalid sheet name or sheet not found
    #[error("Sheet '{sheet}' not found. Available sheets: {available}")]
    SheetNotFound { sheet: String, available: String },

    /// Style index does not exist in the style registry
    #[error("Style index {index} not found (registry holds {count} styles)")]
    StyleNotFound { index: u32, count: usize },

    /// A sheet with the same name already exists in the workbook
    #[error("Sheet '{0}' already exists")]
    DuplicateSheet(String),

    /// Sheet name rejected by the container format
    #[error("Invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: String },

    /// Invalid cell reference or range
    #[error("Invalid cell reference: {0}")]
    InvalidCell(String),

    /// Unknown or malformed option value (colour, border style, column option)
    #[error("Invalid option '{key}': {message}")]
    InvalidOption { key: String, message: String },

    /// `save_to` called on a workbook without a storage resolver
    #[error("No storage path configured; use save() or configure a storage resolver")]
    StorageNotConfigured,

    /// Error reported by the archive backend while writing
    #[error("Failed to write Excel file: {0}")]
    WriteError(String),
}

impl ExcelError {
    /// True for the "not found" family: missing sheets and dangling style indices.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            ExcelError::SheetNotFound { .. } | ExcelError::StyleNotFound { .. }
        )
    }

    pub(crate) fn format(part: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ExcelError::InvalidFormat {
            part: part.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn option(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ExcelError::InvalidOption {
            key: key.into(),
            message: message.to_string(),
        }
    }
}
