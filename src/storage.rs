//! Base storage directory resolution for `Workbook::save_to`
//!
//! The engine never reads an application's configuration directly; the
//! caller hands in a [`StoragePath`] resolver (a directory, or any closure)
//! when building the workbook.

use std::fmt;
use std::path::{Path, PathBuf};

/// Maps a relative file name to its absolute location
pub trait StoragePath: Send + Sync {
    fn resolve_storage_path(&self, relative: &Path) -> PathBuf;
}

/// Resolve everything under one base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDir {
    base: PathBuf,
}

impl StorageDir {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        StorageDir {
            base: base.as_ref().to_path_buf(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl StoragePath for StorageDir {
    fn resolve_storage_path(&self, relative: &Path) -> PathBuf {
        self.base.join(relative)
    }
}

impl<F> StoragePath for F
where
    F: Fn(&Path) -> PathBuf + Send + Sync,
{
    fn resolve_storage_path(&self, relative: &Path) -> PathBuf {
        self(relative)
    }
}

impl fmt::Debug for dyn StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoragePath")
    }
}
