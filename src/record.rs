//! Records accepted by the row writer
//!
//! A record is either keyed (ordered `key -> value` pairs, like a row of a
//! collection of associative arrays) or positional (plain ordered values).
//! Any type implementing [`IntoRecord`] can be fed to
//! [`SheetWriter::write_data`](crate::SheetWriter::write_data), which is how
//! application-side collections plug into the writer.

use crate::types::CellValue;
use indexmap::IndexMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Keyed(IndexMap<String, CellValue>),
    Positional(Vec<CellValue>),
}

impl Record {
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        Record::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn keyed<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        pairs.into_iter().collect()
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self, Record::Keyed(_))
    }

    /// Keys in insertion order, `None` for positional records
    pub fn keys(&self) -> Option<Vec<String>> {
        match self {
            Record::Keyed(map) => Some(map.keys().cloned().collect()),
            Record::Positional(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Record::Keyed(map) => map.len(),
            Record::Positional(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values in the record's own order
    pub fn into_values(self) -> Vec<CellValue> {
        match self {
            Record::Keyed(map) => map.into_values().collect(),
            Record::Positional(values) => values,
        }
    }

    /// Values reindexed against a header: missing keys become `Empty`, extra keys are dropped.
    ///
    /// Positional records are not reindexed.
    pub fn project(self, header: &[String]) -> Vec<CellValue> {
        match self {
            Record::Keyed(mut map) => header
                .iter()
                .map(|key| map.swap_remove(key).unwrap_or(CellValue::Empty))
                .collect(),
            Record::Positional(values) => values,
        }
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Record::Keyed(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Conversion into a [`Record`]; implement it for your own row types
pub trait IntoRecord {
    fn into_record(self) -> Record;
}

impl IntoRecord for Record {
    fn into_record(self) -> Record {
        self
    }
}

impl<V: Into<CellValue>> IntoRecord for Vec<V> {
    fn into_record(self) -> Record {
        Record::positional(self)
    }
}

impl<V: Into<CellValue>, const N: usize> IntoRecord for [V; N] {
    fn into_record(self) -> Record {
        Record::positional(self)
    }
}

impl<V: Into<CellValue> + Clone> IntoRecord for &[V] {
    fn into_record(self) -> Record {
        Record::positional(self.iter().cloned())
    }
}

impl<K: Into<String>, V: Into<CellValue>> IntoRecord for IndexMap<K, V> {
    fn into_record(self) -> Record {
        self.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<CellValue>> IntoRecord for BTreeMap<K, V> {
    fn into_record(self) -> Record {
        self.into_iter().collect()
    }
}
