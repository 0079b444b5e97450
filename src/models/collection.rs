// src/models/collection.rs

//! Ordered accumulator of records for one run (the "briefcase").

use std::path::Path;

use crate::error::Result;
use crate::export::{self, ExportFormat};
use crate::models::Record;

/// Records collected during one run, in insertion order.
///
/// The collection does not deduplicate; that is the pipeline's job, which
/// keeps it usable for exports that must not drop anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultCollection {
    records: Vec<Record>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to the end of the collection.
    pub fn append(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Render every record to `path` in the given format.
    ///
    /// The collection is left untouched, so exporting again after a failure
    /// (or to a second destination) produces the same output.
    pub fn export(&self, format: ExportFormat, path: &Path) -> Result<()> {
        export::write(self, format, path)
    }

    /// Rebuild a collection from a tabular export.
    pub fn read_csv(path: &Path) -> Result<Self> {
        export::csv::read(path)
    }
}

impl FromIterator<Record> for ResultCollection {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl Extend<Record> for ResultCollection {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl IntoIterator for ResultCollection {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultCollection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, doi: &str) -> Record {
        Record::builder().title(title).identifier(doi).build()
    }

    #[test]
    fn test_append_preserves_order() {
        let mut collection = ResultCollection::new();
        assert!(collection.is_empty());

        collection.append(record("first", "10.1/a"));
        collection.append(record("second", ""));
        collection.append(record("third", "10.1/b"));

        assert!(!collection.is_empty());
        assert_eq!(collection.len(), 3);
        let titles: Vec<_> = collection.iter().map(Record::title).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_append_does_not_deduplicate() {
        let mut collection = ResultCollection::new();
        collection.append(record("a", "10.1/a"));
        collection.append(record("b", "10.1/a"));
        assert_eq!(collection.len(), 2);
    }
}
