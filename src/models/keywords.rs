// src/models/keywords.rs

//! Keyword lists driving a batch run.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// Keyword groups read from a keyword list; each row is one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordBatch {
    groups: Vec<Vec<String>>,
}

impl KeywordBatch {
    /// Build a batch from explicit groups.
    pub fn new(groups: Vec<Vec<String>>) -> Self {
        Self { groups }
    }

    /// A batch holding a single keyword.
    pub fn single(keyword: impl Into<String>) -> Self {
        Self::new(vec![vec![keyword.into()]])
    }

    /// Load a CSV keyword list (one group per row).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse CSV content; a leading byte-order mark is ignored.
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut groups = Vec::new();
        for row in reader.records() {
            let row = row?;
            groups.push(row.iter().map(|cell| cell.trim().to_string()).collect());
        }
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Non-empty keywords in row-major order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|k| {
                if k.is_empty() {
                    log::debug!("Skipping empty keyword");
                }
                !k.is_empty()
            })
    }

    /// Number of non-empty keywords.
    pub fn len(&self) -> usize {
        self.groups.iter().flatten().filter(|k| !k.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
