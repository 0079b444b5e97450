// src/export/csv.rs

//! Tabular export.
//!
//! Columns follow the historical spreadsheet layout; list fields are stored
//! as JSON arrays so names containing commas survive the trip.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Record, ResultCollection};
use crate::utils::date::day_month_year;

/// Header row of every tabular export.
pub const HEADERS: [&str; 9] = [
    "Title", "Authors", "Source", "Link", "Abstract", "Keywords", "DOI", "Datatype", "Date",
];

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Authors")]
    authors: String,
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "Link")]
    link: String,
    #[serde(rename = "Abstract")]
    abstract_text: String,
    #[serde(rename = "Keywords")]
    keywords: String,
    #[serde(rename = "DOI")]
    doi: String,
    #[serde(rename = "Datatype")]
    datatype: String,
    #[serde(rename = "Date")]
    date: String,
}

impl CsvRow {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            title: record.title().to_string(),
            authors: serde_json::to_string(record.authors())?,
            source: record.source().to_string(),
            link: record.link().unwrap_or_default().to_string(),
            abstract_text: record.abstract_text().to_string(),
            keywords: serde_json::to_string(record.keywords())?,
            doi: record.identifier().to_string(),
            datatype: record.datatype().to_string(),
            date: day_month_year(record.date()),
        })
    }

    fn into_record(self) -> Record {
        Record::builder()
            .title(self.title)
            .authors(parse_list(&self.authors))
            .source(self.source)
            .link(Some(self.link).filter(|l| !l.is_empty()))
            .abstract_text(self.abstract_text)
            .keywords(parse_list(&self.keywords))
            .identifier(self.doi)
            .datatype(self.datatype)
            .date(self.date)
            .build()
    }
}

/// List cells: a JSON array, or plain `;`-joined text from hand-edited sheets.
fn parse_list(cell: &str) -> Vec<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Vec::new();
    }
    if let Ok(items) = serde_json::from_str::<Vec<String>>(cell) {
        return items;
    }
    cell.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Write every record as one row.
pub fn write(collection: &ResultCollection, path: &Path) -> Result<()> {
    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    writer.write_record(HEADERS)?;
    for record in collection {
        writer.serialize(CsvRow::from_record(record)?)?;
    }
    writer.flush()?;
    Ok(())
}

/// Rebuild a collection from a tabular export.
pub fn read(path: &Path) -> Result<ResultCollection> {
    let mut reader = ::csv::Reader::from_path(path)?;
    let mut collection = ResultCollection::new();
    for row in reader.deserialize::<CsvRow>() {
        collection.append(row?.into_record());
    }
    log::debug!("Read {} records from {}", collection.len(), path.display());
    Ok(collection)
}
