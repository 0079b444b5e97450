// src/export/mod.rs

//! Rendering a result collection to files and remote repositories.
//!
//! - `csv`: tabular export (and re-import)
//! - `dublin_core`: one Dublin Core XML document per collection
//! - `remote`: item creation in a remote repository

pub mod csv;
pub mod dublin_core;
pub mod remote;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::ResultCollection;
use crate::utils::date::DAY_MONTH_YEAR;

pub use remote::{
    IdentifierResolver, ItemDraft, ItemFailure, RemoteExportReport, RepositoryClient,
    Supplemental, export_to_repository,
};

/// File representations a collection can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    DublinCore,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::DublinCore => "xml",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "dc" | "dublin-core" | "dublincore" | "xml" => Ok(Self::DublinCore),
            other => Err(AppError::validation(format!(
                "unknown export format '{other}' (expected csv, json or dublin-core)"
            ))),
        }
    }
}

/// Write `collection` to `path`, creating parent directories as needed.
pub fn write(collection: &ResultCollection, format: ExportFormat, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| AppError::export(path, e))?;
        }
    }

    let written = match format {
        ExportFormat::Csv => csv::write(collection, path),
        ExportFormat::Json => write_json(collection, path),
        ExportFormat::DublinCore => dublin_core::write(collection, path),
    };
    written.map_err(|e| match e {
        AppError::Export { .. } => e,
        other => AppError::export(path, other),
    })?;

    log::debug!(
        "Exported {} records to {}",
        collection.len(),
        path.display()
    );
    Ok(())
}

fn write_json(collection: &ResultCollection, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, collection.records())?;
    std::io::Write::flush(&mut writer)?;
    Ok(())
}

/// Export file name: `{tag}_{kind}[_{keyword}]_{DD-MM-YYYY}.{ext}`.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use harvester::export::{ExportFormat, file_name};
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
/// assert_eq!(
///     file_name("neon", "json", Some("tick borne"), date, ExportFormat::Csv),
///     "neon_json_tick_borne_07-03-2024.csv"
/// );
/// ```
pub fn file_name(
    tag: &str,
    kind: &str,
    keyword: Option<&str>,
    date: NaiveDate,
    format: ExportFormat,
) -> String {
    let date = date.format(DAY_MONTH_YEAR);
    match keyword.map(sanitize).filter(|k| !k.is_empty()) {
        Some(keyword) => format!("{tag}_{kind}_{keyword}_{date}.{}", format.extension()),
        None => format!("{tag}_{kind}_{date}.{}", format.extension()),
    }
}

fn sanitize(keyword: &str) -> String {
    keyword
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, 5).unwrap()
    }

    #[test]
    fn test_file_name_without_keyword() {
        assert_eq!(
            file_name("LTER", "list", None, date(), ExportFormat::Json),
            "LTER_list_05-01-2022.json"
        );
        assert_eq!(
            file_name("LTER", "list", Some("  "), date(), ExportFormat::DublinCore),
            "LTER_list_05-01-2022.xml"
        );
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!(
            "dublin-core".parse::<ExportFormat>().unwrap(),
            ExportFormat::DublinCore
        );
        assert_eq!("dc".parse::<ExportFormat>().unwrap(), ExportFormat::DublinCore);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_file_name_sanitizes_keyword() {
        assert_eq!(
            file_name("knb", "html", Some("tick-borne/lyme?"), date(), ExportFormat::Csv),
            "knb_html_tick-borne_lyme__05-01-2022.csv"
        );
    }

    #[test]
    fn test_json_export_omits_absent_link() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("out.json");
        let collection: ResultCollection = vec![
            Record::builder().title("a").build(),
            Record::builder().title("b").link(Some(String::new())).build(),
        ]
        .into_iter()
        .collect();

        collection.export(ExportFormat::Json, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value[0].get("link").is_none());
        assert_eq!(value[1]["link"], "");
    }

    #[test]
    fn test_export_is_repeatable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");
        let collection: ResultCollection =
            std::iter::once(Record::builder().title("a").identifier("10.1/a").build()).collect();

        collection.export(ExportFormat::Csv, &path).unwrap();
        let first = fs::read(&path).unwrap();
        collection.export(ExportFormat::Csv, &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_export_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        // The destination is an existing directory.
        let err = ResultCollection::new()
            .export(ExportFormat::Csv, tmp.path())
            .unwrap_err();
        assert!(matches!(err, AppError::Export { .. }));
    }
}
