// src/pipeline/normalize.rs

//! Raw source results to canonical records.
//!
//! Every source shape funnels through [`Normalizer`]: key/value mappings go
//! through the source's [`FieldMapping`], fetched pages through link
//! extraction. Missing optional fields fall back to record defaults.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{FieldMapping, Record};
use crate::sources::{RawRecord, ResultKind};
use crate::utils::date::{DAY_MONTH_YEAR, from_parts};
use crate::utils::html::anchors;
use crate::utils::url::is_absolute;

const VOID_LINK: &str = "javascript:void(0)";

/// Per-source normalization context.
pub struct Normalizer<'a> {
    tag: &'a str,
    mapping: &'a FieldMapping,
}

impl<'a> Normalizer<'a> {
    pub fn new(tag: &'a str, mapping: &'a FieldMapping) -> Self {
        Self { tag, mapping }
    }

    /// Normalize one raw result along the path its result kind asks for.
    ///
    /// Mappings yield one record, pages one record per outbound link.
    pub fn normalize(
        &self,
        kind: ResultKind,
        raw: &RawRecord,
        retrieved: NaiveDate,
    ) -> Result<Vec<Record>> {
        match (kind, raw) {
            (ResultKind::Json | ResultKind::List, RawRecord::Mapping(map)) => {
                Ok(vec![self.from_mapping(map)?])
            }
            (ResultKind::Html, RawRecord::Page { url, html }) => {
                self.from_page(url, html, retrieved)
            }
            (kind, RawRecord::Mapping(_)) => Err(AppError::parse(format!(
                "{} source returned a key/value record where a page was expected",
                kind
            ))),
            (kind, RawRecord::Page { .. }) => Err(AppError::parse(format!(
                "{} source returned a page where a key/value record was expected",
                kind
            ))),
        }
    }

    /// Map one loosely-typed record onto the canonical fields.
    pub fn from_mapping(&self, raw: &Map<String, Value>) -> Result<Record> {
        for field in &self.mapping.required {
            let present = self
                .mapping
                .key_for(field)
                .and_then(|key| lookup(raw, key))
                .is_some();
            if !present {
                return Err(AppError::missing_field(self.tag, field.as_str()));
            }
        }

        let get = |key: &str| lookup(raw, key);
        let m = self.mapping;

        let source = get(&m.source)
            .and_then(text)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.tag.to_string());

        let link = get(&m.link).map(|v| text(v).unwrap_or_default());

        let mut builder = Record::builder()
            .title(get(&m.title).and_then(text).unwrap_or_default())
            .authors(
                get(&m.authors)
                    .map(|v| authors(v, &m.author_name_keys))
                    .unwrap_or_default(),
            )
            .link(link)
            .abstract_text(get(&m.abstract_text).and_then(text).unwrap_or_default())
            .source(source)
            .keywords(get(&m.keywords).map(keywords).unwrap_or_default())
            .identifier(get(&m.identifier).and_then(text).unwrap_or_default())
            .date(get(&m.date).and_then(date).unwrap_or_default());

        if let Some(kind) = get(&m.datatype).and_then(datatype) {
            builder = builder.datatype(kind);
        }

        Ok(builder.build())
    }

    /// One record per distinct absolute outbound link on a page.
    pub fn from_page(
        &self,
        page_url: &str,
        html: &str,
        retrieved: NaiveDate,
    ) -> Result<Vec<Record>> {
        let own = page_url.trim_end_matches('/');
        let date = retrieved.format(DAY_MONTH_YEAR).to_string();
        let mut seen = HashSet::new();

        let records: Vec<Record> = anchors(html)?
            .into_iter()
            .filter(|a| a.href != VOID_LINK && is_absolute(&a.href))
            .filter(|a| a.href.trim_end_matches('/') != own)
            .filter(|a| seen.insert(a.href.clone()))
            .map(|a| {
                Record::builder()
                    .title(a.text)
                    .link(Some(a.href))
                    .source(self.tag)
                    .date(date.as_str())
                    .build()
            })
            .collect();

        log::debug!("[{}] {} links extracted from {page_url}", self.tag, records.len());
        Ok(records)
    }
}

/// Resolve a plain key or a JSON pointer; `null` counts as absent.
fn lookup<'v>(raw: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    let value = match key.strip_prefix('/') {
        Some(path) => {
            let (head, tail) = match path.find('/') {
                Some(i) => (&path[..i], &path[i..]),
                None => (path, ""),
            };
            let head = head.replace("~1", "/").replace("~0", "~");
            let value = raw.get(&head)?;
            if tail.is_empty() {
                value
            } else {
                value.pointer(tail)?
            }
        }
        None => raw.get(key)?,
    };

    (!value.is_null()).then_some(value)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text fields: scalars, or arrays of scalars joined with a space.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        other => scalar(other),
    }
}

/// Display name of a structured person entry.
fn person_name(person: &Map<String, Value>, name_keys: &[String]) -> Option<String> {
    let field = |key: &str| {
        person
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    if let Some(name) = name_keys.iter().find_map(|k| field(k.as_str())) {
        return Some(name.to_string());
    }

    for (last, first) in [("family", "given"), ("last_name", "first_name")] {
        match (field(last), field(first)) {
            (Some(l), Some(f)) => return Some(format!("{l}, {f}")),
            (Some(l), None) => return Some(l.to_string()),
            (None, Some(f)) => return Some(f.to_string()),
            (None, None) => {}
        }
    }
    None
}

/// Authors: structured persons, plain strings, or one `;`-joined string.
fn authors(value: &Value, name_keys: &[String]) -> Vec<String> {
    let from_item = |item: &Value| match item {
        Value::Object(person) => person_name(person, name_keys),
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        _ => None,
    };

    match value {
        Value::Array(items) => items.iter().filter_map(from_item).collect(),
        Value::String(s) => split_list(s, &[';']),
        Value::Object(_) => from_item(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn keywords(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => split_list(s, &[';', ',']),
        other => scalar(other).into_iter().collect(),
    }
}

fn datatype(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => scalar(other),
    }
}

/// Dates: strings, bare years, or CSL `{"date-parts": [[y, m, d]]}`.
fn date(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => {
            let parts = obj.get("date-parts")?.as_array()?.first()?.as_array()?;
            from_parts(&parts.iter().filter_map(Value::as_i64).collect::<Vec<_>>())
        }
        Value::Array(parts) => {
            from_parts(&parts.iter().filter_map(Value::as_i64).collect::<Vec<_>>())
        }
        _ => None,
    }
}

fn split_list(s: &str, separators: &[char]) -> Vec<String> {
    s.split(separators)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn normalize(value: Value) -> Record {
        let mapping = FieldMapping::default();
        Normalizer::new("test", &mapping).from_mapping(&map(value)).unwrap()
    }

    #[test]
    fn test_abstract_markup_stripped() {
        let record = normalize(json!({"abstract": "<b>Bold</b> text"}));
        assert_eq!(record.abstract_text(), "Bold text");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let record = normalize(json!({}));
        assert_eq!(record.title(), "");
        assert!(record.authors().is_empty());
        assert_eq!(record.link(), None);
        assert_eq!(record.source(), "test");
        assert_eq!(record.identifier(), "");
        assert_eq!(record.datatype(), "unknown");
        assert_eq!(record.date(), "");
    }

    #[test]
    fn test_structured_authors_preserve_order_and_skip_null() {
        let record = normalize(json!({
            "authors": [
                {"name": "Ada Lovelace"},
                null,
                {"family": "Hopper", "given": "Grace"},
                {"last_name": "Turing", "first_name": "Alan"},
                {"affiliation": "nowhere"}
            ]
        }));
        assert_eq!(
            record.authors(),
            ["Ada Lovelace", "Hopper, Grace", "Turing, Alan"]
        );
    }

    #[test]
    fn test_flat_author_string() {
        let record = normalize(json!({"authors": "Smith, Jane; Doe, John;"}));
        assert_eq!(record.authors(), ["Smith, Jane", "Doe, John"]);
    }

    #[test]
    fn test_link_absent_vs_empty() {
        assert_eq!(normalize(json!({"link": null})).link(), None);
        assert_eq!(normalize(json!({"link": ""})).link(), Some(""));
        assert_eq!(
            normalize(json!({"link": "https://a.org/x"})).link(),
            Some("https://a.org/x")
        );
    }

    #[test]
    fn test_value_shapes() {
        let record = normalize(json!({
            "title": ["Tick", "survey"],
            "keywords": "ticks; lyme,  ixodes",
            "datatype": ["TABULAR_DATA", "DATASET"],
            "date": {"date-parts": [[2020, 4, 1]]},
            "doi": "10.5061/dryad.x",
            "source": ""
        }));
        assert_eq!(record.title(), "Tick survey");
        assert_eq!(record.keywords(), ["ticks", "lyme", "ixodes"]);
        assert_eq!(record.datatype(), "TABULAR_DATA, DATASET");
        assert_eq!(record.date(), "2020-04-01");
        assert_eq!(record.identifier(), "10.5061/dryad.x");
        assert_eq!(record.source(), "test");
    }

    #[test]
    fn test_pointer_keys() {
        let mapping = FieldMapping {
            title: "/containerTitle/0".to_string(),
            identifier: "/doi/id".to_string(),
            ..FieldMapping::default()
        };
        let record = Normalizer::new("mendeleydata", &mapping)
            .from_mapping(&map(json!({
                "containerTitle": ["Nested title"],
                "doi": {"id": "10.17632/abc"}
            })))
            .unwrap();
        assert_eq!(record.title(), "Nested title");
        assert_eq!(record.identifier(), "10.17632/abc");
    }

    #[test]
    fn test_required_field_missing() {
        let mapping = FieldMapping {
            required: vec!["identifier".to_string()],
            ..FieldMapping::default()
        };
        let normalizer = Normalizer::new("neon", &mapping);

        let err = normalizer.from_mapping(&map(json!({"title": "x"}))).unwrap_err();
        assert!(matches!(err, AppError::MissingField { ref field, .. } if field == "identifier"));

        assert!(normalizer.from_mapping(&map(json!({"doi": "10.1/a"}))).is_ok());
    }

    #[test]
    fn test_page_links() {
        let mapping = FieldMapping::default();
        let normalizer = Normalizer::new("knb", &mapping);
        let html = r#"<html><body>
            <a href="https://search.example.org/q/ticks/">Self</a>
            <a href="https://data.example.org/1">Dataset one</a>
            <a href="javascript:void(0)">Menu</a>
            <a href="/relative">Relative</a>
            <a href="https://data.example.org/1">Dataset one again</a>
            <a href="https://data.example.org/2">Dataset two</a>
        </body></html>"#;
        let retrieved = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();

        let records = normalizer
            .normalize(
                ResultKind::Html,
                &RawRecord::Page {
                    url: "https://search.example.org/q/ticks".to_string(),
                    html: html.to_string(),
                },
                retrieved,
            )
            .unwrap();

        let links: Vec<_> = records.iter().filter_map(Record::link).collect();
        assert_eq!(
            links,
            vec!["https://data.example.org/1", "https://data.example.org/2"]
        );
        assert_eq!(records[0].title(), "Dataset one");
        assert_eq!(records[0].date(), "09-02-2024");
        assert_eq!(records[0].source(), "knb");
        assert!(!records[0].has_identifier());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let mapping = FieldMapping::default();
        let normalizer = Normalizer::new("knb", &mapping);
        let result = normalizer.normalize(
            ResultKind::Html,
            &RawRecord::Mapping(Map::new()),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert!(result.is_err());
    }
}
