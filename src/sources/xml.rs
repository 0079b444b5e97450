// src/sources/xml.rs

//! XML listing APIs.
//!
//! The expected document shape is flat:
//!
//! ```text
//! <resultset>            root
//!   <document>           one record
//!     <title>..</title>  one field
//!     <authors>          field with children -> string array
//!       <author>..</author>
//!     </authors>
//!   </document>
//! </resultset>
//! ```

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{FieldMapping, SourceConfig};
use crate::utils::url::expand_template;

use super::{RawRecord, ResultKind, SourceAdapter, fetch_text, mentions};

/// Adapter for repositories answering with an XML record list.
pub struct XmlApiSource {
    tag: String,
    template: String,
    client_filter: bool,
    fields: FieldMapping,
    client: reqwest::Client,
}

impl XmlApiSource {
    pub fn new(config: &SourceConfig, client: reqwest::Client) -> Self {
        Self {
            tag: config.tag.clone(),
            template: config.url.clone(),
            client_filter: config.client_filter,
            fields: config.fields.clone(),
            client,
        }
    }
}

#[async_trait]
impl SourceAdapter for XmlApiSource {
    async fn query(&self, keyword: &str) -> Result<Vec<RawRecord>> {
        let url = expand_template(&self.template, keyword, 0);
        let body = fetch_text(&self.client, &url, &self.tag, keyword).await?;

        let mut records = parse_records(&body)
            .map_err(|e| AppError::adapter(&self.tag, keyword, None, e))?;

        if self.client_filter {
            records.retain(|map| mentions(map, keyword));
        }

        Ok(records.into_iter().map(RawRecord::Mapping).collect())
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::List
    }

    fn field_mapping(&self) -> &FieldMapping {
        &self.fields
    }
}

/// Field being read inside the current record.
#[derive(Default)]
struct OpenField {
    name: String,
    text: String,
    children: Vec<String>,
    child_text: String,
}

impl OpenField {
    fn into_value(self) -> Value {
        if !self.children.is_empty() {
            Value::Array(self.children.into_iter().map(Value::String).collect())
        } else if self.text.trim().is_empty() {
            Value::Null
        } else {
            Value::String(self.text.trim().to_string())
        }
    }
}

/// Insert a field, turning repeated fields into arrays.
fn insert_field(record: &mut Map<String, Value>, name: String, value: Value) {
    match record.get_mut(&name) {
        None => {
            record.insert(name, value);
        }
        Some(Value::Array(existing)) => match value {
            Value::Array(more) => existing.extend(more),
            Value::Null => {}
            other => existing.push(other),
        },
        Some(existing) => {
            let first = existing.take();
            let mut items: Vec<Value> = vec![first].into_iter().filter(|v| !v.is_null()).collect();
            match value {
                Value::Array(more) => items.extend(more),
                Value::Null => {}
                other => items.push(other),
            }
            *existing = Value::Array(items);
        }
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Parse a flat XML listing into key/value records.
pub fn parse_records(xml: &str) -> Result<Vec<Map<String, Value>>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut depth = 0usize;
    let mut record: Option<Map<String, Value>> = None;
    let mut field: Option<OpenField> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| AppError::parse(format!("XML at byte {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Start(e) => {
                match depth {
                    1 => record = Some(Map::new()),
                    2 => {
                        field = Some(OpenField {
                            name: local_name(e.local_name().as_ref()),
                            ..OpenField::default()
                        })
                    }
                    3 => {
                        if let Some(f) = field.as_mut() {
                            f.child_text.clear();
                        }
                    }
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(e) => match depth {
                1 => records.push(Map::new()),
                2 => {
                    if let Some(r) = record.as_mut() {
                        insert_field(r, local_name(e.local_name().as_ref()), Value::Null);
                    }
                }
                _ => {}
            },
            Event::Text(t) => {
                let text = t.unescape().map_err(AppError::parse)?;
                push_text(field.as_mut(), depth, &text);
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                push_text(field.as_mut(), depth, &text);
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                match depth {
                    1 => {
                        if let Some(r) = record.take() {
                            records.push(r);
                        }
                    }
                    2 => {
                        if let (Some(r), Some(f)) = (record.as_mut(), field.take()) {
                            let name = f.name.clone();
                            insert_field(r, name, f.into_value());
                        }
                    }
                    3 => {
                        if let Some(f) = field.as_mut() {
                            let child = f.child_text.trim().to_string();
                            if !child.is_empty() {
                                f.children.push(child);
                            }
                            f.child_text.clear();
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

fn push_text(field: Option<&mut OpenField>, depth: usize, text: &str) {
    let Some(f) = field else { return };
    match depth {
        3 => f.text.push_str(text),
        d if d > 3 => {
            if !f.child_text.is_empty() {
                f.child_text.push(' ');
            }
            f.child_text.push_str(text);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <resultset numFound="2">
          <document>
            <title>Tick &amp; host survey</title>
            <authors>
              <author>Smith, Jane</author>
              <author>Doe, John</author>
            </authors>
            <doi>doi:10.6073/pasta/abc</doi>
            <abstract><![CDATA[<p>Ticks</p> counted]]></abstract>
            <keywords/>
          </document>
          <document>
            <title>Soil cores</title>
          </document>
        </resultset>"#;

    #[test]
    fn test_parse_records() {
        let records = parse_records(LISTING).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first["title"], json!("Tick & host survey"));
        assert_eq!(first["authors"], json!(["Smith, Jane", "Doe, John"]));
        assert_eq!(first["doi"], json!("doi:10.6073/pasta/abc"));
        assert_eq!(first["abstract"], json!("<p>Ticks</p> counted"));
        assert_eq!(first["keywords"], Value::Null);

        assert_eq!(records[1]["title"], json!("Soil cores"));
        assert!(records[1].get("doi").is_none());
    }

    #[test]
    fn test_repeated_fields_become_arrays() {
        let records = parse_records(
            "<r><d><creator>A</creator><creator>B</creator><creator>C</creator></d></r>",
        )
        .unwrap();
        assert_eq!(records[0]["creator"], json!(["A", "B", "C"]));
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        assert!(parse_records("<r><d><title>x</d></r>").is_err());
    }

    #[tokio::test]
    async fn test_query_returns_mappings() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/package/search/eml")
            .match_query(Matcher::UrlEncoded("q".into(), "ticks".into()))
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;

        let config = SourceConfig {
            tag: "LTER".to_string(),
            kind: SourceKind::Xml,
            url: format!("{}/package/search/eml?q={{keyword}}", server.url()),
            results: None,
            max_pages: 1,
            client_filter: false,
            fields: FieldMapping::default(),
        };
        let adapter = XmlApiSource::new(&config, reqwest::Client::new());

        let records = adapter.query("ticks").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(adapter.result_kind(), ResultKind::List);
        assert!(matches!(&records[0], RawRecord::Mapping(m) if m.contains_key("authors")));
    }
}
