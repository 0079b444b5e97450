// src/sources/json.rs

//! Paginated JSON search APIs.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{FieldMapping, SourceConfig};
use crate::utils::url::{expand_template, is_paginated};

use super::{RawRecord, ResultKind, SourceAdapter, fetch_text, mentions};

/// Adapter for repositories answering keyword searches with JSON.
pub struct JsonApiSource {
    tag: String,
    template: String,
    results: Option<String>,
    max_pages: usize,
    client_filter: bool,
    fields: FieldMapping,
    client: reqwest::Client,
}

impl JsonApiSource {
    pub fn new(config: &SourceConfig, client: reqwest::Client) -> Self {
        Self {
            tag: config.tag.clone(),
            template: config.url.clone(),
            results: config.results.clone(),
            max_pages: config.max_pages.max(1),
            client_filter: config.client_filter,
            fields: config.fields.clone(),
            client,
        }
    }

    fn page_count(&self) -> usize {
        if is_paginated(&self.template) {
            self.max_pages
        } else {
            1
        }
    }

    /// Pull the result array out of one decoded page.
    fn extract(&self, body: Value) -> Vec<Value> {
        let target = match &self.results {
            Some(pointer) if !pointer.is_empty() => body.pointer(pointer).cloned(),
            _ => Some(body),
        };

        match target {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other],
        }
    }
}

#[async_trait]
impl SourceAdapter for JsonApiSource {
    async fn query(&self, keyword: &str) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();

        for page in 0..self.page_count() {
            let url = expand_template(&self.template, keyword, page);
            let body = fetch_text(&self.client, &url, &self.tag, keyword).await?;

            let decoded: Value = match serde_json::from_str(&body) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("[{}] page {page} is not valid JSON ({e}); stopping", self.tag);
                    break;
                }
            };

            let items = self.extract(decoded);
            if items.is_empty() {
                log::debug!("[{}] page {page} is empty; stopping", self.tag);
                break;
            }

            records.extend(items.into_iter().filter_map(RawRecord::from_value));
        }

        if self.client_filter {
            let before = records.len();
            records.retain(|record| match record {
                RawRecord::Mapping(map) => mentions(map, keyword),
                RawRecord::Page { .. } => true,
            });
            log::debug!(
                "[{}] client filter kept {}/{before} results for '{keyword}'",
                self.tag,
                records.len()
            );
        }

        Ok(records)
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Json
    }

    fn field_mapping(&self) -> &FieldMapping {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::SourceKind;
    use mockito::{Matcher, Server};

    fn source(url: String, max_pages: usize) -> SourceConfig {
        SourceConfig {
            tag: "mendeleydata".to_string(),
            kind: SourceKind::Json,
            url,
            results: Some("/results".to_string()),
            max_pages,
            client_filter: false,
            fields: FieldMapping::default(),
        }
    }

    #[tokio::test]
    async fn test_pages_until_empty() {
        let mut server = Server::new_async().await;
        let page0 = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "tick borne".into()),
                Matcher::UrlEncoded("page".into(), "0".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"count": 2, "results": [{"title": "a"}, {"title": "b"}]}"#)
            .create_async()
            .await;
        let page1 = server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(r#"{"count": 0, "results": []}"#)
            .create_async()
            .await;

        let config = source(
            format!("{}/search?q={{keyword}}&page={{page}}", server.url()),
            5,
        );
        let adapter = JsonApiSource::new(&config, reqwest::Client::new());
        let records = adapter.query("tick borne").await.unwrap();

        assert_eq!(records.len(), 2);
        page0.assert_async().await;
        page1.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_adapter_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let config = source(format!("{}/search?q={{keyword}}", server.url()), 1);
        let adapter = JsonApiSource::new(&config, reqwest::Client::new());
        let err = adapter.query("ticks").await.unwrap_err();

        match err {
            AppError::Adapter {
                tag,
                keyword,
                status,
                ..
            } => {
                assert_eq!(tag, "mendeleydata");
                assert_eq!(keyword, "ticks");
                assert_eq!(status, Some(503));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_stops_paging() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .expect(1)
            .create_async()
            .await;

        let config = source(
            format!("{}/search?q={{keyword}}&page={{page}}", server.url()),
            3,
        );
        let adapter = JsonApiSource::new(&config, reqwest::Client::new());
        assert!(adapter.query("ticks").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_client_filter_keeps_mentions() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/products")
            .with_status(200)
            .with_body(
                r#"{"data": [
                    {"productName": "Tick-borne pathogen status"},
                    {"productName": "Soil temperature"}
                ]}"#,
            )
            .create_async()
            .await;

        let mut config = source(format!("{}/products", server.url()), 1);
        config.results = Some("/data".to_string());
        config.client_filter = true;
        let adapter = JsonApiSource::new(&config, reqwest::Client::new());

        let records = adapter.query("tick-borne").await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
