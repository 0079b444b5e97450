// src/sources/html.rs

//! Landing pages mined for dataset links.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FieldMapping, SourceConfig};
use crate::utils::url::expand_template;

use super::{RawRecord, ResultKind, SourceAdapter, fetch_text};

/// Adapter that fetches a search page and hands it over for link extraction.
pub struct PageSource {
    tag: String,
    template: String,
    fields: FieldMapping,
    client: reqwest::Client,
}

impl PageSource {
    pub fn new(config: &SourceConfig, client: reqwest::Client) -> Self {
        Self {
            tag: config.tag.clone(),
            template: config.url.clone(),
            fields: config.fields.clone(),
            client,
        }
    }
}

#[async_trait]
impl SourceAdapter for PageSource {
    async fn query(&self, keyword: &str) -> Result<Vec<RawRecord>> {
        let url = expand_template(&self.template, keyword, 0);
        let html = fetch_text(&self.client, &url, &self.tag, keyword).await?;
        Ok(vec![RawRecord::Page { url, html }])
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn result_kind(&self) -> ResultKind {
        ResultKind::Html
    }

    fn field_mapping(&self) -> &FieldMapping {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use mockito::Server;

    #[tokio::test]
    async fn test_query_returns_page() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/search/ticks")
            .with_status(200)
            .with_body("<html><a href=\"https://x.org/1\">One</a></html>")
            .create_async()
            .await;

        let config = SourceConfig {
            tag: "knb".to_string(),
            kind: SourceKind::Html,
            url: format!("{}/search/{{keyword}}", server.url()),
            results: None,
            max_pages: 1,
            client_filter: false,
            fields: FieldMapping::default(),
        };
        let adapter = PageSource::new(&config, reqwest::Client::new());
        let records = adapter.query("ticks").await.unwrap();

        assert_eq!(records.len(), 1);
        match &records[0] {
            RawRecord::Page { url, html } => {
                assert!(url.ends_with("/search/ticks"));
                assert!(html.contains("https://x.org/1"));
            }
            other => panic!("unexpected record: {other:?}"),
        }
    }
}
