// src/services/doi.rs

//! DOI lookup through content negotiation on the resolver.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::export::{IdentifierResolver, Supplemental};
use crate::storage::{is_doi, normalize_identifier};
use crate::utils::date::from_parts;
use crate::utils::http::truncate;
use crate::utils::url::with_trailing_slash;

const CSL_JSON: &str = "application/vnd.citationstyles.csl+json";

/// Resolves DOIs to CSL-JSON metadata.
pub struct DoiResolver {
    client: reqwest::Client,
    base_url: String,
}

impl DoiResolver {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: with_trailing_slash(base_url),
        }
    }
}

#[async_trait]
impl IdentifierResolver for DoiResolver {
    async fn resolve(&self, identifier: &str) -> Result<Option<Supplemental>> {
        let Some(doi) = normalize_identifier(identifier).filter(|k| is_doi(k)) else {
            return Ok(None);
        };

        let response = self
            .client
            .get(format!("{}{doi}", self.base_url))
            .header(ACCEPT, CSL_JSON)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await?;
        if status.is_client_error() || status.is_server_error() {
            return Err(AppError::remote(status.as_u16(), truncate(&body, 200)));
        }

        let csl: Value = serde_json::from_str(&body)?;
        Ok(Some(from_csl(&csl)))
    }
}

/// Pick the fields item creation cares about out of a CSL-JSON work.
pub fn from_csl(csl: &Value) -> Supplemental {
    let text = |key: &str| {
        csl.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let issued = ["issued", "published", "created"].iter().find_map(|key| {
        let parts: Vec<i64> = csl
            .get(*key)?
            .get("date-parts")?
            .get(0)?
            .as_array()?
            .iter()
            .filter_map(Value::as_i64)
            .collect();
        from_parts(&parts)
    });

    let authors = csl
        .get("author")
        .and_then(Value::as_array)
        .map(|people| {
            people
                .iter()
                .filter_map(|p| {
                    let field = |k: &str| p.get(k).and_then(Value::as_str).map(str::trim);
                    match (field("family"), field("given"), field("literal")) {
                        (Some(f), Some(g), _) => Some(format!("{f}, {g}")),
                        (Some(f), None, _) => Some(f.to_string()),
                        (None, _, Some(l)) => Some(l.to_string()),
                        _ => None,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Supplemental {
        abstract_text: text("abstract"),
        url: text("URL"),
        publisher: text("publisher"),
        issued,
        authors,
    }
}
