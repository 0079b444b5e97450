// src/sources/mod.rs

//! Repository query adapters.
//!
//! Every repository is reached through [`SourceAdapter`]; the pipeline never
//! knows which wire format sits behind it.
//!
//! - `JsonApiSource`: paginated JSON search APIs
//! - `XmlApiSource`: XML listings
//! - `PageSource`: HTML landing pages (link extraction)

mod html;
mod json;
mod xml;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{FieldMapping, SourceConfig, SourceKind};
use crate::utils::http::read_body;

pub use html::PageSource;
pub use json::JsonApiSource;
pub use xml::XmlApiSource;

/// One raw result as returned by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// Loosely-typed key/value record (JSON objects, XML records)
    Mapping(Map<String, Value>),
    /// A fetched HTML page to mine for links
    Page { url: String, html: String },
}

impl RawRecord {
    /// Wrap a JSON value; anything but an object is rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::Mapping(map)),
            _ => None,
        }
    }
}

/// Which normalization path an adapter's results take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Json,
    Html,
    List,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
            Self::List => "list",
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform query capability over one repository.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Run one keyword query.
    ///
    /// A transport failure or error status is returned as
    /// [`AppError::Adapter`] carrying tag, keyword and status.
    async fn query(&self, keyword: &str) -> Result<Vec<RawRecord>>;

    /// Short identifier of the repository, used in logs and file names.
    fn tag(&self) -> &str;

    fn result_kind(&self) -> ResultKind;

    /// How raw keys map onto record fields.
    fn field_mapping(&self) -> &FieldMapping;
}

/// Build the adapter variant a source definition asks for.
pub fn build_adapter(config: &SourceConfig, client: reqwest::Client) -> Box<dyn SourceAdapter> {
    match config.kind {
        SourceKind::Json => Box::new(JsonApiSource::new(config, client)),
        SourceKind::Xml => Box::new(XmlApiSource::new(config, client)),
        SourceKind::Html => Box::new(PageSource::new(config, client)),
    }
}

/// GET a URL and return its body, mapping every failure onto an adapter error.
async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    tag: &str,
    keyword: &str,
) -> Result<String> {
    log::debug!("[{tag}] GET {url}");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::adapter(tag, keyword, e.status().map(|s| s.as_u16()), e))?;

    read_body(response)
        .await
        .map_err(|(status, message)| AppError::adapter(tag, keyword, status, message))
}

/// Whether any string in a raw record mentions the keyword (case-insensitive).
fn mentions(map: &Map<String, Value>, keyword: &str) -> bool {
    let needle = keyword.to_lowercase();
    map.values().any(|value| value_mentions(value, &needle))
}

fn value_mentions(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|v| value_mentions(v, needle)),
        Value::Object(map) => map.values().any(|v| value_mentions(v, needle)),
        _ => false,
    }
}
