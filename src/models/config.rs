// src/models/config.rs

//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Canonical record field names, as used by field mappings.
pub const CANONICAL_FIELDS: &[&str] = &[
    "title",
    "authors",
    "link",
    "abstract",
    "source",
    "keywords",
    "identifier",
    "datatype",
    "date",
];

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings shared by every outgoing request
    #[serde(default)]
    pub http: HttpConfig,

    /// Batch run behavior
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Remote repository export target
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Repositories to query
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.harvest.cache_file.as_os_str().is_empty() {
            return Err(AppError::validation("harvest.cache_file is empty"));
        }

        let mut tags = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !tags.insert(source.tag.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate source tag '{}'",
                    source.tag
                )));
            }
        }
        Ok(())
    }

    /// Find a configured source by tag.
    pub fn source(&self, tag: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.tag == tag)
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Batch run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Pause between successive queries, in seconds
    #[serde(default = "defaults::cooldown")]
    pub cooldown_secs: u64,

    /// Identifier cache file, relative to the data directory
    #[serde(default = "defaults::cache_file")]
    pub cache_file: PathBuf,

    /// Directory receiving tabular exports, relative to the data directory
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Write the running collection after every keyword
    #[serde(default = "defaults::enabled")]
    pub checkpoint: bool,

    /// Keyword list, relative to the data directory
    #[serde(default = "defaults::keywords_file")]
    pub keywords_file: PathBuf,
}

impl HarvestConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: defaults::cooldown(),
            cache_file: defaults::cache_file(),
            output_dir: defaults::output_dir(),
            checkpoint: true,
            keywords_file: defaults::keywords_file(),
        }
    }
}

/// Remote repository (DSpace) export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// REST API root, e.g. `https://repo.example.org/server/api/`
    #[serde(default = "defaults::remote_base_url")]
    pub base_url: String,

    /// Collection receiving new items
    #[serde(default)]
    pub collection_id: String,

    /// Login name; the password comes from `HARVESTER_PASSWORD`
    #[serde(default)]
    pub username: String,

    /// Minimum pause between item creations, in seconds
    #[serde(default = "defaults::item_delay")]
    pub item_delay_secs: u64,

    /// Look identifiers up before upload to fill in abstract and date
    #[serde(default = "defaults::enabled")]
    pub resolve_identifiers: bool,

    /// Identifier resolver root
    #[serde(default = "defaults::resolver_url")]
    pub resolver_url: String,
}

impl RemoteConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_secs(self.item_delay_secs)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::remote_base_url(),
            collection_id: String::new(),
            username: String::new(),
            item_delay_secs: defaults::item_delay(),
            resolve_identifiers: true,
            resolver_url: defaults::resolver_url(),
        }
    }
}

/// Wire format a source answers in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Json,
    Xml,
    Html,
}

/// One repository to query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Short tag used in logs and file names
    pub tag: String,

    /// Wire format of the answers
    pub kind: SourceKind,

    /// URL template with `{keyword}` and optional `{page}` placeholders
    pub url: String,

    /// JSON pointer to the result array (JSON sources only)
    #[serde(default)]
    pub results: Option<String>,

    /// Upper bound on pages fetched for paginated templates
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Keep only results whose text mentions the keyword
    #[serde(default)]
    pub client_filter: bool,

    /// How raw keys map onto record fields
    #[serde(default)]
    pub fields: FieldMapping,
}

impl SourceConfig {
    /// Validate a single source definition.
    pub fn validate(&self) -> Result<()> {
        if self.tag.trim().is_empty() {
            return Err(AppError::validation("source tag is empty"));
        }
        if self.url.trim().is_empty() {
            return Err(AppError::validation(format!(
                "source '{}' has no url",
                self.tag
            )));
        }
        if !self.url.contains("{keyword}") && !self.client_filter {
            return Err(AppError::validation(format!(
                "source '{}' url has no {{keyword}} placeholder and client_filter is off",
                self.tag
            )));
        }
        if self.max_pages == 0 {
            return Err(AppError::validation(format!(
                "source '{}' max_pages must be > 0",
                self.tag
            )));
        }
        self.fields.validate(&self.tag)
    }
}

/// Where each canonical field lives in a raw record.
///
/// Values are plain keys, or JSON pointers when they start with `/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldMapping {
    #[serde(default = "defaults::field_title")]
    pub title: String,
    #[serde(default = "defaults::field_authors")]
    pub authors: String,
    #[serde(default = "defaults::field_link")]
    pub link: String,
    #[serde(default = "defaults::field_abstract", rename = "abstract")]
    pub abstract_text: String,
    #[serde(default = "defaults::field_source")]
    pub source: String,
    #[serde(default = "defaults::field_keywords")]
    pub keywords: String,
    #[serde(default = "defaults::field_identifier")]
    pub identifier: String,
    #[serde(default = "defaults::field_datatype")]
    pub datatype: String,
    #[serde(default = "defaults::field_date")]
    pub date: String,

    /// Canonical fields this source declares mandatory
    #[serde(default)]
    pub required: Vec<String>,

    /// Keys holding a person's display name in structured author entries
    #[serde(default = "defaults::author_name_keys")]
    pub author_name_keys: Vec<String>,
}

impl FieldMapping {
    /// Raw key (or pointer) for a canonical field name.
    pub fn key_for(&self, field: &str) -> Option<&str> {
        let key = match field {
            "title" => &self.title,
            "authors" => &self.authors,
            "link" => &self.link,
            "abstract" => &self.abstract_text,
            "source" => &self.source,
            "keywords" => &self.keywords,
            "identifier" => &self.identifier,
            "datatype" => &self.datatype,
            "date" => &self.date,
            _ => return None,
        };
        Some(key.as_str())
    }

    fn validate(&self, tag: &str) -> Result<()> {
        for field in &self.required {
            if !CANONICAL_FIELDS.contains(&field.as_str()) {
                return Err(AppError::validation(format!(
                    "source '{tag}' declares unknown required field '{field}'"
                )));
            }
        }
        Ok(())
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            title: defaults::field_title(),
            authors: defaults::field_authors(),
            link: defaults::field_link(),
            abstract_text: defaults::field_abstract(),
            source: defaults::field_source(),
            keywords: defaults::field_keywords(),
            identifier: defaults::field_identifier(),
            datatype: defaults::field_datatype(),
            date: defaults::field_date(),
            required: Vec::new(),
            author_name_keys: defaults::author_name_keys(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; harvester/0.1)".into()
    }
    pub fn timeout() -> u64 {
        60
    }

    // Harvest defaults
    pub fn cooldown() -> u64 {
        120
    }
    pub fn cache_file() -> PathBuf {
        PathBuf::from("doi_cache.txt")
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("data_dump")
    }
    pub fn keywords_file() -> PathBuf {
        PathBuf::from("keys.csv")
    }
    pub fn enabled() -> bool {
        true
    }

    // Remote defaults
    pub fn remote_base_url() -> String {
        "http://localhost:8080/server/api/".into()
    }
    pub fn item_delay() -> u64 {
        10
    }
    pub fn resolver_url() -> String {
        "https://doi.org/".into()
    }

    // Source defaults
    pub fn max_pages() -> usize {
        1
    }

    // Field mapping defaults
    pub fn field_title() -> String {
        "title".into()
    }
    pub fn field_authors() -> String {
        "authors".into()
    }
    pub fn field_link() -> String {
        "link".into()
    }
    pub fn field_abstract() -> String {
        "abstract".into()
    }
    pub fn field_source() -> String {
        "source".into()
    }
    pub fn field_keywords() -> String {
        "keywords".into()
    }
    pub fn field_identifier() -> String {
        "doi".into()
    }
    pub fn field_datatype() -> String {
        "datatype".into()
    }
    pub fn field_date() -> String {
        "date".into()
    }
    pub fn author_name_keys() -> Vec<String> {
        vec!["name".into(), "fullName".into(), "literal".into()]
    }
}
