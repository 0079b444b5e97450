// src/models/record.rs

//! Canonical metadata record.

use serde::Serialize;

use crate::utils::html::strip_markup;

/// Datatype assigned when a source does not report one.
pub const UNKNOWN_DATATYPE: &str = "unknown";

/// One normalized metadata record.
///
/// Records are only built through [`RecordBuilder`], which strips markup
/// from `title` and `abstract`; once built they are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    title: String,
    authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: String,
    source: String,
    keywords: Vec<String>,
    identifier: String,
    datatype: String,
    date: String,
}

impl Record {
    /// Start building a record.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Link to the record, `None` when the source supplied none.
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn abstract_text(&self) -> &str {
        &self.abstract_text
    }

    /// Tag of the originating repository.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Persistent identifier; empty when the source has none.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn has_identifier(&self) -> bool {
        !self.identifier.is_empty()
    }

    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    /// Date as reported by the source (loosely formatted).
    pub fn date(&self) -> &str {
        &self.date
    }
}

/// Builder for [`Record`].
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    title: String,
    authors: Vec<String>,
    link: Option<String>,
    abstract_text: String,
    source: String,
    keywords: Vec<String>,
    identifier: String,
    datatype: Option<String>,
    date: String,
}

impl RecordBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = text.into();
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Finish the record, sanitizing markup-bearing fields.
    pub fn build(self) -> Record {
        let datatype = self
            .datatype
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| UNKNOWN_DATATYPE.to_string());

        Record {
            title: strip_markup(&self.title).trim().to_string(),
            authors: self.authors,
            link: self.link,
            abstract_text: strip_markup(&self.abstract_text).trim().to_string(),
            source: self.source,
            keywords: self.keywords,
            identifier: self.identifier.trim().to_string(),
            datatype,
            date: self.date.trim().to_string(),
        }
    }
}
