// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed wire data (XML, JSON shape, dates)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A source adapter failed to answer a query
    #[error("Query of {tag} for '{keyword}' failed{}: {message}", status_suffix(.status))]
    Adapter {
        tag: String,
        keyword: String,
        status: Option<u16>,
        message: String,
    },

    /// A source declared a field mandatory and the raw record lacks it
    #[error("Record from {tag} is missing required field '{field}'")]
    MissingField { tag: String, field: String },

    /// Identifier cache storage could not be read or written
    #[error("Identifier cache error: {0}")]
    Cache(String),

    /// Export destination could not be written
    #[error("Export to {path} failed: {message}")]
    Export { path: String, message: String },

    /// Remote repository rejected the credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Remote repository rejected a request
    #[error("Remote repository error (HTTP {status}): {message}")]
    Remote { status: u16, message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a parse error.
    pub fn parse(message: impl fmt::Display) -> Self {
        Self::Parse(message.to_string())
    }

    /// Create an adapter failure with source and keyword context.
    pub fn adapter(
        tag: impl Into<String>,
        keyword: impl Into<String>,
        status: Option<u16>,
        message: impl fmt::Display,
    ) -> Self {
        Self::Adapter {
            tag: tag.into(),
            keyword: keyword.into(),
            status,
            message: message.to_string(),
        }
    }

    /// Create a missing-field error.
    pub fn missing_field(tag: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            tag: tag.into(),
            field: field.into(),
        }
    }

    /// Create an identifier cache error.
    pub fn cache(path: &Path, message: impl fmt::Display) -> Self {
        Self::Cache(format!("{}: {}", path.display(), message))
    }

    /// Create an export error, adding a remediation hint for locked files.
    pub fn export(path: &Path, error: impl Into<AppError>) -> Self {
        let error = error.into();
        let hint = if error.is_permission_denied() {
            " (close any application holding the file open, then export again)"
        } else {
            ""
        };
        Self::Export {
            path: path.display().to_string(),
            message: format!("{error}{hint}"),
        }
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Create a remote repository error.
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Whether the underlying I/O failure was a refused file access.
    fn is_permission_denied(&self) -> bool {
        let io = match self {
            Self::Io(e) => e,
            Self::Csv(e) => match e.kind() {
                csv::ErrorKind::Io(e) => e,
                _ => return false,
            },
            _ => return false,
        };
        io.kind() == std::io::ErrorKind::PermissionDenied
    }

    /// HTTP-like status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Adapter { status, .. } => *status,
            Self::Remote { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
