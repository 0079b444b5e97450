// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Create a client that keeps cookies between requests (session-based APIs).
pub fn create_session_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .cookie_store(true)
        .build()?;
    Ok(client)
}

/// Read a response body, turning HTTP error statuses into `(status, body)`.
pub async fn read_body(
    response: reqwest::Response,
) -> std::result::Result<String, (Option<u16>, String)> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| (Some(status.as_u16()), e.to_string()))?;

    if status.is_client_error() || status.is_server_error() {
        return Err((Some(status.as_u16()), truncate(&body, 200)));
    }
    Ok(body)
}

/// Shorten a response body for log and error messages.
pub fn truncate(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("  short  ", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }

    #[test]
    fn test_create_client_from_defaults() {
        assert!(create_client(&HttpConfig::default()).is_ok());
        assert!(create_session_client(&HttpConfig::default()).is_ok());
    }
}
