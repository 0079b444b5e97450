// src/services/dspace.rs

//! DSpace 7 REST client.
//!
//! The server hands out a CSRF token in the `DSPACE-XSRF-TOKEN` response
//! header and expects it back as `X-XSRF-TOKEN`; a successful login adds a
//! bearer token in `Authorization`. Both are refreshed from every response.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use serde_json::{Map, Value, json};

use crate::error::{AppError, Result};
use crate::export::{ItemDraft, RepositoryClient};
use crate::models::{HttpConfig, RemoteConfig};
use crate::utils::http::{create_session_client, truncate};
use crate::utils::url::with_trailing_slash;

/// Environment variable holding the repository password.
pub const PASSWORD_ENV: &str = "HARVESTER_PASSWORD";

const XSRF_RESPONSE_HEADER: &str = "DSPACE-XSRF-TOKEN";
const XSRF_REQUEST_HEADER: &str = "X-XSRF-TOKEN";

#[derive(Debug, Default)]
struct Tokens {
    xsrf: Option<String>,
    bearer: Option<String>,
}

/// Session against one DSpace server.
pub struct DSpaceClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    tokens: Mutex<Tokens>,
}

impl DSpaceClient {
    pub fn new(
        remote: &RemoteConfig,
        http: &HttpConfig,
        password: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: create_session_client(http)?,
            base_url: with_trailing_slash(&remote.base_url),
            username: remote.username.clone(),
            password: password.into(),
            tokens: Mutex::new(Tokens::default()),
        })
    }

    /// Build a client taking the password from [`PASSWORD_ENV`].
    pub fn from_env(remote: &RemoteConfig, http: &HttpConfig) -> Result<Self> {
        let password = std::env::var(PASSWORD_ENV)
            .map_err(|_| AppError::config(format!("{PASSWORD_ENV} is not set")))?;
        Self::new(remote, http, password)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn tokens(&self) -> std::sync::MutexGuard<'_, Tokens> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attach the current CSRF and bearer tokens.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let tokens = self.tokens();
        let mut request = request;
        if let Some(xsrf) = &tokens.xsrf {
            request = request.header(XSRF_REQUEST_HEADER, xsrf);
        }
        if let Some(bearer) = &tokens.bearer {
            request = request.header(AUTHORIZATION, bearer);
        }
        request
    }

    /// Remember rotated tokens from a response.
    fn capture(&self, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let mut tokens = self.tokens();
        if let Some(xsrf) = header(XSRF_RESPONSE_HEADER) {
            tokens.xsrf = Some(xsrf);
        }
        if let Some(bearer) = header(AUTHORIZATION.as_str()) {
            tokens.bearer = Some(bearer);
        }
    }

    async fn post_item(&self, url: &str, payload: &Value) -> Result<(u16, String)> {
        let response = self
            .authorize(self.client.post(url))
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;
        self.capture(response.headers());
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

#[async_trait]
impl RepositoryClient for DSpaceClient {
    async fn authenticate(&self) -> Result<()> {
        // Fetches a fresh CSRF token; login is refused without one.
        self.status().await?;

        let response = self
            .authorize(self.client.post(self.endpoint("authn/login")))
            .form(&[
                ("user", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        self.capture(response.headers());
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::auth(format!(
                "login as '{}' refused (HTTP {}): {}",
                self.username,
                status.as_u16(),
                truncate(&body, 200)
            )));
        }

        if self.tokens().bearer.is_none() {
            return Err(AppError::auth("login response carried no bearer token"));
        }
        log::info!("Authenticated to {} as '{}'", self.base_url, self.username);
        Ok(())
    }

    async fn status(&self) -> Result<bool> {
        let response = self
            .authorize(self.client.get(self.endpoint("authn/status")))
            .send()
            .await?;
        self.capture(response.headers());

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            log::warn!("Session status check failed (HTTP {})", status.as_u16());
            return Ok(false);
        }

        let body: Value = response.json().await?;
        Ok(body
            .get("authenticated")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn create_item(&self, collection_id: &str, item: &ItemDraft<'_>) -> Result<()> {
        let url = self.endpoint(&format!("core/items?owningCollection={collection_id}"));
        let payload = item_payload(item);

        let (mut status, mut body) = self.post_item(&url, &payload).await?;
        if status >= 400 {
            log::warn!("Item creation answered HTTP {status}; retrying once");
            (status, body) = self.post_item(&url, &payload).await?;
        }

        if status >= 400 {
            return Err(AppError::remote(status, truncate(&body, 200)));
        }
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let response = self
            .authorize(self.client.post(self.endpoint("authn/logout")))
            .send()
            .await?;
        let status = response.status().as_u16();
        *self.tokens() = Tokens::default();
        if status >= 400 {
            return Err(AppError::remote(status, "logout refused"));
        }
        Ok(())
    }
}

/// DSpace metadata values for one field, in order.
fn values<I, S>(items: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Value::Array(
        items
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .filter(|v| !v.is_empty())
            .enumerate()
            .map(|(place, v)| {
                json!({
                    "value": v,
                    "language": null,
                    "authority": null,
                    "confidence": -1,
                    "place": place,
                })
            })
            .collect(),
    )
}

/// Item creation payload carrying every record field as Dublin Core.
pub fn item_payload(item: &ItemDraft<'_>) -> Value {
    let record = item.record;
    let mut metadata = Map::new();

    metadata.insert("dc.title".into(), values([record.title()]));
    metadata.insert("dc.contributor.author".into(), values(item.authors()));
    metadata.insert("dc.description".into(), values([record.abstract_text()]));
    metadata.insert(
        "dc.description.abstract".into(),
        values([item.abstract_text()]),
    );
    metadata.insert("dc.identifier.other".into(), values([record.identifier()]));
    metadata.insert("dc.identifier.uri".into(), values(item.uri()));
    metadata.insert("dc.subject".into(), values(record.keywords()));
    metadata.insert("dc.type".into(), values([record.datatype()]));
    metadata.insert("dc.source".into(), values([record.source()]));
    metadata.insert("dc.date.issued".into(), values([item.issued()]));
    if let Some(publisher) = &item.supplemental.publisher {
        metadata.insert("dc.publisher".into(), values([publisher]));
    }

    json!({
        "name": record.title(),
        "metadata": metadata,
        "inArchive": true,
        "discoverable": true,
        "withdrawn": false,
        "type": "item",
    })
}
