use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use url::Url;

use super::envelope::{extract_error_message, is_rejected, parse_body};
use crate::auth::AuthSession;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Thin HTTP layer shared by loaders, orchestrators, selectors and resolvers
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    root: String,
    session: AuthSession,
    log_requests: bool,
}

/// Status plus the body parsed leniently (`None` for empty or non-JSON)
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && !is_rejected(self.body.as_ref())
    }

    /// Converts HTTP and envelope failures into a `ClientError` with the display message
    pub fn into_result(self) -> ClientResult<Self> {
        if !(200..300).contains(&self.status) {
            let message = extract_error_message(self.body.as_ref(), self.status);
            return Err(ClientError::http(self.status, message));
        }
        if is_rejected(self.body.as_ref()) {
            let message = extract_error_message(self.body.as_ref(), self.status);
            return Err(ClientError::rejected(self.status, message));
        }
        Ok(self)
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: AuthSession) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs.max(1)))
            .build()?;

        let root = format!(
            "{}{}",
            config.api.base_url.trim_end_matches('/'),
            normalize_prefix(&config.api.prefix)
        );
        // Fail on a bad base URL now rather than at the first request
        Url::parse(&root)?;

        Ok(Self {
            http,
            root,
            session,
            log_requests: config.api.enable_request_logging,
        })
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn url(&self, path: &str) -> ClientResult<Url> {
        let path = if path.starts_with('/') { path.to_string() } else { format!("/{}", path) };
        Ok(Url::parse(&format!("{}{}", self.root, path))?)
    }

    /// GET that always bypasses caches
    pub async fn get(&self, path: &str) -> ClientResult<ApiResponse> {
        let builder = self
            .request(Method::GET, path)?
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache");
        self.execute(builder, Method::GET, path).await
    }

    pub async fn send_json(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<ApiResponse> {
        let mut builder = self.request(method.clone(), path)?;
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(|e| ClientError::Decode(e.to_string()))?;
            builder = builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(bytes);
        }
        self.execute(builder, method, path).await
    }

    pub async fn send_bytes(&self, path: &str, bytes: Vec<u8>, mime: &str) -> ClientResult<ApiResponse> {
        let builder = self
            .request(Method::POST, path)?
            .header(CONTENT_TYPE, mime)
            .body(bytes);
        self.execute(builder, Method::POST, path).await
    }

    fn request(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let mut builder = self
            .http
            .request(method, self.url(path)?)
            .header(ACCEPT, "application/json");
        if let Some(value) = self.session.authorization_header() {
            builder = builder.header(AUTHORIZATION, value);
        }
        Ok(builder)
    }

    async fn execute(&self, builder: RequestBuilder, method: Method, path: &str) -> ClientResult<ApiResponse> {
        // Builder errors (bad header values, bad URL) are local and surface as Config
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "request failed before a response arrived");
            ClientError::from(e)
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ClientError::Transport(e.to_string()))?;

        if self.log_requests {
            tracing::debug!(%method, path, status, bytes = text.len(), "response received");
        }

        Ok(ApiResponse { status, body: parse_body(&text) })
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
