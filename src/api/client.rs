// SPDX-License-Identifier: MPL-2.0

use crate::config::{APP_NAME, Config};
use reqwest::{Method, Request, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("{0}")]
    Unauthorized(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("{0}")]
    Validation(String),
    /// 2xx reply whose body reports the action was not applied
    #[error("{0}")]
    Rejected(String),
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Transport-level failures where the server never answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Bearer token shared between the auth store (sole writer) and the client
/// (reads it fresh on every request).
#[derive(Clone, Default)]
pub struct TokenCell(Arc<RwLock<Option<String>>>);

impl TokenCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.0.read().map(|t| t.clone()).unwrap_or(None)
    }

    pub fn set(&self, token: Option<String>) {
        if let Ok(mut guard) = self.0.write() {
            *guard = token;
        }
    }

    pub fn is_set(&self) -> bool {
        self.0.read().map(|t| t.is_some()).unwrap_or(false)
    }
}

impl std::fmt::Debug for TokenCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TokenCell")
            .field(&if self.is_set() { "<set>" } else { "<empty>" })
            .finish()
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Thin JSON-over-HTTP wrapper around the Inkdrop backend.
#[derive(Clone)]
pub struct InkdropClient {
    http: reqwest::Client,
    base_url: Url,
    token: TokenCell,
    default_timeout: Duration,
    pub(crate) check_in_timeout: Duration,
}

impl InkdropClient {
    pub fn new(config: &Config, token: TokenCell) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: normalize_base(config.api_url.clone()),
            token,
            default_timeout: config.request_timeout,
            check_in_timeout: config.check_in_timeout,
        })
    }

    pub fn token(&self) -> &TokenCell {
        &self.token
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Validation(format!("invalid request path {path}: {e}")))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request = self.get_request(path, query)?;
        self.execute(request).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(Method::POST, path, body, RequestOptions::default())
            .await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(Method::PUT, path, body, RequestOptions::default())
            .await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(Method::PATCH, path, body, RequestOptions::default())
            .await
    }

    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request = self.json_request(method, path, body, options)?;
        self.execute(request).await
    }

    pub(crate) fn get_request(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Request, ApiError> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        self.prepare(self.http.get(url), RequestOptions::default())
    }

    pub(crate) fn json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Request, ApiError> {
        let url = self.url(path)?;
        self.prepare(self.http.request(method, url).json(body), options)
    }

    /// Timeout and bearer token, read from the token cell at build time.
    fn prepare(&self, request: RequestBuilder, options: RequestOptions) -> Result<Request, ApiError> {
        let mut request = request.timeout(options.timeout.unwrap_or(self.default_timeout));
        if let Some(token) = self.token.get() {
            request = request.bearer_auth(token);
        }
        request
            .build()
            .map_err(|e| ApiError::Validation(format!("invalid request: {e}")))
    }

    async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<T, ApiError> {
        let response = self
            .http
            .execute(request)
            .await
            .map_err(ApiError::from_reqwest)?;
        let status = response.status();
        tracing::debug!(url = %response.url(), status = status.as_u16(), "api response");

        if !status.is_success() {
            return Err(error_from_response(status, response).await);
        }

        let bytes = response.bytes().await.map_err(ApiError::from_reqwest)?;
        decode_body(&bytes)
    }
}

/// Make `join` append to the base path instead of replacing its last segment.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Empty success bodies decode as JSON `null`, so unit and `Option` targets work.
pub(crate) fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        bytes
    };
    serde_json::from_slice(bytes).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

async fn error_from_response(status: StatusCode, response: Response) -> ApiError {
    let body = response.bytes().await.unwrap_or_default();
    error_from_parts(status, &body)
}

/// Pull the server's `message` (or `error`) field out of an error body.
pub(crate) fn error_from_parts(status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized(message)
    } else {
        ApiError::Server {
            status: status.as_u16(),
            message,
        }
    }
}
