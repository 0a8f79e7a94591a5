//! NPM REST API client.
//!
//! Every request carries the configured timeout and is attempted exactly
//! once. Failures are classified into a small taxonomy so callers can decide
//! between falling back to cached data and failing the request.

use std::sync::Arc;
use std::time::Duration;

use npmdash_core::{RawHost, RuntimeConfigHandle};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Credential exchange endpoint.
pub const TOKENS_PATH: &str = "/api/tokens";
/// Proxy-host listing endpoint.
pub const PROXY_HOSTS_PATH: &str = "/api/nginx/proxy-hosts";

/// Upper bound on how much of an upstream error body is echoed back.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// NPM API client errors.
#[derive(Debug, Error)]
pub enum NpmError {
    /// The upstream rejected the bearer token.
    #[error("NPM rejected the API token")]
    Unauthorized,

    /// Connection failure or timeout.
    #[error("NPM is unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// Any other error status, or a body that is not the expected JSON.
    #[error("Unexpected NPM response: {0}")]
    BadResponse(String),

    /// The credential exchange was refused.
    #[error("NPM authentication failed (HTTP {status}): {message}")]
    AuthFailed { status: u16, message: String },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    identity: &'a str,
    secret: &'a str,
}

/// NPM REST API client.
///
/// The base URL is read from the shared runtime configuration on every
/// request, so admin changes take effect without rebuilding the client.
#[derive(Debug)]
pub struct NpmClient {
    http: reqwest::Client,
    config: Arc<RuntimeConfigHandle>,
}

impl NpmClient {
    /// Create a new NPM API client with a per-request `timeout`.
    pub fn new(config: Arc<RuntimeConfigHandle>, timeout: Duration) -> Result<Self, NpmError> {
        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }

    /// Build the full URL for an API path against the current base URL.
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.npm_base_url(), path)
    }

    /// Exchange NPM credentials for an API token.
    pub async fn exchange_credentials(
        &self,
        identity: &str,
        secret: &str,
    ) -> Result<String, NpmError> {
        let resp = self
            .http
            .post(self.api_url(TOKENS_PATH))
            .json(&TokenRequest { identity, secret })
            .send()
            .await
            .map_err(NpmError::Unreachable)?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(NpmError::AuthFailed {
                status: status.as_u16(),
                message: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| NpmError::BadResponse(format!("token response is not JSON: {e}")))?;
        body.get("token")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| NpmError::BadResponse("NPM response did not contain a token.".into()))
    }

    /// List all proxy hosts as raw JSON objects.
    pub async fn list_proxy_hosts(&self, token: &str) -> Result<Vec<RawHost>, NpmError> {
        let resp = self
            .http
            .get(self.api_url(PROXY_HOSTS_PATH))
            .bearer_auth(token)
            .send()
            .await
            .map_err(NpmError::Unreachable)?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(NpmError::Unauthorized);
        }
        if !status.is_success() {
            return Err(NpmError::BadResponse(format!("NPM returned HTTP {status}")));
        }

        let bytes = resp.bytes().await.map_err(NpmError::Unreachable)?;
        let hosts = parse_host_list(&bytes)?;
        debug!(count = hosts.len(), "Fetched proxy hosts");
        Ok(hosts)
    }
}

/// Parse a listing body. The body must be a JSON array; entries that are not
/// objects are dropped.
pub(crate) fn parse_host_list(body: &[u8]) -> Result<Vec<RawHost>, NpmError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| NpmError::BadResponse(format!("proxy-host list is not JSON: {e}")))?;
    let Value::Array(items) = value else {
        return Err(NpmError::BadResponse(
            "proxy-host list is not a JSON array".into(),
        ));
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
