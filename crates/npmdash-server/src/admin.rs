//! Admin capability: HTTP Basic credentials checked against the operator's
//! configured username and password.
//!
//! When no username or password is configured, every admin-gated operation
//! fails with [`ServiceError::NotConfigured`].

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ServiceError;

/// Username and password presented in an `Authorization: Basic` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse an `Authorization` header value. Returns `None` for other
    /// schemes or malformed payloads.
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, payload) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(payload.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::new(username, password))
    }

    /// Encode as an `Authorization` header value.
    pub fn to_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

/// Extractor for optional Basic credentials. Never rejects; a missing or
/// malformed header yields `None`.
#[derive(Debug, Clone)]
pub struct BasicAuth(pub Option<BasicCredentials>);

impl<S> FromRequestParts<S> for BasicAuth
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let creds = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(BasicCredentials::from_header);
        Ok(Self(creds))
    }
}

/// Checks presented credentials against the configured admin account.
#[derive(Debug, Clone)]
pub struct AdminGuard {
    configured: Option<BasicCredentials>,
}

impl AdminGuard {
    /// An empty username or password disables admin access entirely.
    pub fn new(username: &str, password: &str) -> Self {
        let configured = (!username.is_empty() && !password.is_empty())
            .then(|| BasicCredentials::new(username, password));
        Self { configured }
    }

    pub const fn is_configured(&self) -> bool {
        self.configured.is_some()
    }

    /// Whether `presented` matches the configured admin account.
    pub fn is_admin(&self, presented: Option<&BasicCredentials>) -> bool {
        match (&self.configured, presented) {
            (Some(expected), Some(given)) => {
                let user_ok = expected.username.as_bytes().ct_eq(given.username.as_bytes());
                let pass_ok = expected.password.as_bytes().ct_eq(given.password.as_bytes());
                (user_ok & pass_ok).into()
            }
            _ => false,
        }
    }

    /// Require admin capability.
    pub fn authorize(&self, presented: Option<&BasicCredentials>) -> Result<(), ServiceError> {
        if !self.is_configured() {
            return Err(ServiceError::NotConfigured);
        }
        if self.is_admin(presented) {
            Ok(())
        } else {
            warn!(
                username = presented.map_or("<none>", |c| c.username.as_str()),
                "Rejected admin request"
            );
            Err(ServiceError::BadCredentials)
        }
    }
}
