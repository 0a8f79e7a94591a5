//! Service-level error taxonomy and its HTTP rendering.
//!
//! Upstream and store failures are converted into [`ServiceError`] at the
//! service boundary; nothing from reqwest or the filesystem reaches a
//! handler directly.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::npm::NpmError;

/// Errors surfaced by the link, metadata, token and config services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The upstream refused the credential exchange.
    #[error("{0}")]
    AuthFailure(String),

    /// The stored token is missing, invalid or was rejected mid-request.
    #[error("{0}")]
    TokenInvalid(String),

    #[error("NPM is unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Unexpected NPM response: {0}")]
    UpstreamBadResponse(String),

    /// Neither live data nor a cached snapshot could be produced.
    #[error("No valid NPM token and no cached links available. Call POST /auth/token/renew.")]
    NoDataAvailable,

    /// Admin credentials are required but were missing or wrong.
    #[error("Admin credentials required to include hidden links.")]
    Forbidden,

    #[error("Admin editing is not configured. Set ADMIN_USER and ADMIN_PASS.")]
    NotConfigured,

    #[error("Invalid admin credentials.")]
    BadCredentials,

    #[error("Link ID {0} not found in NPM proxy-hosts.")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] npmdash_core::Error),
}

impl ServiceError {
    /// Stable machine-readable kind, rendered as the `code` body field.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AuthFailure(_) => "auth_failure",
            Self::TokenInvalid(_) => "token_invalid",
            Self::UpstreamUnreachable(_) => "upstream_unreachable",
            Self::UpstreamBadResponse(_) => "upstream_bad_response",
            Self::NoDataAvailable => "no_data_available",
            Self::Forbidden => "forbidden",
            Self::NotConfigured => "admin_not_configured",
            Self::BadCredentials => "bad_credentials",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Storage(_) => "storage",
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::AuthFailure(_)
            | Self::TokenInvalid(_)
            | Self::NoDataAvailable
            | Self::Forbidden
            | Self::NotConfigured
            | Self::BadCredentials => StatusCode::UNAUTHORIZED,
            Self::UpstreamUnreachable(_) | Self::UpstreamBadResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the response should carry a Basic auth challenge.
    const fn challenges(&self) -> bool {
        matches!(self, Self::Forbidden | Self::BadCredentials)
    }
}

impl From<NpmError> for ServiceError {
    fn from(err: NpmError) -> Self {
        match err {
            NpmError::Unauthorized => Self::TokenInvalid(
                "Saved NPM token is invalid/expired. Call POST /auth/token/renew.".into(),
            ),
            NpmError::AuthFailed { .. } => Self::AuthFailure(err.to_string()),
            NpmError::BadResponse(message) => Self::UpstreamBadResponse(message),
            NpmError::Unreachable(e) | NpmError::Client(e) => {
                Self::UpstreamUnreachable(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Storage(e) => error!(error = %e, "Request failed on local storage"),
            Self::UpstreamUnreachable(_) | Self::UpstreamBadResponse(_) => {
                warn!(error = %self, "Request failed on upstream");
            }
            _ => {}
        }

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        let mut resp = (status, body).into_response();
        if self.challenges() {
            resp.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
        }
        resp
    }
}
