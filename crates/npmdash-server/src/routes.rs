use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use npmdash_core::{MergedLink, MetadataPatch, RuntimeConfig};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::admin::BasicAuth;
use crate::error::ServiceError;
use crate::links::Provenance;
use crate::state::AppState;

/// `live` or `cache`.
pub const LINKS_SOURCE_HEADER: &str = "x-links-source";
/// Stored RFC 3339 time of the cached fetch, only present for cached views.
pub const LINKS_CACHE_FETCHED_AT_HEADER: &str = "x-links-cache-fetched-at";

#[derive(Debug, Deserialize)]
pub struct RenewTokenRequest {
    pub identity: String,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct RenewTokenResponse {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinksQuery {
    #[serde(default, deserialize_with = "query_flag")]
    pub include_hidden: bool,
}

/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off`, any case.
fn query_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(serde::de::Error::custom(format!("invalid boolean `{raw}`"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfigPatch {
    pub npm_base_url: String,
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/token/renew", post(renew_token))
        .route("/links", get(list_links))
        .route("/links/{id}", patch(patch_link).delete(reset_link))
        .route("/config", get(get_config).patch(patch_config))
        .with_state(state)
}

/// CORS for the UI. `*` allows any origin without credentials; an explicit
/// list allows credentials. Provenance headers are exposed either way.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let exposed = [
        HeaderName::from_static(LINKS_SOURCE_HEADER),
        HeaderName::from_static(LINKS_CACHE_FETCHED_AT_HEADER),
    ];
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed);
    }
    let list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers(exposed)
}

/// `GET /health`
async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// `POST /auth/token/renew`
async fn renew_token(
    State(state): State<AppState>,
    body: Result<Json<RenewTokenRequest>, JsonRejection>,
) -> Result<Json<RenewTokenResponse>, ServiceError> {
    let Json(req) = body?;
    let token = state.tokens.renew(&req.identity, &req.secret).await?;
    Ok(Json(RenewTokenResponse { token }))
}

/// `GET /links?include_hidden=<bool>`
async fn list_links(
    State(state): State<AppState>,
    BasicAuth(creds): BasicAuth,
    query: Result<Query<LinksQuery>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let Query(query) = query?;
    let is_admin = state.admin.is_admin(creds.as_ref());
    let view = state.links.get_view(query.include_hidden, is_admin).await?;

    let mut resp = Json(view.links).into_response();
    let headers = resp.headers_mut();
    headers.insert(
        LINKS_SOURCE_HEADER,
        HeaderValue::from_static(view.provenance.source()),
    );
    if let Provenance::Cache {
        fetched_at: Some(stamp),
    } = &view.provenance
        && let Ok(value) = HeaderValue::from_str(&stamp.text)
    {
        headers.insert(LINKS_CACHE_FETCHED_AT_HEADER, value);
    }
    Ok(resp)
}

// Admin handlers check credentials before looking at the path or body, so
// anonymous callers only ever see the 401.

/// `PATCH /links/{id}` (admin)
async fn patch_link(
    State(state): State<AppState>,
    BasicAuth(creds): BasicAuth,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<MetadataPatch>, JsonRejection>,
) -> Result<Json<MergedLink>, ServiceError> {
    state.admin.authorize(creds.as_ref())?;
    let Path(id) = id?;
    let Json(patch) = body?;
    let link = state.metadata.patch(creds.as_ref(), id, patch).await?;
    Ok(Json(link))
}

/// `DELETE /links/{id}` (admin)
async fn reset_link(
    State(state): State<AppState>,
    BasicAuth(creds): BasicAuth,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ServiceError> {
    state.admin.authorize(creds.as_ref())?;
    let Path(id) = id?;
    state.metadata.reset(creds.as_ref(), id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /config` (admin)
async fn get_config(
    State(state): State<AppState>,
    BasicAuth(creds): BasicAuth,
) -> Result<Json<RuntimeConfig>, ServiceError> {
    state.admin.authorize(creds.as_ref())?;
    Ok(Json(state.config.snapshot()))
}

/// `PATCH /config` (admin)
async fn patch_config(
    State(state): State<AppState>,
    BasicAuth(creds): BasicAuth,
    body: Result<Json<ConfigPatch>, JsonRejection>,
) -> Result<Json<RuntimeConfig>, ServiceError> {
    state.admin.authorize(creds.as_ref())?;
    let Json(patch) = body?;
    let updated = state
        .config
        .set_npm_base_url(&patch.npm_base_url)
        .map_err(|e| match e {
            npmdash_core::Error::Config(message) => ServiceError::Validation(message),
            other => ServiceError::Storage(other),
        })?;
    Ok(Json(updated))
}
