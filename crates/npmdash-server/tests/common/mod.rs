//! Shared test fixtures: a fake NPM upstream and settings over a temp dir.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tempfile::TempDir;

use npmdash_core::RawHost;
use npmdash_server::{AppState, Settings};

pub const NPM_IDENTITY: &str = "ops@example.com";
pub const NPM_SECRET: &str = "changeme";
pub const ISSUED_TOKEN: &str = "fresh-token";
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "pw";

/// Mutable behaviour of the fake upstream.
#[derive(Debug)]
pub struct FakeState {
    /// The only bearer token the listing endpoint accepts.
    pub valid_token: String,
    /// Body returned by a successful listing.
    pub hosts: Value,
    /// Status returned for an authorised listing; non-200 returns no hosts.
    pub list_status: StatusCode,
    /// Number of listing requests received.
    pub list_calls: usize,
    /// Listing calls after this many answer 401 regardless of the token.
    pub accept_listings: Option<usize>,
}

/// A fake Nginx Proxy Manager serving `/api/tokens` and
/// `/api/nginx/proxy-hosts` on an ephemeral local port.
pub struct FakeNpm {
    pub base_url: String,
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeNpm {
    pub async fn start(hosts: Value) -> Self {
        let state = Arc::new(Mutex::new(FakeState {
            valid_token: ISSUED_TOKEN.to_string(),
            hosts,
            list_status: StatusCode::OK,
            list_calls: 0,
            accept_listings: None,
        }));
        let app = Router::new()
            .route("/api/tokens", post(issue_token))
            .route("/api/nginx/proxy-hosts", get(list_hosts))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn set_hosts(&self, hosts: Value) {
        self.state.lock().unwrap().hosts = hosts;
    }

    pub fn set_list_status(&self, status: StatusCode) {
        self.state.lock().unwrap().list_status = status;
    }

    /// Accept only the next `count` listing calls, then reject the token.
    pub fn expire_token_after(&self, count: usize) {
        let mut state = self.state.lock().unwrap();
        state.accept_listings = Some(state.list_calls + count);
    }

    pub fn set_valid_token(&self, token: &str) {
        self.state.lock().unwrap().valid_token = token.to_string();
    }
}

async fn issue_token(Json(body): Json<Value>) -> Response {
    if body["identity"] == NPM_IDENTITY && body["secret"] == NPM_SECRET {
        Json(json!({"token": ISSUED_TOKEN, "expires": "2099-01-01T00:00:00.000Z"}))
            .into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": 400, "message": "Invalid password"}})),
        )
            .into_response()
    }
}

async fn list_hosts(State(state): State<Arc<Mutex<FakeState>>>, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    state.list_calls += 1;

    let expected = format!("Bearer {}", state.valid_token);
    let authorised = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    let expired = state
        .accept_listings
        .is_some_and(|limit| state.list_calls > limit);
    if !authorised || expired {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response();
    }
    if state.list_status != StatusCode::OK {
        return (state.list_status, "upstream trouble").into_response();
    }
    Json(state.hosts.clone()).into_response()
}

/// A base URL on which nothing is listening.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Settings with every file under `dir` and admin access configured.
pub fn settings(dir: &TempDir, base_url: &str) -> Settings {
    Settings {
        default_npm_base_url: base_url.to_string(),
        npm_timeout: Duration::from_secs(2),
        token_file: dir.path().join("npm_token.json"),
        meta_file: dir.path().join("dashboard_links_meta.json"),
        config_file: dir.path().join("dashboard_config.json"),
        cache_file: dir.path().join("dashboard_links_cache.json"),
        admin_user: ADMIN_USER.to_string(),
        admin_pass: ADMIN_PASS.to_string(),
    }
}

pub fn app_state(settings: &Settings) -> AppState {
    AppState::from_settings(settings).unwrap()
}

pub fn save_token(settings: &Settings, token: &str) {
    npmdash_core::store::TokenStore::new(&settings.token_file)
        .save(token)
        .unwrap();
}

pub fn raw_hosts(value: Value) -> Vec<RawHost> {
    let Value::Array(items) = value else {
        panic!("expected array");
    };
    items
        .into_iter()
        .map(|v| match v {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        })
        .collect()
}

pub fn sample_hosts() -> Value {
    json!([
        {"id": 7, "domain_names": ["b.example.com"], "forward_host": "10.0.0.7", "forward_port": 3000},
        {"id": 3, "domain_names": ["a.example.com"], "forward_host": "10.0.0.3", "forward_port": 8080}
    ])
}
