//! Tests for the NPM API client.

use std::sync::Arc;
use std::time::Duration;

use npmdash_core::RuntimeConfigHandle;

use super::client::{NpmClient, NpmError, parse_host_list, truncate_chars};
use super::{PROXY_HOSTS_PATH, TOKENS_PATH};

fn client(dir: &tempfile::TempDir, base_url: &str) -> NpmClient {
    let config = RuntimeConfigHandle::load(dir.path().join("config.json"), base_url).unwrap();
    NpmClient::new(Arc::new(config), Duration::from_secs(1)).unwrap()
}

#[test]
fn api_url_uses_normalised_base() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(&dir, "http://npm.local:81/");
    assert_eq!(
        client.api_url(PROXY_HOSTS_PATH),
        "http://npm.local:81/api/nginx/proxy-hosts"
    );
    assert_eq!(client.api_url(TOKENS_PATH), "http://npm.local:81/api/tokens");
}

#[test]
fn api_url_follows_runtime_config_changes() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(
        RuntimeConfigHandle::load(dir.path().join("config.json"), "http://old.local").unwrap(),
    );
    let client = NpmClient::new(Arc::clone(&config), Duration::from_secs(1)).unwrap();

    config.set_npm_base_url("https://new.local:8443").unwrap();
    assert_eq!(
        client.api_url(PROXY_HOSTS_PATH),
        "https://new.local:8443/api/nginx/proxy-hosts"
    );
}

#[test]
fn host_list_keeps_objects_only() {
    let hosts = parse_host_list(br#"[{"id": 1}, 2, "three", {"id": "4"}]"#).unwrap();
    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0]["id"], 1);
}

#[test]
fn host_list_must_be_array() {
    let err = parse_host_list(br#"{"error": "nope"}"#).unwrap_err();
    assert!(matches!(err, NpmError::BadResponse(_)));
}

#[test]
fn host_list_must_be_json() {
    let err = parse_host_list(b"<html>502 Bad Gateway</html>").unwrap_err();
    assert!(matches!(err, NpmError::BadResponse(_)));
}

#[test]
fn truncation_counts_characters() {
    assert_eq!(truncate_chars("héllo", 2), "hé");
    assert_eq!(truncate_chars("short", 300), "short");
}

#[test]
fn auth_failure_message_includes_status() {
    let err = NpmError::AuthFailed {
        status: 400,
        message: "Invalid password".into(),
    };
    assert_eq!(
        err.to_string(),
        "NPM authentication failed (HTTP 400): Invalid password"
    );
}
