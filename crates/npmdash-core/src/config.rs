//! Runtime configuration for the dashboard backend.
//!
//! The upstream base URL has a process default (CLI flag or environment) and
//! can be overridden by an admin at runtime. Overrides are persisted and
//! reloaded on the next start. All changes go through
//! [`RuntimeConfigHandle::set_npm_base_url`], which applies the same
//! validation used at load time.

use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::store::JsonFile;

/// Persisted runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub npm_base_url: String,
}

/// Normalise and validate an upstream base URL.
///
/// Surrounding whitespace and trailing slashes are removed. The result must
/// be non-empty and use the `http` or `https` scheme.
pub fn validate_base_url(url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(Error::Config("NPM base URL cannot be empty.".into()));
    }
    let has_host = |rest: &str| !rest.is_empty() && !rest.starts_with('/');
    let scheme_ok = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .is_some_and(has_host);
    if !scheme_ok {
        return Err(Error::Config(
            "NPM base URL must start with http:// or https://".into(),
        ));
    }
    Ok(url.to_string())
}

/// Shared, validated runtime configuration backed by a JSON file.
#[derive(Debug)]
pub struct RuntimeConfigHandle {
    current: RwLock<RuntimeConfig>,
    file: JsonFile,
}

impl RuntimeConfigHandle {
    /// Load the persisted configuration from `path`.
    ///
    /// Falls back to `default_base_url` when the file is missing, corrupt or
    /// holds an invalid URL. The default itself must be valid.
    pub fn load(path: impl Into<PathBuf>, default_base_url: &str) -> Result<Self> {
        let file = JsonFile::new(path);
        let default_base_url = validate_base_url(default_base_url)?;

        let npm_base_url = match file.read::<RuntimeConfig>() {
            Some(stored) => match validate_base_url(&stored.npm_base_url) {
                Ok(url) => url,
                Err(e) => {
                    warn!(
                        path = %file.path().display(),
                        error = %e,
                        "Stored NPM base URL is invalid, using default"
                    );
                    default_base_url
                }
            },
            None => default_base_url,
        };

        info!(npm_base_url = %npm_base_url, "Runtime config loaded");
        Ok(Self {
            current: RwLock::new(RuntimeConfig { npm_base_url }),
            file,
        })
    }

    /// A copy of the current configuration.
    pub fn snapshot(&self) -> RuntimeConfig {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn npm_base_url(&self) -> String {
        self.snapshot().npm_base_url
    }

    /// Validate, persist, then apply a new upstream base URL.
    ///
    /// The in-memory value only changes once the file write succeeded.
    pub fn set_npm_base_url(&self, url: &str) -> Result<RuntimeConfig> {
        let next = RuntimeConfig {
            npm_base_url: validate_base_url(url)?,
        };
        self.file.write(&next)?;

        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone_from(&next);
        drop(guard);

        info!(npm_base_url = %next.npm_base_url, "NPM base URL updated");
        Ok(next)
    }
}
