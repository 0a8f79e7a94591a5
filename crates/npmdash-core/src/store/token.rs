//! Upstream API token persistence.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::JsonFile;
use crate::error::Result;

#[derive(Serialize, Deserialize)]
struct TokenDocument {
    token: String,
}

/// Holds the bearer token obtained from the upstream credential exchange.
///
/// The token is never removed automatically; a rejected token simply stays
/// on disk until it is replaced by a new exchange.
#[derive(Debug, Clone)]
pub struct TokenStore {
    file: JsonFile,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    /// The stored token, trimmed. Blank tokens count as absent.
    pub fn load(&self) -> Option<String> {
        let doc: TokenDocument = self.file.read()?;
        let token = doc.token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn save(&self, token: &str) -> Result<()> {
        self.file.write(&TokenDocument {
            token: token.to_string(),
        })
    }
}
