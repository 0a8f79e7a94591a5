//! Durable JSON documents on local disk.
//!
//! Every document is written by replacing the whole file: the new contents
//! go to a temporary file in the same directory, are flushed to disk, then
//! renamed over the target. Readers therefore see either the previous or the
//! new document, never a partial one. Files are owner read/write only.
//!
//! Reads are forgiving: a missing file is an empty store and a corrupt file
//! is logged and treated the same way.

mod cache;
mod metadata;
mod token;

pub use cache::{CacheSnapshot, CacheStore, FetchStamp};
pub use metadata::{MetadataMap, MetadataStore};
pub use token::TokenStore;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;

/// A single JSON document at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw document. `None` if it is missing, unreadable or not JSON.
    pub fn read_value(&self) -> Option<Value> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read store file");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt store file");
                None
            }
        }
    }

    /// Read and deserialize the document, with the same forgiveness as
    /// [`read_value`](Self::read_value).
    pub fn read<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.read_value()?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Store file has unexpected shape");
                None
            }
        }
    }

    /// Atomically replace the document with `value`.
    pub fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_vec_pretty(value)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".npmdash-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
