//! Per-link display metadata persistence.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;
use tracing::warn;

use super::JsonFile;
use crate::error::Result;
use crate::model::LinkMetadata;

/// Metadata entries keyed by the stringified upstream host id.
pub type MetadataMap = BTreeMap<String, LinkMetadata>;

#[derive(Debug, Clone)]
pub struct MetadataStore {
    file: JsonFile,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    /// Load all entries. Entries that are not valid metadata objects are
    /// skipped individually so one bad entry does not hide the others.
    pub fn load(&self) -> MetadataMap {
        let Some(Value::Object(entries)) = self.file.read_value() else {
            return MetadataMap::new();
        };
        entries
            .into_iter()
            .filter_map(|(key, value)| {
                if !value.is_object() {
                    return None;
                }
                match serde_json::from_value::<LinkMetadata>(value) {
                    Ok(meta) => Some((key, meta)),
                    Err(e) => {
                        warn!(key = %key, error = %e, "Skipping malformed metadata entry");
                        None
                    }
                }
            })
            .collect()
    }

    pub fn save(&self, meta: &MetadataMap) -> Result<()> {
        self.file.write(meta)
    }

    /// Remove the entry for `id`. Removing an absent entry is not an error.
    pub fn remove(&self, id: i64) -> Result<bool> {
        let mut meta = self.load();
        let removed = meta.remove(&id.to_string()).is_some();
        self.save(&meta)?;
        Ok(removed)
    }
}
