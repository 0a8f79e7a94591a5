//! Snapshot of the last successful live proxy-host listing.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use super::JsonFile;
use crate::error::Result;
use crate::model::RawHost;

/// When a snapshot was fetched: the parsed instant and the text it was
/// stored as, so it can be echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchStamp {
    pub at: DateTime<Utc>,
    pub text: String,
}

impl FetchStamp {
    fn now() -> Self {
        Self::from_instant(Utc::now())
    }

    fn from_instant(at: DateTime<Utc>) -> Self {
        Self {
            at,
            text: at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    fn parse(text: &str) -> Option<Self> {
        let at = DateTime::parse_from_rfc3339(text).ok()?.with_timezone(&Utc);
        Some(Self {
            at,
            text: text.to_string(),
        })
    }
}

/// The cached upstream listing and when it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    /// `None` when the stored timestamp is missing or unparseable.
    pub fetched_at: Option<FetchStamp>,
    pub hosts: Vec<RawHost>,
}

#[derive(Serialize)]
struct StoredSnapshot<'a> {
    fetched_at: &'a str,
    hosts: &'a [RawHost],
}

impl CacheSnapshot {
    /// Interpret a stored document. Requires a `hosts` array; non-object
    /// entries inside it are dropped.
    fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut doc) = value else {
            return None;
        };
        let Some(Value::Array(hosts)) = doc.remove("hosts") else {
            return None;
        };
        let fetched_at = doc
            .get("fetched_at")
            .and_then(Value::as_str)
            .and_then(FetchStamp::parse);
        let hosts = hosts
            .into_iter()
            .filter_map(|h| match h {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        Some(Self { fetched_at, hosts })
    }
}

/// Written only after a successful live fetch; read whenever live data is
/// unavailable.
#[derive(Debug, Clone)]
pub struct CacheStore {
    file: JsonFile,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn load(&self) -> Option<CacheSnapshot> {
        CacheSnapshot::from_value(self.file.read_value()?)
    }

    /// Replace the snapshot with `hosts`, stamped with the current time.
    pub fn save(&self, hosts: Vec<RawHost>) -> Result<CacheSnapshot> {
        self.write(hosts, FetchStamp::now())
    }

    pub fn save_at(&self, hosts: Vec<RawHost>, fetched_at: DateTime<Utc>) -> Result<CacheSnapshot> {
        self.write(hosts, FetchStamp::from_instant(fetched_at))
    }

    fn write(&self, hosts: Vec<RawHost>, stamp: FetchStamp) -> Result<CacheSnapshot> {
        self.file.write(&StoredSnapshot {
            fetched_at: &stamp.text,
            hosts: &hosts,
        })?;
        Ok(CacheSnapshot {
            fetched_at: Some(stamp),
            hosts,
        })
    }
}
