//! Link model: upstream proxy hosts, local display metadata and the merged view.
//!
//! Upstream records are kept as raw JSON objects (`RawHost`) so the cache
//! stores exactly what the upstream returned. They are only interpreted as a
//! [`ProxyHostRecord`] when a view is built.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A proxy-host object exactly as returned by the upstream listing endpoint.
pub type RawHost = Map<String, Value>;

/// Maximum length (in characters) of a link's display name.
pub const NAME_MAX_CHARS: usize = 120;
/// Maximum length (in characters) of a link's description.
pub const DESCRIPTION_MAX_CHARS: usize = 500;
/// Maximum length (in characters) of a link's emoji.
pub const EMOJI_MAX_CHARS: usize = 8;

/// The fields of an upstream proxy host this dashboard cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyHostRecord {
    pub id: i64,
    pub domain_names: Vec<String>,
    pub forward_host: Option<String>,
    pub forward_port: Option<u16>,
    pub enabled: Option<bool>,
    pub ssl_forced: Option<bool>,
}

impl ProxyHostRecord {
    /// Interpret a raw upstream object.
    ///
    /// Returns `None` when the object has no usable integer `id`. Other
    /// fields degrade to their empty value when they have an unexpected type.
    pub fn from_raw(raw: &RawHost) -> Option<Self> {
        let id = raw.get("id").and_then(parse_id)?;

        let domain_names = raw
            .get("domain_names")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id,
            domain_names,
            forward_host: raw
                .get("forward_host")
                .and_then(Value::as_str)
                .map(str::to_string),
            forward_port: raw
                .get("forward_port")
                .and_then(Value::as_u64)
                .and_then(|p| u16::try_from(p).ok()),
            enabled: raw.get("enabled").and_then(parse_flag),
            ssl_forced: raw.get("ssl_forced").and_then(parse_flag),
        })
    }
}

/// Integer ids, integral floats and numeric strings are accepted.
#[allow(clippy::cast_possible_truncation)]
fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// NPM reports flags either as booleans or as `0`/`1`.
fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

/// Locally stored display metadata for one link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub hidden: bool,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Distinguishes an omitted field (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A partial metadata update.
///
/// Omitted fields leave the stored value alone. Text fields that are `null`,
/// empty or whitespace-only clear the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetadataPatch {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub emoji: Option<Option<String>>,
    #[serde(default)]
    pub hidden: Option<bool>,
}

/// A patch field exceeded its length limit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} must be at most {max} characters")]
pub struct FieldTooLong {
    pub field: &'static str,
    pub max: usize,
}

impl MetadataPatch {
    /// Check field lengths, counted in characters rather than bytes.
    pub fn validate(&self) -> Result<(), FieldTooLong> {
        let checks = [
            ("name", &self.name, NAME_MAX_CHARS),
            ("description", &self.description, DESCRIPTION_MAX_CHARS),
            ("emoji", &self.emoji, EMOJI_MAX_CHARS),
        ];
        for (field, value, max) in checks {
            if let Some(Some(text)) = value
                && text.chars().count() > max
            {
                return Err(FieldTooLong { field, max });
            }
        }
        Ok(())
    }

    /// Apply this patch on top of `current`.
    pub fn apply(self, current: &mut LinkMetadata) {
        apply_text(self.name, &mut current.name);
        apply_text(self.description, &mut current.description);
        apply_text(self.emoji, &mut current.emoji);
        if let Some(hidden) = self.hidden {
            current.hidden = hidden;
        }
    }
}

fn apply_text(update: Option<Option<String>>, slot: &mut Option<String>) {
    match update {
        None => {}
        Some(Some(text)) if !text.trim().is_empty() => *slot = Some(text),
        Some(_) => *slot = None,
    }
}

/// A proxy host combined with its display metadata, as served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedLink {
    pub id: i64,
    pub domain_names: Vec<String>,
    pub forward_host: Option<String>,
    pub forward_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_forced: Option<bool>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub hidden: bool,
}

impl MergedLink {
    /// Merge a host with its metadata; a missing entry means default display.
    pub fn new(host: ProxyHostRecord, meta: Option<&LinkMetadata>) -> Self {
        let meta = meta.cloned().unwrap_or_default();
        Self {
            id: host.id,
            domain_names: host.domain_names,
            forward_host: host.forward_host,
            forward_port: host.forward_port,
            enabled: host.enabled,
            ssl_forced: host.ssl_forced,
            name: meta.name,
            description: meta.description,
            emoji: meta.emoji,
            hidden: meta.hidden,
        }
    }

    /// Ordering key: the first domain name, or the empty string.
    pub fn sort_key(&self) -> &str {
        self.domain_names.first().map_or("", String::as_str)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawHost {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn host_with_integer_id_parses() {
        let host = ProxyHostRecord::from_raw(&raw(json!({
            "id": 7,
            "domain_names": ["a.example.com", "b.example.com"],
            "forward_host": "10.0.0.2",
            "forward_port": 8080,
            "enabled": 1,
            "ssl_forced": false
        })))
        .unwrap();
        assert_eq!(host.id, 7);
        assert_eq!(host.domain_names, vec!["a.example.com", "b.example.com"]);
        assert_eq!(host.forward_host.as_deref(), Some("10.0.0.2"));
        assert_eq!(host.forward_port, Some(8080));
        assert_eq!(host.enabled, Some(true));
        assert_eq!(host.ssl_forced, Some(false));
    }

    #[test]
    fn numeric_string_id_is_accepted() {
        let host = ProxyHostRecord::from_raw(&raw(json!({"id": " 12 "}))).unwrap();
        assert_eq!(host.id, 12);
        assert!(host.domain_names.is_empty());
    }

    #[test]
    fn non_numeric_or_missing_id_is_rejected() {
        assert!(ProxyHostRecord::from_raw(&raw(json!({"id": "abc"}))).is_none());
        assert!(ProxyHostRecord::from_raw(&raw(json!({"id": null}))).is_none());
        assert!(ProxyHostRecord::from_raw(&raw(json!({"id": 1.5}))).is_none());
        assert!(ProxyHostRecord::from_raw(&raw(json!({"id": true}))).is_none());
        assert!(ProxyHostRecord::from_raw(&raw(json!({"domain_names": ["x"]}))).is_none());
    }

    #[test]
    fn malformed_optional_fields_degrade() {
        let host = ProxyHostRecord::from_raw(&raw(json!({
            "id": 3,
            "domain_names": "not-a-list",
            "forward_host": 42,
            "forward_port": 70000
        })))
        .unwrap();
        assert!(host.domain_names.is_empty());
        assert_eq!(host.forward_host, None);
        assert_eq!(host.forward_port, None);
    }

    #[test]
    fn metadata_null_hidden_reads_as_visible() {
        let meta: LinkMetadata =
            serde_json::from_value(json!({"name": "Wiki", "hidden": null})).unwrap();
        assert_eq!(meta.name.as_deref(), Some("Wiki"));
        assert!(!meta.hidden);
    }

    #[test]
    fn patch_distinguishes_omitted_from_null() {
        let patch: MetadataPatch =
            serde_json::from_value(json!({"name": null, "hidden": true})).unwrap();
        assert_eq!(patch.name, Some(None));
        assert_eq!(patch.description, None);
        assert_eq!(patch.hidden, Some(true));
    }

    #[test]
    fn patch_keeps_omitted_and_clears_blank() {
        let mut current = LinkMetadata {
            name: Some("Old".into()),
            description: Some("Keep me".into()),
            emoji: Some("🔗".into()),
            hidden: true,
        };
        let patch: MetadataPatch =
            serde_json::from_value(json!({"name": "New", "emoji": "   "})).unwrap();
        patch.apply(&mut current);

        assert_eq!(current.name.as_deref(), Some("New"));
        assert_eq!(current.description.as_deref(), Some("Keep me"));
        assert_eq!(current.emoji, None);
        assert!(current.hidden);
    }

    #[test]
    fn patch_hidden_overwrites() {
        let mut current = LinkMetadata {
            hidden: true,
            ..LinkMetadata::default()
        };
        MetadataPatch {
            hidden: Some(false),
            ..MetadataPatch::default()
        }
        .apply(&mut current);
        assert!(!current.hidden);
    }

    #[test]
    fn validate_counts_characters_not_bytes() {
        let ok = MetadataPatch {
            emoji: Some(Some("🚀🚀🚀🚀🚀🚀🚀🚀".into())),
            ..MetadataPatch::default()
        };
        assert!(ok.validate().is_ok());

        let too_long = MetadataPatch {
            emoji: Some(Some("🚀".repeat(9))),
            ..MetadataPatch::default()
        };
        assert_eq!(
            too_long.validate().unwrap_err(),
            FieldTooLong {
                field: "emoji",
                max: EMOJI_MAX_CHARS
            }
        );

        let long_name = MetadataPatch {
            name: Some(Some("x".repeat(NAME_MAX_CHARS + 1))),
            ..MetadataPatch::default()
        };
        assert_eq!(long_name.validate().unwrap_err().field, "name");
    }

    #[test]
    fn merged_link_defaults_without_metadata() {
        let host = ProxyHostRecord::from_raw(&raw(json!({"id": 1, "domain_names": ["x.io"]})))
            .unwrap();
        let link = MergedLink::new(host, None);
        assert_eq!(link.id, 1);
        assert!(!link.hidden);
        assert_eq!(link.name, None);
        assert_eq!(link.sort_key(), "x.io");
    }

    #[test]
    fn merged_link_serializes_without_absent_flags() {
        let host = ProxyHostRecord::from_raw(&raw(json!({"id": 1}))).unwrap();
        let value = serde_json::to_value(MergedLink::new(host, None)).unwrap();
        assert!(value.get("enabled").is_none());
        assert_eq!(value["domain_names"], json!([]));
        assert_eq!(value["hidden"], json!(false));
        assert_eq!(value["name"], Value::Null);
    }
}
