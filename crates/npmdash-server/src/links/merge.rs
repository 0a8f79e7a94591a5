//! Pure view construction: merge hosts with metadata, filter, sort.

use npmdash_core::store::MetadataMap;
use npmdash_core::{MergedLink, ProxyHostRecord, RawHost};

/// Merge raw hosts with their metadata. Hosts without a usable integer id
/// are dropped.
pub fn merge_hosts(hosts: &[RawHost], meta: &MetadataMap) -> Vec<MergedLink> {
    hosts
        .iter()
        .filter_map(ProxyHostRecord::from_raw)
        .map(|host| {
            let entry = meta.get(&host.id.to_string());
            MergedLink::new(host, entry)
        })
        .collect()
}

/// Merge, drop hidden links unless requested, then order by first domain.
///
/// The sort is stable and compares raw strings, so identical inputs always
/// produce identical output.
pub fn build_view(hosts: &[RawHost], meta: &MetadataMap, include_hidden: bool) -> Vec<MergedLink> {
    let mut links = merge_hosts(hosts, meta);
    if !include_hidden {
        links.retain(|link| !link.hidden);
    }
    links.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
    links
}
