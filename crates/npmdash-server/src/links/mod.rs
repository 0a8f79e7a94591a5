//! Link reconciliation: the current view of links.
//!
//! A view request tries live data first and degrades to the cached snapshot
//! on any failure: no stored token, a token the upstream rejects, the
//! upstream being unreachable, or a malformed response. Only a successful
//! live fetch overwrites the cache. Every view carries its provenance.

mod merge;

pub use merge::{build_view, merge_hosts};

use std::sync::Arc;

use npmdash_core::store::{CacheStore, FetchStamp, MetadataStore, TokenStore};
use npmdash_core::{MergedLink, RawHost};
use tracing::{info, instrument, warn};

use crate::error::ServiceError;
use crate::npm::NpmClient;
use crate::token::TokenValidator;

/// Where the hosts in a view came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Live,
    /// Served from the cached snapshot, fetched at the given time when known.
    Cache { fetched_at: Option<FetchStamp> },
}

impl Provenance {
    /// Value of the source indicator: `live` or `cache`.
    pub const fn source(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Cache { .. } => "cache",
        }
    }
}

/// A filtered, sorted list of links plus where they came from.
#[derive(Debug, Clone)]
pub struct LinkView {
    pub links: Vec<MergedLink>,
    pub provenance: Provenance,
}

/// Builds link views from live upstream data or the cache.
#[derive(Debug, Clone)]
pub struct LinkService {
    client: Arc<NpmClient>,
    validator: TokenValidator,
    tokens: TokenStore,
    cache: CacheStore,
    metadata: MetadataStore,
    admin_configured: bool,
}

impl LinkService {
    pub fn new(
        client: Arc<NpmClient>,
        tokens: TokenStore,
        cache: CacheStore,
        metadata: MetadataStore,
        admin_configured: bool,
    ) -> Self {
        Self {
            validator: TokenValidator::new(Arc::clone(&client)),
            client,
            tokens,
            cache,
            metadata,
            admin_configured,
        }
    }

    /// Produce the current view of links.
    ///
    /// Hidden links are only included for admin callers. Fails with
    /// [`ServiceError::NoDataAvailable`] when live data cannot be fetched
    /// and no cache exists.
    #[instrument(skip(self))]
    pub async fn get_view(
        &self,
        include_hidden: bool,
        caller_is_admin: bool,
    ) -> Result<LinkView, ServiceError> {
        if include_hidden && !caller_is_admin {
            return Err(if self.admin_configured {
                ServiceError::Forbidden
            } else {
                ServiceError::NotConfigured
            });
        }

        let (hosts, provenance) = match self.fetch_live().await {
            Some(hosts) => (hosts, Provenance::Live),
            None => {
                let snapshot = self.cache.load().ok_or(ServiceError::NoDataAvailable)?;
                info!(
                    fetched_at = snapshot.fetched_at.as_ref().map(|s| s.text.as_str()),
                    count = snapshot.hosts.len(),
                    "Serving links from cache"
                );
                (
                    snapshot.hosts,
                    Provenance::Cache {
                        fetched_at: snapshot.fetched_at,
                    },
                )
            }
        };

        let meta = self.metadata.load();
        let links = build_view(&hosts, &meta, include_hidden);
        Ok(LinkView { links, provenance })
    }

    /// Attempt a live fetch. `None` means the caller should fall back to the
    /// cache. On success the cache is overwritten with the fetched hosts.
    async fn fetch_live(&self) -> Option<Vec<RawHost>> {
        let Some(token) = self.tokens.load() else {
            info!("No stored NPM token, skipping live fetch");
            return None;
        };
        if !self.validator.is_valid(&token).await {
            warn!("Stored NPM token is invalid or expired");
            return None;
        }

        // The token may have expired since validation; this result decides.
        let hosts = match self.client.list_proxy_hosts(&token).await {
            Ok(hosts) => hosts,
            Err(e) => {
                warn!(error = %e, "Live fetch failed, falling back to cache");
                return None;
            }
        };

        match self.cache.save(hosts.clone()) {
            Ok(_) => info!(count = hosts.len(), "Fetched live links, cache updated"),
            Err(e) => warn!(error = %e, "Failed to update links cache"),
        }
        Some(hosts)
    }
}
