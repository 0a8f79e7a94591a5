//! Admin edits to link display metadata.
//!
//! A patch is only committed after a successful live check that the link id
//! still exists upstream. There is no cache fallback here: committing
//! against stale host data could attach metadata to a deleted host.

use std::sync::Arc;

use npmdash_core::store::{MetadataStore, TokenStore};
use npmdash_core::{MergedLink, MetadataPatch, ProxyHostRecord};
use tracing::{info, instrument};

use crate::admin::{AdminGuard, BasicCredentials};
use crate::error::ServiceError;
use crate::npm::NpmClient;
use crate::token::TokenValidator;

#[derive(Debug, Clone)]
pub struct MetadataService {
    client: Arc<NpmClient>,
    validator: TokenValidator,
    tokens: TokenStore,
    metadata: MetadataStore,
    admin: Arc<AdminGuard>,
}

impl MetadataService {
    pub fn new(
        client: Arc<NpmClient>,
        tokens: TokenStore,
        metadata: MetadataStore,
        admin: Arc<AdminGuard>,
    ) -> Self {
        Self {
            validator: TokenValidator::new(Arc::clone(&client)),
            client,
            tokens,
            metadata,
            admin,
        }
    }

    /// Apply `patch` to the metadata of link `id` and return the merged link.
    #[instrument(skip(self, caller, patch))]
    pub async fn patch(
        &self,
        caller: Option<&BasicCredentials>,
        id: i64,
        patch: MetadataPatch,
    ) -> Result<MergedLink, ServiceError> {
        self.admin.authorize(caller)?;
        patch
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let token = self.tokens.load().ok_or_else(|| {
            ServiceError::TokenInvalid(
                "No saved NPM token. Call POST /auth/token/renew first.".into(),
            )
        })?;
        if !self.validator.is_valid(&token).await {
            return Err(ServiceError::TokenInvalid(
                "Saved NPM token is invalid/expired. Call POST /auth/token/renew.".into(),
            ));
        }

        let hosts = self.client.list_proxy_hosts(&token).await?;
        let host = hosts
            .iter()
            .filter_map(ProxyHostRecord::from_raw)
            .find(|h| h.id == id)
            .ok_or(ServiceError::NotFound(id))?;

        let mut meta = self.metadata.load();
        let key = id.to_string();
        let mut entry = meta.remove(&key).unwrap_or_default();
        patch.apply(&mut entry);
        let link = MergedLink::new(host, Some(&entry));
        meta.insert(key, entry);
        self.metadata.save(&meta)?;

        info!(link_id = id, "Link metadata updated");
        Ok(link)
    }

    /// Drop all metadata for link `id`. Resetting an unknown id succeeds.
    #[instrument(skip(self, caller))]
    pub fn reset(&self, caller: Option<&BasicCredentials>, id: i64) -> Result<(), ServiceError> {
        self.admin.authorize(caller)?;
        let removed = self.metadata.remove(id)?;
        info!(link_id = id, removed, "Link metadata reset");
        Ok(())
    }
}
