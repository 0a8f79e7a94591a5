//! Upstream API token: validation probe and renewal.

use std::sync::Arc;

use npmdash_core::store::TokenStore;
use tracing::{debug, info, instrument};

use crate::error::ServiceError;
use crate::npm::{NpmClient, NpmError};

/// Cheap liveness check for a stored token.
///
/// Issues the listing request and reports the token invalid only when the
/// upstream answers with an authentication failure. Any other outcome counts
/// as valid: the follow-up request classifies it again, and the token can
/// still expire between this probe and that request.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    client: Arc<NpmClient>,
}

impl TokenValidator {
    pub const fn new(client: Arc<NpmClient>) -> Self {
        Self { client }
    }

    pub async fn is_valid(&self, token: &str) -> bool {
        match self.client.list_proxy_hosts(token).await {
            Ok(_) => true,
            Err(NpmError::Unauthorized) => false,
            Err(e) => {
                debug!(error = %e, "Token probe inconclusive");
                true
            }
        }
    }
}

/// Exchanges upstream credentials for a token and persists it.
#[derive(Debug, Clone)]
pub struct TokenService {
    client: Arc<NpmClient>,
    tokens: TokenStore,
}

impl TokenService {
    pub const fn new(client: Arc<NpmClient>, tokens: TokenStore) -> Self {
        Self { client, tokens }
    }

    #[instrument(skip(self, secret))]
    pub async fn renew(&self, identity: &str, secret: &str) -> Result<String, ServiceError> {
        let token = self.client.exchange_credentials(identity, secret).await?;
        self.tokens.save(&token)?;
        info!("NPM token renewed");
        Ok(token)
    }
}
