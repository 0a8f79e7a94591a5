//! Process settings and the shared application state built from them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use npmdash_core::RuntimeConfigHandle;
use npmdash_core::store::{CacheStore, MetadataStore, TokenStore};

use crate::admin::AdminGuard;
use crate::links::LinkService;
use crate::metadata::MetadataService;
use crate::npm::{NpmClient, NpmError};
use crate::token::TokenService;

/// Everything needed to assemble the services.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Used when the config file holds no valid override.
    pub default_npm_base_url: String,
    pub npm_timeout: Duration,
    pub token_file: PathBuf,
    pub meta_file: PathBuf,
    pub config_file: PathBuf,
    pub cache_file: PathBuf,
    pub admin_user: String,
    pub admin_pass: String,
}

/// Startup failures while assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] npmdash_core::Error),
    #[error(transparent)]
    Client(#[from] NpmError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub links: Arc<LinkService>,
    pub metadata: Arc<MetadataService>,
    pub tokens: Arc<TokenService>,
    pub admin: Arc<AdminGuard>,
    pub config: Arc<RuntimeConfigHandle>,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> Result<Self, StateError> {
        let config = Arc::new(RuntimeConfigHandle::load(
            &settings.config_file,
            &settings.default_npm_base_url,
        )?);
        let client = Arc::new(NpmClient::new(Arc::clone(&config), settings.npm_timeout)?);
        let admin = Arc::new(AdminGuard::new(&settings.admin_user, &settings.admin_pass));

        let tokens = TokenStore::new(&settings.token_file);
        let metadata = MetadataStore::new(&settings.meta_file);
        let cache = CacheStore::new(&settings.cache_file);

        Ok(Self {
            links: Arc::new(LinkService::new(
                Arc::clone(&client),
                tokens.clone(),
                cache,
                metadata.clone(),
                admin.is_configured(),
            )),
            metadata: Arc::new(MetadataService::new(
                Arc::clone(&client),
                tokens.clone(),
                metadata,
                Arc::clone(&admin),
            )),
            tokens: Arc::new(TokenService::new(client, tokens)),
            admin,
            config,
        })
    }
}
