//! npmdash Server Library
//!
//! Dashboard backend over the Nginx Proxy Manager API:
//! - NPM client and token validation
//! - Link reconciliation with cache fallback and provenance
//! - Admin-only metadata edits and runtime config
//! - axum HTTP routes

pub mod admin;
pub mod error;
pub mod links;
pub mod metadata;
pub mod npm;
pub mod routes;
pub mod state;
pub mod token;

pub use error::ServiceError;
pub use state::{AppState, Settings};
