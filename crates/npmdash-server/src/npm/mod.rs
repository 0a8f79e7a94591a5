//! Nginx Proxy Manager API integration.
//!
//! Provides a reqwest-based client for the two upstream endpoints this
//! dashboard consumes: the token exchange and the proxy-host listing.

mod client;

#[cfg(test)]
mod tests;

pub use client::{NpmClient, NpmError, PROXY_HOSTS_PATH, TOKENS_PATH};
