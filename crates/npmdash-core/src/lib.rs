//! `npmdash` Core Library
//!
//! Shared functionality for the dashboard backend:
//! - Proxy-host and link metadata model
//! - Durable JSON stores with atomic replace
//! - Runtime configuration (upstream base URL)
//! - Common error types

pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod tracing_init;

pub use config::{RuntimeConfig, RuntimeConfigHandle};
pub use error::{Error, Result};
pub use model::{LinkMetadata, MergedLink, MetadataPatch, ProxyHostRecord, RawHost};
