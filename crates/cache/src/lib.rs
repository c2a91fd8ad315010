//! Cache invalidation backends for the revalidator.
//!
//! This crate provides:
//! - The `CacheInvalidator` trait: the per-path and per-tag purge primitives
//! - An in-process tagged page cache
//! - An HTTP backend that forwards purges to an upstream endpoint

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{http::HttpBackend, memory::MemoryBackend};
pub use error::{CacheError, CacheResult};
pub use traits::CacheInvalidator;

use revalidator_core::config::BackendConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create a cache backend from configuration.
pub fn from_config(config: &BackendConfig) -> CacheResult<Arc<dyn CacheInvalidator>> {
    config.validate().map_err(CacheError::Config)?;

    match config {
        BackendConfig::Memory => Ok(Arc::new(MemoryBackend::new())),
        BackendConfig::Http {
            endpoint,
            token,
            timeout_secs,
        } => {
            let backend =
                HttpBackend::new(endpoint, token.clone(), Duration::from_secs(*timeout_secs))?;
            Ok(Arc::new(backend))
        }
    }
}
