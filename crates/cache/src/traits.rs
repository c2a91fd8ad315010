//! Cache backend trait definitions.

use crate::error::CacheResult;
use async_trait::async_trait;
use revalidator_core::{InvalidationTarget, TargetKind};

/// The invalidation primitives of a page cache.
///
/// Implementations must tolerate concurrent calls. Invalidating a key that is
/// not cached succeeds.
#[async_trait]
pub trait CacheInvalidator: Send + Sync + 'static {
    /// Discard the cached rendering of one page path.
    async fn invalidate_path(&self, path: &str) -> CacheResult<()>;

    /// Discard every cached rendering carrying `tag`.
    async fn invalidate_tag(&self, tag: &str) -> CacheResult<()>;

    /// Dispatch a resolved target to the matching primitive.
    async fn invalidate(&self, target: &InvalidationTarget) -> CacheResult<()> {
        match target.kind {
            TargetKind::Path => self.invalidate_path(&target.value).await,
            TargetKind::Tag => self.invalidate_tag(&target.value).await,
        }
    }

    /// Static identifier for the backend type (e.g., "memory", "http").
    /// Used for metrics, logging and the health endpoint.
    fn backend_name(&self) -> &'static str;

    /// Verify backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }
}
