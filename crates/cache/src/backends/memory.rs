//! In-process tagged page cache.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheInvalidator;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// One cached rendering.
#[derive(Clone, Debug)]
pub struct CachedPage {
    pub body: Bytes,
    pub tags: BTreeSet<String>,
}

/// Page cache keyed by path, each entry carrying the data tags it was rendered from.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    pages: DashMap<String, CachedPage>,
    invalidations: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a rendering for `path`, replacing any previous one.
    pub fn put<I, S>(&self, path: &str, body: Bytes, tags: I) -> CacheResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !path.starts_with('/') {
            return Err(CacheError::InvalidKey(format!(
                "path must start with '/': {path}"
            )));
        }
        let tags = tags.into_iter().map(Into::into).collect();
        self.pages.insert(path.to_string(), CachedPage { body, tags });
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<CachedPage> {
        self.pages.get(path).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.pages.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of invalidation calls served, including ones that removed nothing.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CacheInvalidator for MemoryBackend {
    async fn invalidate_path(&self, path: &str) -> CacheResult<()> {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        let removed = self.pages.remove(path).is_some();
        debug!(path = %path, removed, "Invalidated path");
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> CacheResult<()> {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        let before = self.pages.len();
        self.pages.retain(|_, page| !page.tags.contains(tag));
        debug!(tag = %tag, removed = before.saturating_sub(self.pages.len()), "Invalidated tag");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend
            .put("/", Bytes::from_static(b"home"), ["projects", "services"])
            .unwrap();
        backend
            .put("/work", Bytes::from_static(b"work"), ["projects"])
            .unwrap();
        backend
            .put("/about", Bytes::from_static(b"about"), Vec::<String>::new())
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn invalidate_path_removes_only_that_page() {
        let backend = seeded();
        backend.invalidate_path("/work").await.unwrap();
        assert!(!backend.contains("/work"));
        assert!(backend.contains("/"));
        assert_eq!(backend.len(), 2);
    }

    #[tokio::test]
    async fn invalidate_tag_removes_every_tagged_page() {
        let backend = seeded();
        backend.invalidate_tag("projects").await.unwrap();
        assert!(!backend.contains("/"));
        assert!(!backend.contains("/work"));
        assert!(backend.contains("/about"));
    }

    #[tokio::test]
    async fn invalidation_is_idempotent() {
        let backend = seeded();
        backend.invalidate_path("/missing").await.unwrap();
        backend.invalidate_tag("faqs").await.unwrap();
        backend.invalidate_tag("faqs").await.unwrap();
        assert_eq!(backend.len(), 3);
        assert_eq!(backend.invalidation_count(), 3);
    }

    #[test]
    fn put_rejects_relative_path() {
        let backend = MemoryBackend::new();
        let err = backend
            .put("work", Bytes::from_static(b"x"), ["projects"])
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey(_)));
    }

    #[test]
    fn get_returns_tags() {
        let backend = seeded();
        let page = backend.get("/").unwrap();
        assert_eq!(page.body, Bytes::from_static(b"home"));
        assert!(page.tags.contains("services"));
    }
}
