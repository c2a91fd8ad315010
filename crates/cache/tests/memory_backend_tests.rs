use bytes::Bytes;
use revalidator_cache::{CacheInvalidator, MemoryBackend};
use std::sync::Arc;

#[tokio::test]
async fn concurrent_invalidations_leave_consistent_state() {
    let backend = Arc::new(MemoryBackend::new());
    for i in 0..200 {
        let tag = if i % 2 == 0 { "projects" } else { "services" };
        backend
            .put(&format!("/page/{i}"), Bytes::from_static(b"x"), [tag])
            .unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..16 {
        let backend = Arc::clone(&backend);
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                backend.invalidate_tag("projects").await
            } else {
                backend.invalidate_path(&format!("/page/{i}")).await
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Every even page was tagged "projects"; odd pages 1..=15 were removed by path.
    assert_eq!(backend.len(), 100 - 8);
    assert!(!backend.contains("/page/0"));
    assert!(!backend.contains("/page/1"));
    assert!(backend.contains("/page/17"));
    assert_eq!(backend.invalidation_count(), 16);
}

#[tokio::test]
async fn usable_as_trait_object() {
    let backend: Arc<dyn CacheInvalidator> = Arc::new(MemoryBackend::new());
    backend.invalidate_tag("anything").await.unwrap();
    backend.health_check().await.unwrap();
    assert_eq!(backend.backend_name(), "memory");
}
