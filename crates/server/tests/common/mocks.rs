//! Cache backends with scripted behaviour.

use async_trait::async_trait;
use revalidator_cache::{CacheError, CacheInvalidator, CacheResult};
use revalidator_core::InvalidationTarget;
use std::collections::HashSet;
use std::sync::Mutex;

/// Records every call and fails or panics on the configured targets.
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedBackend {
    calls: Mutex<Vec<InvalidationTarget>>,
    fail_on: HashSet<InvalidationTarget>,
    panic_on: HashSet<InvalidationTarget>,
}

#[allow(dead_code)]
impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, target: InvalidationTarget) -> Self {
        self.fail_on.insert(target);
        self
    }

    pub fn panicking_on(mut self, target: InvalidationTarget) -> Self {
        self.panic_on.insert(target);
        self
    }

    /// Targets received so far, in call order.
    pub fn calls(&self) -> Vec<InvalidationTarget> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, target: InvalidationTarget) -> CacheResult<()> {
        self.calls.lock().unwrap().push(target.clone());
        if self.panic_on.contains(&target) {
            panic!("scripted panic for {target}");
        }
        if self.fail_on.contains(&target) {
            return Err(CacheError::Unavailable(format!("scripted failure for {target}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheInvalidator for ScriptedBackend {
    async fn invalidate_path(&self, path: &str) -> CacheResult<()> {
        self.record(InvalidationTarget::path(path))
    }

    async fn invalidate_tag(&self, tag: &str) -> CacheResult<()> {
        self.record(InvalidationTarget::tag(tag))
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

/// Backend whose health check always fails.
#[allow(dead_code)]
pub struct UnhealthyBackend;

#[async_trait]
impl CacheInvalidator for UnhealthyBackend {
    async fn invalidate_path(&self, _path: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate_tag(&self, _tag: &str) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "unhealthy"
    }

    async fn health_check(&self) -> CacheResult<()> {
        Err(CacheError::Unavailable("purge endpoint unreachable".to_string()))
    }
}

/// Backend whose health check panics, for exercising the panic handler.
#[allow(dead_code)]
pub struct PanickingHealthBackend;

#[async_trait]
impl CacheInvalidator for PanickingHealthBackend {
    async fn invalidate_path(&self, _path: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate_tag(&self, _tag: &str) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "panicking"
    }

    async fn health_check(&self) -> CacheResult<()> {
        panic!("health probe exploded");
    }
}
