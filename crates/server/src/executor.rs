//! Best-effort execution of resolved invalidation targets.

use crate::metrics;
use futures::FutureExt;
use revalidator_cache::CacheInvalidator;
use revalidator_core::{InvalidationOutcome, InvalidationTarget};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Calls the cache backend once per target and records what happened.
#[derive(Clone)]
pub struct Executor {
    backend: Arc<dyn CacheInvalidator>,
}

impl Executor {
    pub fn new(backend: Arc<dyn CacheInvalidator>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Invalidate every target, paths before tags.
    ///
    /// A failing or panicking backend call becomes a failed outcome; the
    /// remaining targets are still attempted.
    pub async fn execute(&self, targets: &[InvalidationTarget]) -> Vec<InvalidationOutcome> {
        let start = Instant::now();
        let ordered = targets
            .iter()
            .filter(|t| t.is_path())
            .chain(targets.iter().filter(|t| t.is_tag()));

        let mut outcomes = Vec::with_capacity(targets.len());
        for target in ordered {
            let outcome = self.execute_one(target).await;
            metrics::record_target(target.kind.as_str(), outcome.succeeded);
            outcomes.push(outcome);
        }

        metrics::EXECUTION_DURATION
            .with_label_values(&[self.backend_name()])
            .observe(start.elapsed().as_secs_f64());
        outcomes
    }

    async fn execute_one(&self, target: &InvalidationTarget) -> InvalidationOutcome {
        match AssertUnwindSafe(self.backend.invalidate(target))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {
                debug!(target = %target, "Target invalidated");
                InvalidationOutcome::success(target.clone())
            }
            Ok(Err(e)) => {
                warn!(target = %target, error = %e, "Target invalidation failed");
                InvalidationOutcome::failure(target.clone(), e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(target = %target, panic = %message, "Cache backend panicked");
                InvalidationOutcome::failure(target.clone(), format!("backend panicked: {message}"))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
