//! Request handling pipeline: validate, resolve, execute, aggregate.

use crate::executor::Executor;
use crate::metrics;
use revalidator_core::{InvalidationRequest, InvalidationResult, SecretValidator, resolve};
use tracing::{Instrument, debug, info, info_span, warn};

/// Entry point for revalidation. Holds no per-request state.
#[derive(Clone)]
pub struct Coordinator {
    validator: SecretValidator,
    executor: Executor,
}

impl Coordinator {
    pub fn new(validator: SecretValidator, executor: Executor) -> Self {
        Self {
            validator,
            executor,
        }
    }

    /// Whether `secret` is accepted. Used by endpoints that act without resolving targets.
    pub fn authorize(&self, secret: &str) -> bool {
        self.validator.validate(secret)
    }

    pub fn backend_name(&self) -> &'static str {
        self.executor.backend_name()
    }

    /// Handle one request. Never fails; problems are reported in the result.
    pub async fn handle(&self, request: InvalidationRequest) -> InvalidationResult {
        let span = info_span!(
            "revalidation",
            scope = request.named_scope().map(|s| s.as_str()),
            path = request.path.as_deref(),
            tag = request.tag.as_deref(),
        );
        let result = self.run(request).instrument(span).await;
        metrics::REVALIDATION_REQUESTS
            .with_label_values(&[result.status.as_str()])
            .inc();
        result
    }

    async fn run(&self, request: InvalidationRequest) -> InvalidationResult {
        debug!("received");

        if !self.validator.validate(request.secret()) {
            warn!("rejected: invalid secret");
            return InvalidationResult::rejected(request);
        }
        debug!("validated");

        let targets = resolve(&request);
        debug!(targets = targets.len(), "resolved");
        if targets.is_empty() {
            info!("nothing to revalidate");
            return InvalidationResult::no_targets(request);
        }

        let outcomes = self.executor.execute(&targets).await;
        let result = InvalidationResult::from_outcomes(request, outcomes);
        debug!(
            succeeded = result.succeeded_count(),
            failed = result.failed_count(),
            "executed"
        );

        if result.overall_success {
            info!(targets = result.outcomes.len(), "Revalidation complete");
        } else {
            warn!(
                failed = result.failed_count(),
                failures = ?result.failure_messages(),
                "Revalidation completed with failures"
            );
        }
        debug!(status = %result.status, "responded");
        result
    }
}
