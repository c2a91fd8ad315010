//! Application state shared across handlers.

use crate::coordinator::Coordinator;
use crate::deploy::DeployHook;
use crate::error::{ApiError, ApiResult};
use crate::executor::Executor;
use crate::ratelimit::RateLimitState;
use crate::warm::PageWarmer;
use revalidator_cache::CacheInvalidator;
use revalidator_core::SecretValidator;
use revalidator_core::config::AppConfig;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Revalidation pipeline.
    pub coordinator: Arc<Coordinator>,
    /// Cache backend, also reachable through the coordinator.
    pub backend: Arc<dyn CacheInvalidator>,
    /// Page warmer, when enabled.
    pub warmer: Option<PageWarmer>,
    /// Deploy hook client.
    pub deploy: DeployHook,
    /// Rate limiting state.
    pub rate_limit: RateLimitState,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Validates the configuration and logs its warnings. Fails on invalid
    /// configuration or when an outbound HTTP client cannot be built.
    pub fn new(config: AppConfig, backend: Arc<dyn CacheInvalidator>) -> ApiResult<Self> {
        for warning in config.validate()? {
            tracing::warn!("Configuration warning: {}", warning);
        }

        let validator = SecretValidator::from_config(&config.revalidation);
        let coordinator = Coordinator::new(validator, Executor::new(backend.clone()));

        let warmer = PageWarmer::from_config(&config.site)
            .map_err(|e| ApiError::Internal(format!("failed to build page warmer: {e}")))?;
        let deploy = DeployHook::from_config(&config.site)
            .map_err(|e| ApiError::Internal(format!("failed to build deploy hook client: {e}")))?;
        let rate_limit = RateLimitState::new(&config.rate_limit);

        Ok(Self {
            config: Arc::new(config),
            coordinator: Arc::new(coordinator),
            backend,
            warmer,
            deploy,
            rate_limit,
        })
    }

    /// Cleanup interval for the rate limiter, or None when it is disabled.
    pub fn rate_limit_cleanup_interval(&self) -> Option<Duration> {
        if !self.rate_limit.is_enabled() {
            return None;
        }
        // Zero is rejected by validation; guard anyway since interval(0) panics.
        Some(Duration::from_secs(
            self.config.rate_limit.cleanup_interval_secs.max(1),
        ))
    }
}
