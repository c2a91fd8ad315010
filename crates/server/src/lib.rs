//! HTTP service that coordinates content revalidation.
//!
//! This crate provides:
//! - Revalidation endpoints (paths, tags, named scopes, content changes)
//! - The coordinator and best-effort executor behind them
//! - Page warming and deploy hook forwarding
//! - Trace IDs, per-IP rate limiting and Prometheus metrics

pub mod coordinator;
pub mod deploy;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod metrics;
pub mod ratelimit;
pub mod routes;
pub mod state;
pub mod trace;
pub mod warm;

pub use coordinator::Coordinator;
pub use error::{ApiError, ApiResult};
pub use executor::Executor;
pub use ratelimit::RateLimitState;
pub use routes::create_router;
pub use state::AppState;
