//! Route configuration.

use crate::error::ApiError;
use crate::handlers;
use crate::metrics::{HANDLER_PANICS, metrics_handler};
use crate::ratelimit::ip_rate_limit_middleware;
use crate::state::AppState;
use crate::trace::trace_id_middleware;
use axum::Router;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/revalidate",
            post(handlers::post_revalidate).get(handlers::get_revalidate),
        )
        .route("/api/revalidate/content", post(handlers::post_content))
        .route("/api/revalidate/{scope}", post(handlers::post_scope))
        .route(
            "/api/revalidate-images",
            get(handlers::get_revalidate_images),
        )
        // Legacy endpoints kept for existing admin buttons and webhooks
        .route("/api/revalidate-deletions", post(handlers::post_deletions))
        .route("/api/nuclear-revalidate", post(handlers::post_nuclear))
        .route("/api/deploy", post(handlers::trigger_deploy))
        .route("/api/deploy-hook", post(handlers::trigger_deploy))
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            ip_rate_limit_middleware,
        ));

    // Health stays outside the rate limiter for load balancer probes.
    let mut router = Router::new()
        .merge(api_routes)
        .route("/api/health", get(handlers::health_check));

    // SECURITY: When enabled, /metrics MUST be network-restricted to scrapers.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    // Layers run outermost-last: TraceLayer -> panic catcher -> trace id -> handler
    router
        .layer(middleware::from_fn(trace_id_middleware))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    HANDLER_PANICS.inc();
    tracing::error!(panic = %detail, "Request handler panicked");

    ApiError::Internal("unexpected error while handling the request".to_string()).into_response()
}
