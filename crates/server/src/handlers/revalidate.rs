//! Revalidation handlers.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use revalidator_core::{
    ContentChange, ContentEntity, InvalidationOutcome, InvalidationRequest, InvalidationResult,
    NamedScope, ResultStatus, Scope,
};
use serde::{Deserialize, Serialize};

/// Message returned when a request resolves to nothing.
pub const NO_TARGETS_MESSAGE: &str = "No path or tag provided";

/// General revalidation parameters, as a JSON body or a query string.
#[derive(Debug, Default, Deserialize)]
pub struct RevalidateParams {
    #[serde(default)]
    pub secret: String,
    pub path: Option<String>,
    pub tag: Option<String>,
    pub scope: Option<String>,
}

/// Body for endpoints that only need the secret.
#[derive(Debug, Default, Deserialize)]
pub struct SecretBody {
    #[serde(default)]
    pub secret: String,
}

/// Content change body.
#[derive(Debug, Deserialize)]
pub struct ContentBody {
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub entity: String,
    pub slug: Option<String>,
}

/// Image revalidation query.
#[derive(Debug, Deserialize)]
pub struct ImagesQuery {
    #[serde(default)]
    pub secret: String,
    pub path: Option<String>,
}

/// Revalidation response.
#[derive(Debug, Serialize)]
pub struct RevalidateResponse {
    pub success: bool,
    /// True when at least one target was invalidated.
    pub revalidated: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<InvalidationOutcome>,
    /// Completion time in Unix milliseconds.
    pub now: i64,
}

impl RevalidateResponse {
    fn from_result(result: InvalidationResult) -> Self {
        let revalidated = result.succeeded_count() > 0;
        let now = (result.completed_at.unix_timestamp_nanos() / 1_000_000) as i64;

        let (message, error) = match result.status {
            ResultStatus::NoTargets => (NO_TARGETS_MESSAGE.to_string(), None),
            ResultStatus::PartialFailure => (
                format!(
                    "Revalidation completed with {} failure(s)",
                    result.failed_count()
                ),
                Some(result.failure_messages().join("; ")),
            ),
            _ => (success_message(&result.requested), None),
        };

        Self {
            success: result.overall_success,
            revalidated,
            message,
            error,
            status: result.status,
            outcomes: result.outcomes,
            now,
        }
    }
}

fn success_message(request: &InvalidationRequest) -> String {
    match &request.scope {
        Some(Scope::Named(NamedScope::Deletions)) => "Deletions revalidation complete".to_string(),
        Some(Scope::Named(NamedScope::Nuclear)) => "Nuclear revalidation complete".to_string(),
        Some(Scope::Named(NamedScope::Rebuild)) => "Rebuild revalidation complete".to_string(),
        Some(Scope::Content(change)) => format!("Revalidated {} content", change.entity),
        None => "Revalidation complete".to_string(),
    }
}

/// Run a request through the coordinator and schedule follow-up work.
async fn revalidate(state: &AppState, request: InvalidationRequest) -> ApiResult<Json<RevalidateResponse>> {
    let nuclear = request.named_scope() == Some(NamedScope::Nuclear);
    let result = state.coordinator.handle(request).await;

    if result.status == ResultStatus::Unauthorized {
        return Err(ApiError::Unauthorized("Invalid secret".to_string()));
    }

    if let Some(warmer) = &state.warmer {
        let paths: Vec<String> = result.invalidated_paths().map(str::to_string).collect();
        if !paths.is_empty() {
            warmer.spawn(paths);
        }
    }

    if nuclear && result.overall_success && state.config.site.deploy_on_nuclear {
        if state.deploy.is_configured() {
            tracing::info!("Triggering deploy hook after nuclear revalidation");
            state.deploy.spawn_trigger();
        } else {
            tracing::debug!("deploy_on_nuclear set but no deploy hook configured");
        }
    }

    Ok(Json(RevalidateResponse::from_result(result)))
}

/// Reject a bad secret before anything else in the request is interpreted.
fn require_secret(state: &AppState, secret: &str) -> ApiResult<()> {
    if state.coordinator.authorize(secret) {
        return Ok(());
    }
    tracing::warn!("rejected: invalid secret");
    metrics::REVALIDATION_REQUESTS
        .with_label_values(&[ResultStatus::Unauthorized.as_str()])
        .inc();
    Err(ApiError::Unauthorized("Invalid secret".to_string()))
}

fn build_request(params: RevalidateParams) -> ApiResult<InvalidationRequest> {
    let mut request = InvalidationRequest::new(params.secret);
    if let Some(path) = params.path {
        request = request.with_path(path);
    }
    if let Some(tag) = params.tag {
        request = request.with_tag(tag);
    }
    if let Some(scope) = params.scope.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        // A bad scope in a body is a malformed request, not a missing route.
        let scope = NamedScope::parse(scope).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        request = request.with_scope(Scope::Named(scope));
    }
    Ok(request)
}

/// POST /api/revalidate - Revalidate a path, a tag, both, or a named scope.
pub async fn post_revalidate(
    State(state): State<AppState>,
    payload: Result<Json<RevalidateParams>, JsonRejection>,
) -> ApiResult<Json<RevalidateResponse>> {
    let Json(params) = payload?;
    require_secret(&state, &params.secret)?;
    revalidate(&state, build_request(params)?).await
}

/// GET /api/revalidate - Query-string form used by the admin pages.
pub async fn get_revalidate(
    State(state): State<AppState>,
    query: Result<Query<RevalidateParams>, QueryRejection>,
) -> ApiResult<Json<RevalidateResponse>> {
    let Query(params) = query?;
    require_secret(&state, &params.secret)?;
    revalidate(&state, build_request(params)?).await
}

/// POST /api/revalidate/{scope} - Revalidate a named scope.
pub async fn post_scope(
    State(state): State<AppState>,
    Path(scope): Path<String>,
    payload: Result<Json<SecretBody>, JsonRejection>,
) -> ApiResult<Json<RevalidateResponse>> {
    let Json(body) = payload?;
    require_secret(&state, &body.secret)?;
    let scope = NamedScope::parse(&scope)?;
    revalidate(&state, InvalidationRequest::for_scope(body.secret, scope)).await
}

/// POST /api/revalidate-deletions - Legacy alias for the deletions scope.
pub async fn post_deletions(
    State(state): State<AppState>,
    payload: Result<Json<SecretBody>, JsonRejection>,
) -> ApiResult<Json<RevalidateResponse>> {
    let Json(body) = payload?;
    revalidate(
        &state,
        InvalidationRequest::for_scope(body.secret, NamedScope::Deletions),
    )
    .await
}

/// POST /api/nuclear-revalidate - Legacy alias for the nuclear scope.
pub async fn post_nuclear(
    State(state): State<AppState>,
    payload: Result<Json<SecretBody>, JsonRejection>,
) -> ApiResult<Json<RevalidateResponse>> {
    let Json(body) = payload?;
    revalidate(
        &state,
        InvalidationRequest::for_scope(body.secret, NamedScope::Nuclear),
    )
    .await
}

/// POST /api/revalidate/content - Revalidate everything that renders one content entity.
pub async fn post_content(
    State(state): State<AppState>,
    payload: Result<Json<ContentBody>, JsonRejection>,
) -> ApiResult<Json<RevalidateResponse>> {
    let Json(body) = payload?;
    require_secret(&state, &body.secret)?;
    let entity = ContentEntity::parse(&body.entity)?;
    let change = ContentChange::new(entity, body.slug);
    revalidate(&state, InvalidationRequest::for_content(body.secret, change)).await
}

/// GET /api/revalidate-images - Revalidate the page that shows a replaced image.
pub async fn get_revalidate_images(
    State(state): State<AppState>,
    query: Result<Query<ImagesQuery>, QueryRejection>,
) -> ApiResult<Json<RevalidateResponse>> {
    let Query(query) = query?;
    let mut request = InvalidationRequest::new(query.secret);
    if let Some(path) = query.path {
        request = request.with_path(path);
    }
    revalidate(&state, request).await
}
