//! # API Endpoint Handlers
//!
//! Core calls are synchronous and may touch disk, so each handler runs its
//! service call on tokio's blocking pool.

use super::{
    AppState, Service,
    error::{ApiError, ApiResult},
    types::{AdvanceStepRequest, ApiResponse, HealthResponse, ListQuery, StepUpdateRequest},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::IntoResponse,
};
use relboard_core::{Dashboard, Hashrelease, RelboardError, Release};
use std::sync::Arc;

/// Run `f` against the service on the blocking pool.
async fn with_service<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Service) -> Result<T, RelboardError> + Send + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {}", e)))?
        .map_err(ApiError::from)
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// HASHRELEASE HANDLERS
// =============================================================================

pub async fn list_hashreleases_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Hashrelease>> {
    let project = query.project()?;
    let items = with_service(&state, move |s| s.list_hashreleases(project)).await?;
    Ok(Json(ApiResponse::ok(items)))
}

pub async fn get_hashrelease_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Hashrelease> {
    let hashrelease = with_service(&state, move |s| s.get_hashrelease(&id)).await?;
    Ok(Json(ApiResponse::ok(hashrelease)))
}

// =============================================================================
// RELEASE HANDLERS
// =============================================================================

pub async fn list_releases_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Release>> {
    let project = query.project()?;
    let items = with_service(&state, move |s| s.list_releases(project)).await?;
    Ok(Json(ApiResponse::ok(items)))
}

pub async fn get_release_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Release> {
    let release = with_service(&state, move |s| s.get_release(&id)).await?;
    Ok(Json(ApiResponse::ok(release)))
}

/// Set a step to an explicit status.
pub async fn update_step_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StepUpdateRequest>, JsonRejection>,
) -> ApiResult<Release> {
    let Json(request) = body?;
    let (step_name, status) = request.validate()?;
    let release = with_service(&state, move |s| s.update_step(&id, &step_name, status)).await?;
    Ok(Json(ApiResponse::ok(release)))
}

/// Move a step to the next status in the cycle.
pub async fn advance_step_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<AdvanceStepRequest>, JsonRejection>,
) -> ApiResult<Release> {
    let Json(request) = body?;
    let step_name = request.validate()?;
    let release = with_service(&state, move |s| s.advance_step(&id, &step_name)).await?;
    Ok(Json(ApiResponse::ok(release)))
}

// =============================================================================
// DASHBOARD HANDLER
// =============================================================================

/// Five most recent releases and hashreleases per project.
pub async fn dashboard_handler(State(state): State<AppState>) -> ApiResult<Dashboard> {
    let dashboard = with_service(&state, |s| s.dashboard()).await?;
    Ok(Json(ApiResponse::ok(dashboard)))
}
