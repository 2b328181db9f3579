//! Router and REST handlers.

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, put};
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{ApiError, AppState, sockets};
use crate::runtime::{ContainerFilter, ContainerSummary, validate_id};

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/container", get(list_containers))
        .route("/container/{id}", get(get_container))
        .route("/container/{id}/start", put(start_container))
        .route("/container/{id}/stop", put(stop_container))
        .route("/container/{id}/restart", put(restart_container))
        .route("/container/{id}/remove", put(remove_container))
        .route("/ws/container/events", get(sockets::events))
        .route("/ws/container/{id}/logs", get(sockets::logs))
        .route("/ws/container/{id}/terminal", get(sockets::terminal))
        .route("/ws/container/{id}/stats", get(sockets::stats))
        .layer(cors_layer(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .origins
        .origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin, error = %e, "Skipping unusable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /container`: every container, running or not.
pub async fn list_containers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContainerSummary>>, ApiError> {
    let containers = state.runtime.list_containers(&ContainerFilter::all()).await?;
    Ok(Json(containers))
}

/// `GET /container/{id}`: first container matching `id`, or `404 {}`.
pub async fn get_container(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ContainerSummary>, ApiError> {
    let id = validate_id(&id)?;
    state
        .runtime
        .list_containers(&ContainerFilter::by_id(id))
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// `PUT /container/{id}/start`
pub async fn start_container(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(&id)?;
    state.runtime.start_container(id).await?;
    info!(container_id = id, "Container started");
    Ok(StatusCode::OK)
}

/// `PUT /container/{id}/stop`
pub async fn stop_container(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(&id)?;
    state.runtime.stop_container(id).await?;
    info!(container_id = id, "Container stopped");
    Ok(StatusCode::OK)
}

/// `PUT /container/{id}/restart`
pub async fn restart_container(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(&id)?;
    state.runtime.restart_container(id).await?;
    info!(container_id = id, "Container restarted");
    Ok(StatusCode::OK)
}

/// `PUT /container/{id}/remove`: forced removal.
pub async fn remove_container(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(&id)?;
    state.runtime.remove_container(id, true).await?;
    info!(container_id = id, "Container removed");
    Ok(StatusCode::OK)
}
