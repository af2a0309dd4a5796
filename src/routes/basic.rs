//! Ambient routes: version info and a liveness probe

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{event, instrument, Level};
use utoipa::OpenApi;

use crate::backends;
use crate::models::Version;
use crate::utils::{ApiError, AppState};

/// Return the current QRM version
#[utoipa::path(
    get,
    path = "/api/version",
    responses(
        (status = 200, description = "The running QRM version", body = Version),
    )
)]
#[instrument(name = "routes::basic::version", skip_all, err(Debug))]
pub async fn version() -> Result<Json<Version>, ApiError> {
    Ok(Json(Version::default()))
}

/// Liveness probe: healthy iff redis answers a `PING`
///
/// # Arguments
///
/// * `state` - Shared QRM objects
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 204, description = "QRM is healthy"),
        (status = 503, description = "QRM is unhealthy"),
    )
)]
#[instrument(name = "routes::basic::health", skip_all)]
pub async fn health(State(state): State<AppState>) -> StatusCode {
    match backends::bookkeeping::get_server_status(&state.shared).await {
        Ok(_) => {
            event!(Level::INFO, healthy = true);
            StatusCode::NO_CONTENT
        }
        Err(error) => {
            event!(Level::ERROR, error = error.to_string());
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// The struct containing our openapi docs
#[derive(OpenApi)]
#[openapi(paths(version, health), components(schemas(Version, ApiError)))]
pub struct BasicApiDocs;

/// Add the ambient routes to our router
///
/// # Arguments
///
/// * `router` - The router to add routes too
pub fn mount(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/version", get(version))
        .route("/api/health", get(health))
}
