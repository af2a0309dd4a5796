//! The User HTTP API: submit, poll, and cancel resource requests

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::instrument;
use utoipa::OpenApi;

use crate::engine::Engine;
use crate::models::{
    CancelTokenRequest, ResourcesRequest, ResourcesRequestResponse, ServerUpStatus, TokenQuery,
};
use crate::utils::{ApiError, AppState};

/// Submit a new resource request, or poll/refresh an existing one if
/// `token` in the body is already a live seed or active token
///
/// # Arguments
///
/// * `state` - Shared QRM objects
/// * `request` - The resources being requested
#[utoipa::path(
    post,
    path = "/new_request",
    params(
        ("request" = ResourcesRequest, description = "The resources being requested"),
    ),
    responses(
        (status = 200, description = "The in-flight or resolved response for this request", body = ResourcesRequestResponse),
    )
)]
#[instrument(name = "routes::user::new_request", skip_all, err(Debug))]
async fn new_request(
    State(state): State<AppState>,
    Json(request): Json<ResourcesRequest>,
) -> Result<Json<ResourcesRequestResponse>, ApiError> {
    let response = Engine::new_request(&state.shared, request).await?;
    Ok(Json(response))
}

/// Get the current status of a token's request
///
/// # Arguments
///
/// * `state` - Shared QRM objects
/// * `query` - The token to look up
#[utoipa::path(
    get,
    path = "/get_token_status",
    params(
        ("token" = String, Query, description = "The token to look up"),
    ),
    responses(
        (status = 200, description = "The current response for this token", body = ResourcesRequestResponse),
    )
)]
#[instrument(name = "routes::user::get_token_status", skip_all, err(Debug))]
async fn get_token_status(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<ResourcesRequestResponse>, ApiError> {
    let mut response = Engine::get_resource_req_resp(&state.shared, &query.token).await?;
    let active = Engine::is_request_active(&state.shared, &query.token).await?;
    response.request_complete = !active;
    Ok(Json(response))
}

/// Cancel a token's request, releasing any resources it already holds
///
/// # Arguments
///
/// * `state` - Shared QRM objects
/// * `request` - The token to cancel
#[utoipa::path(
    post,
    path = "/cancel_token",
    params(
        ("request" = CancelTokenRequest, description = "The token to cancel"),
    ),
    responses(
        (status = 200, description = "The token was canceled", body = ResourcesRequestResponse),
    )
)]
#[instrument(name = "routes::user::cancel_token", skip_all, err(Debug))]
async fn cancel_token(
    State(state): State<AppState>,
    Json(request): Json<CancelTokenRequest>,
) -> Result<Json<ResourcesRequestResponse>, ApiError> {
    let response = Engine::cancel_request(&state.shared, &request.token).await?;
    Ok(Json(response))
}

/// Cheap liveness check for clients polling before they submit a request
#[utoipa::path(
    get,
    path = "/is_server_up",
    responses(
        (status = 200, description = "QRM answered the request", body = ServerUpStatus),
    )
)]
#[instrument(name = "routes::user::is_server_up", skip_all)]
async fn is_server_up() -> Json<ServerUpStatus> {
    Json(ServerUpStatus { status: true })
}

/// Seconds this instance has been running
///
/// # Arguments
///
/// * `state` - Shared QRM objects
#[utoipa::path(
    get,
    path = "/uptime",
    responses(
        (status = 200, description = "Seconds since this instance started", body = String),
    )
)]
#[instrument(name = "routes::user::uptime", skip_all)]
async fn uptime(State(state): State<AppState>) -> String {
    state.shared.started.elapsed().as_secs().to_string()
}

/// The root route, a human readable banner
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "A banner identifying this service", body = String),
    )
)]
#[instrument(name = "routes::user::root", skip_all)]
async fn root() -> &'static str {
    "QRM - Queue-based Resource Manager\n"
}

/// The struct containing our openapi docs
#[derive(OpenApi)]
#[openapi(
    paths(new_request, get_token_status, cancel_token, is_server_up, uptime, root),
    components(schemas(
        ResourcesRequest,
        ResourcesRequestResponse,
        CancelTokenRequest,
        ServerUpStatus,
    )),
)]
pub struct UserApiDocs;

/// Add the user routes to our router
///
/// # Arguments
///
/// * `router` - The router to add routes too
pub fn mount(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/new_request", post(new_request))
        .route("/get_token_status", get(get_token_status))
        .route("/cancel_token", post(cancel_token))
        .route("/is_server_up", get(is_server_up))
        .route("/uptime", get(uptime))
        .route("/", get(root))
}
