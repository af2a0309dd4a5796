//! The Management HTTP API: resource catalogue and server-status control

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tracing::instrument;
use utoipa::OpenApi;

use std::collections::HashMap;

use crate::backends;
use crate::models::{
    Resource, ResourceStatusEntry, SetResourceStatusRequest, SetServerStatusRequest,
    StatusSnapshot, TagRequest,
};
use crate::utils::{ApiError, AppState};

/// Add a batch of new resources to the catalogue
///
/// Fails with a `409` listing every already-present name rather than
/// partially applying the batch.
///
/// # Arguments
///
/// * `state` - Shared QRM objects
/// * `resources` - The resources to add
#[utoipa::path(
    post,
    path = "/add_resources",
    params(
        ("resources" = Vec<Resource>, description = "The resources to add"),
    ),
    responses(
        (status = 200, description = "The resources that were added", body = Vec<String>),
        (status = 409, description = "One or more resources already exist"),
    )
)]
#[instrument(name = "routes::management::add_resources", skip_all, err(Debug))]
async fn add_resources(
    State(state): State<AppState>,
    Json(resources): Json<Vec<Resource>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut duplicates = Vec::new();
    for resource in &resources {
        if backends::resources::is_exists(&resource.name, &state.shared).await? {
            duplicates.push(resource.name.clone());
        }
    }
    if !duplicates.is_empty() {
        return Err(backends::resources::duplicate_resource_error(&duplicates.join(", ")));
    }
    let mut added = Vec::with_capacity(resources.len());
    for resource in &resources {
        if backends::resources::add(resource, &state.shared).await? {
            added.push(resource.name.clone());
        }
    }
    Ok(Json(added))
}

/// Remove a batch of resources from the catalogue by name
///
/// # Arguments
///
/// * `state` - Shared QRM objects
/// * `names` - The resource names to remove
#[utoipa::path(
    post,
    path = "/remove_resources",
    params(
        ("names" = Vec<String>, description = "The resource names to remove"),
    ),
    responses(
        (status = 200, description = "The resource names that were actually removed", body = Vec<String>),
    )
)]
#[instrument(name = "routes::management::remove_resources", skip_all, err(Debug))]
async fn remove_resources(
    State(state): State<AppState>,
    Json(names): Json<Vec<String>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut removed = Vec::with_capacity(names.len());
    for name in &names {
        if backends::resources::remove(name, &state.shared).await? {
            removed.push(name.clone());
        }
    }
    Ok(Json(removed))
}

/// Flip the server-wide status flag
///
/// # Arguments
///
/// * `state` - Shared QRM objects
/// * `request` - The new server status
#[utoipa::path(
    post,
    path = "/set_server_status",
    params(
        ("request" = SetServerStatusRequest, description = "The new server status"),
    ),
    responses(
        (status = 204, description = "The server status was updated"),
    )
)]
#[instrument(name = "routes::management::set_server_status", skip_all, err(Debug))]
async fn set_server_status(
    State(state): State<AppState>,
    Json(request): Json<SetServerStatusRequest>,
) -> Result<StatusCode, ApiError> {
    backends::bookkeeping::set_server_status(request.status, &state.shared).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set a single resource's lifecycle status
///
/// # Arguments
///
/// * `state` - Shared QRM objects
/// * `request` - The resource and its new status
#[utoipa::path(
    post,
    path = "/set_resource_status",
    params(
        ("request" = SetResourceStatusRequest, description = "The resource and its new status"),
    ),
    responses(
        (status = 204, description = "The resource status was updated"),
        (status = 404, description = "No resource with that name exists"),
    )
)]
#[instrument(name = "routes::management::set_resource_status", skip_all, err(Debug))]
async fn set_resource_status(
    State(state): State<AppState>,
    Json(request): Json<SetResourceStatusRequest>,
) -> Result<StatusCode, ApiError> {
    backends::resources::set_status(&request.resource_name, request.status, &state.shared).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a tag to a resource
///
/// # Arguments
///
/// * `state` - Shared QRM objects
/// * `request` - The resource and tag
#[utoipa::path(
    post,
    path = "/add_tag_to_resource",
    params(
        ("request" = TagRequest, description = "The resource and tag"),
    ),
    responses(
        (status = 204, description = "The tag was added"),
        (status = 404, description = "No resource with that name exists"),
    )
)]
#[instrument(name = "routes::management::add_tag_to_resource", skip_all, err(Debug))]
async fn add_tag_to_resource(
    State(state): State<AppState>,
    Json(request): Json<TagRequest>,
) -> Result<StatusCode, ApiError> {
    backends::tags::add_tag_to_resource(&request.resource_name, &request.tag, &state.shared)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a tag from a resource
///
/// # Arguments
///
/// * `state` - Shared QRM objects
/// * `request` - The resource and tag
#[utoipa::path(
    post,
    path = "/remove_tag_from_resource",
    params(
        ("request" = TagRequest, description = "The resource and tag"),
    ),
    responses(
        (status = 204, description = "The tag was removed"),
        (status = 404, description = "No resource with that name exists"),
    )
)]
#[instrument(name = "routes::management::remove_tag_from_resource", skip_all, err(Debug))]
async fn remove_tag_from_resource(
    State(state): State<AppState>,
    Json(request): Json<TagRequest>,
) -> Result<StatusCode, ApiError> {
    backends::tags::remove_tag_from_resource(&request.resource_name, &request.tag, &state.shared)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get a full snapshot of every resource, token, and the server status
///
/// # Arguments
///
/// * `state` - Shared QRM objects
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "The full resource/token snapshot", body = StatusSnapshot),
    )
)]
#[instrument(name = "routes::management::status", skip_all, err(Debug))]
async fn status(State(state): State<AppState>) -> Result<Json<StatusSnapshot>, ApiError> {
    let snapshot = build_status_snapshot(&state).await?;
    Ok(Json(snapshot))
}

/// Assemble the `/status` snapshot from the resource catalogue, the
/// per-resource job queues, and the token bookkeeping maps
async fn build_status_snapshot(state: &AppState) -> Result<StatusSnapshot, ApiError> {
    let server_status = backends::bookkeeping::get_server_status(&state.shared).await?;
    let all = backends::resources::get_all_as_map(&state.shared).await?;
    let mut resources = HashMap::with_capacity(all.len());
    for (name, resource) in all {
        let jobs = backends::jobs::get_jobs(&name, &state.shared).await?;
        let active_job = backends::jobs::get_active_job(&name, &state.shared).await?;
        resources.insert(
            name,
            ResourceStatusEntry {
                status: resource.status,
                resource_type: resource.resource_type,
                active_job,
                jobs,
                tags: resource.tags.into_iter().collect(),
            },
        );
    }

    let mut tokens_resources_group: HashMap<String, HashMap<String, Vec<String>>> = HashMap::new();
    for (token, owned) in backends::tokens::get_all(&state.shared).await? {
        let mut by_type: HashMap<String, Vec<String>> = HashMap::new();
        for resource in owned {
            by_type.entry(resource.resource_type).or_default().push(resource.name);
        }
        tokens_resources_group.insert(token, by_type);
    }

    let token_last_update_time = backends::bookkeeping::get_all_tokens_last_update(&state.shared).await?;
    let auto_managed_tokens = backends::bookkeeping::get_all_auto_managed_tokens(&state.shared).await?;

    Ok(StatusSnapshot {
        server_status,
        resources,
        tokens_resources_group,
        token_last_update_time,
        auto_managed_tokens,
    })
}

/// The struct containing our openapi docs
#[derive(OpenApi)]
#[openapi(
    paths(
        add_resources,
        remove_resources,
        set_server_status,
        set_resource_status,
        add_tag_to_resource,
        remove_tag_from_resource,
        status,
    ),
    components(schemas(
        Resource,
        SetServerStatusRequest,
        SetResourceStatusRequest,
        TagRequest,
        StatusSnapshot,
    )),
)]
pub struct ManagementApiDocs;

/// Add the management routes to our router
///
/// # Arguments
///
/// * `router` - The router to add routes too
pub fn mount(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/add_resources", post(add_resources))
        .route("/remove_resources", post(remove_resources))
        .route("/set_server_status", post(set_server_status))
        .route("/set_resource_status", post(set_resource_status))
        .route("/add_tag_to_resource", post(add_tag_to_resource))
        .route("/remove_tag_from_resource", post(remove_tag_from_resource))
        .route("/status", get(status))
}
