//! Resource Store operations on partial fills and the last-response cache

use redis::AsyncCommands;

use crate::backends::db;
use crate::models::ResourcesRequestResponse;
use crate::utils::{ApiError, Shared};
use crate::{deserialize, serialize};

/// Append a resource name to a token's partial fill, if not already
/// present, and persist the updated running response.
pub async fn partial_fill_request(
    token: &str,
    resource_name: &str,
    shared: &Shared,
) -> Result<(), ApiError> {
    let mut names = get_partial_fill(token, shared).await?;
    if !names.iter().any(|n| n == resource_name) {
        names.push(resource_name.to_owned());
    }
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn
        .hset(keys.fill_requests(), token, serialize!(&names))
        .await?;
    let response = ResourcesRequestResponse::in_flight(token, names);
    set_req_resp(token, &response, shared).await?;
    Ok(())
}

/// Get the resource names granted to a token so far
pub async fn get_partial_fill(token: &str, shared: &Shared) -> Result<Vec<String>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: Option<String> = conn.hget(keys.fill_requests(), token).await?;
    Ok(match raw {
        Some(json) => deserialize!(&json),
        None => Vec::new(),
    })
}

/// Clear a token's partial fill once the request is finalized or cancelled
pub async fn remove_partial_fill(token: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn.hdel(keys.fill_requests(), token).await?;
    Ok(())
}

/// Get the last persisted response for a token
pub async fn get_req_resp(
    token: &str,
    shared: &Shared,
) -> Result<Option<ResourcesRequestResponse>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: Option<String> = conn.hget(keys.last_req_resp(), token).await?;
    Ok(match raw {
        Some(json) => Some(deserialize!(&json)),
        None => None,
    })
}

/// Persist a response for a token, bumping its version counter
pub async fn set_req_resp(
    token: &str,
    response: &ResourcesRequestResponse,
    shared: &Shared,
) -> Result<(), ApiError> {
    let mut response = response.clone();
    if let Some(previous) = get_req_resp(token, shared).await? {
        response.version = previous.version + 1;
    }
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn
        .hset(keys.last_req_resp(), token, serialize!(&response))
        .await?;
    Ok(())
}
