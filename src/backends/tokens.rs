//! Resource Store operations on the token→resources map and the
//! seed→active-token map

use std::collections::HashMap;

use redis::AsyncCommands;

use crate::backends::db;
use crate::models::Resource;
use crate::utils::{ApiError, Shared};
use crate::{deserialize, serialize};

/// Record that `token` now owns `resources`. Fails (returns `false`) if
/// `token` is already present, matching the `DuplicateToken` error kind.
pub async fn generate_token(
    token: &str,
    resources: &[Resource],
    shared: &Shared,
) -> Result<bool, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let set: bool = conn
        .hset_nx(keys.token_dict(), token, serialize!(&resources.to_vec()))
        .await?;
    if !set {
        tracing::warn!(token, "token already present in token_dict");
    }
    Ok(set)
}

/// Remove a token's entry from the token→resources map
pub async fn destroy_token(token: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn.hdel(keys.token_dict(), token).await?;
    Ok(())
}

/// Get the resources currently recorded as owned by `token`
pub async fn get_token_resources(token: &str, shared: &Shared) -> Result<Vec<Resource>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: Option<String> = conn.hget(keys.token_dict(), token).await?;
    Ok(match raw {
        Some(json) => deserialize!(&json),
        None => Vec::new(),
    })
}

/// Get the active token currently recorded for a seed, if any
pub async fn get_active_token(seed: &str, shared: &Shared) -> Result<Option<String>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let active: Option<String> = conn.hget(keys.active_token_dict(), seed).await?;
    Ok(active)
}

/// Record the active token currently associated with a seed
pub async fn set_active_token(seed: &str, active: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn.hset(keys.active_token_dict(), seed, active).await?;
    Ok(())
}

/// Get every filled token and the resources it was granted, for the
/// management `/status` snapshot's `tokens_resources_group`
pub async fn get_all(shared: &Shared) -> Result<HashMap<String, Vec<Resource>>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: HashMap<String, String> = conn.hgetall(keys.token_dict()).await?;
    let mut map = HashMap::with_capacity(raw.len());
    for (token, json) in raw {
        map.insert(token, deserialize!(&json));
    }
    Ok(map)
}

/// Whether a request has reached its terminal filled state: its resources
/// are recorded in the token→resources map and it no longer has an open
/// request entry.
pub async fn is_request_filled(token: &str, shared: &Shared) -> Result<bool, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let has_resources: bool = conn.hexists(keys.token_dict(), token).await?;
    let has_open: bool = conn.hexists(keys.open_requests(), token).await?;
    Ok(has_resources && !has_open)
}
