//! Resource Store operations on open requests and their preserved originals

use std::collections::HashMap;

use redis::AsyncCommands;

use crate::backends::db;
use crate::models::{OpenRequest, OrigRequest};
use crate::utils::{ApiError, Shared};
use crate::{deserialize, serialize};

/// Persist the initial open request for a freshly-tokenized request
pub async fn add_resources_request(
    token: &str,
    request: &OpenRequest,
    shared: &Shared,
) -> Result<(), ApiError> {
    update_open_request(token, request, shared).await
}

/// Persist the original, tag-typed request so the final response can be
/// ordered by tag-group order
pub async fn save_orig_request(
    token: &str,
    orig: &OrigRequest,
    shared: &Shared,
) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn
        .hset(keys.orig_requests(), token, serialize!(orig))
        .await?;
    Ok(())
}

/// Get every currently-open request, keyed by token
pub async fn get_open_requests(shared: &Shared) -> Result<HashMap<String, OpenRequest>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: HashMap<String, String> = conn.hgetall(keys.open_requests()).await?;
    let mut map = HashMap::with_capacity(raw.len());
    for (token, json) in raw {
        map.insert(token, deserialize!(&json));
    }
    Ok(map)
}

/// Get the open request for a single token, if any
pub async fn get_open_request_by_token(
    token: &str,
    shared: &Shared,
) -> Result<Option<OpenRequest>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: Option<String> = conn.hget(keys.open_requests(), token).await?;
    Ok(match raw {
        Some(json) => Some(deserialize!(&json)),
        None => None,
    })
}

/// Get the preserved original request for a token
pub async fn get_orig_request(token: &str, shared: &Shared) -> Result<Option<OrigRequest>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: Option<String> = conn.hget(keys.orig_requests(), token).await?;
    Ok(match raw {
        Some(json) => Some(deserialize!(&json)),
        None => None,
    })
}

/// Overwrite the open request for a token with its mutated state
pub async fn update_open_request(
    token: &str,
    request: &OpenRequest,
    shared: &Shared,
) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn
        .hset(keys.open_requests(), token, serialize!(request))
        .await?;
    Ok(())
}

/// Remove a token's open request record, marking it no longer in-flight
pub async fn remove_open_request(token: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn.hdel(keys.open_requests(), token).await?;
    Ok(())
}

/// Get every token with an open request, union'd with every token known
/// to the token→resources map and the partial-fill map — every token the
/// engine must resurrect state for on recovery.
pub async fn get_all_open_tokens(shared: &Shared) -> Result<Vec<String>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let open: Vec<String> = conn.hkeys(keys.open_requests()).await?;
    let filled: Vec<String> = conn.hkeys(keys.token_dict()).await?;
    let partial: Vec<String> = conn.hkeys(keys.fill_requests()).await?;
    let mut all: std::collections::HashSet<String> = open.into_iter().collect();
    all.extend(filled);
    all.extend(partial);
    Ok(all.into_iter().collect())
}
