//! Resource Store operations for token liveness bookkeeping: last-seen
//! timestamps and the auto-managed-token set, plus the scalar `qrm_status`
//! server status flag

use std::collections::HashMap;

use redis::AsyncCommands;

use crate::backends::db;
use crate::models::ResourceStatus;
use crate::utils::{ApiError, Shared};

/// Record the current time as a token's last-seen timestamp
pub async fn update_token_last_update_time(token: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let now = chrono::Utc::now().timestamp();
    let _: () = conn.hset(keys.token_last_update_time(), token, now).await?;
    Ok(())
}

/// Get the last-seen timestamp for every token being tracked
pub async fn get_all_tokens_last_update(shared: &Shared) -> Result<HashMap<String, i64>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: HashMap<String, i64> = conn.hgetall(keys.token_last_update_time()).await?;
    Ok(raw)
}

/// Delete a token's last-seen timestamp
pub async fn delete_token_last_update_time(token: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn.hdel(keys.token_last_update_time(), token).await?;
    Ok(())
}

/// Mark a token as auto-managed (its liveness governed by the reaper)
pub async fn add_auto_managed_token(token: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn.sadd(keys.managed_tokens_list(), token).await?;
    Ok(())
}

/// Get every auto-managed token
pub async fn get_all_auto_managed_tokens(shared: &Shared) -> Result<Vec<String>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let tokens: Vec<String> = conn.smembers(keys.managed_tokens_list()).await?;
    Ok(tokens)
}

/// Remove a token from the auto-managed set
pub async fn delete_auto_managed_token(token: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn.srem(keys.managed_tokens_list(), token).await?;
    Ok(())
}

/// Set the server-wide `qrm_status` scalar, toggled by the management
/// API's `/set_server_status`
pub async fn set_server_status(status: ResourceStatus, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn.set(keys.qrm_status(), status.to_string()).await?;
    Ok(())
}

/// Get the server-wide `qrm_status` scalar, defaulting to `active` if it
/// has never been set
pub async fn get_server_status(shared: &Shared) -> Result<ResourceStatus, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: Option<String> = conn.get(keys.qrm_status()).await?;
    Ok(match raw.as_deref() {
        Some("active") | None => ResourceStatus::Active,
        Some("pending") => ResourceStatus::Pending,
        Some("disabled") => ResourceStatus::Disabled,
        Some(other) => {
            tracing::warn!(status = other, "unrecognized qrm_status, defaulting to active");
            ResourceStatus::Active
        }
    })
}
