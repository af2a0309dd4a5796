//! The resource-status-change pub/sub channel
//!
//! `SetStatus(resource, active)` publishes the resource's name on
//! `channel:res_change_event` so every engine instance sharing this store —
//! not just the one that made the change — releases any local readiness
//! waiters for that resource.

use redis::AsyncCommands;

use crate::backends::db;
use crate::utils::{ApiError, Shared};

/// Publish a resource-status-change event for `name`
pub async fn publish_resource_change(name: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: i64 = conn.publish(keys.res_change_channel(), name).await?;
    Ok(())
}
