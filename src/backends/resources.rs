//! Resource Store operations on the resource catalogue: `all_resources`

use std::collections::HashMap;

use redis::AsyncCommands;

use crate::backends::{db, jobs};
use crate::models::{Resource, ResourceStatus};
use crate::utils::{ApiError, Shared};
use crate::{conflict, deserialize, not_found, serialize};

/// Add a new resource, seeding its job queue with the tail sentinel.
///
/// Returns `false` (and logs) if a resource with this name already exists,
/// matching the store's `DuplicateResource` handling.
pub async fn add(resource: &Resource, shared: &Shared) -> Result<bool, ApiError> {
    let keys = db::keys(shared);
    if is_exists(&resource.name, shared).await? {
        tracing::warn!(resource = %resource.name, "resource already exists, ignoring");
        return Ok(false);
    }
    let conn = crate::conn!(shared);
    let _: () = conn
        .hset(keys.all_resources(), &resource.name, serialize!(resource))
        .await?;
    jobs::init_queue(&resource.name, shared).await?;
    tracing::info!(resource = %resource.name, "added resource");
    Ok(true)
}

/// Remove a resource and its job queue entirely
pub async fn remove(name: &str, shared: &Shared) -> Result<bool, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let removed: i64 = conn.hdel(keys.all_resources(), name).await?;
    let _: () = conn.del(keys.resource_jobs(name)).await?;
    if removed == 0 {
        tracing::error!(resource = %name, "resource doesn't exist in db");
        return Ok(false);
    }
    tracing::info!(resource = %name, "removed resource");
    Ok(true)
}

/// Get every known resource
pub async fn get_all(shared: &Shared) -> Result<Vec<Resource>, ApiError> {
    Ok(get_all_as_map(shared).await?.into_values().collect())
}

/// Get every known resource, keyed by name
pub async fn get_all_as_map(shared: &Shared) -> Result<HashMap<String, Resource>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: HashMap<String, String> = conn.hgetall(keys.all_resources()).await?;
    let mut map = HashMap::with_capacity(raw.len());
    for (name, json) in raw {
        let resource: Resource = deserialize!(&json);
        map.insert(name, resource);
    }
    Ok(map)
}

/// Get a resource by name, if it exists
pub async fn get_by_name(name: &str, shared: &Shared) -> Result<Option<Resource>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: Option<String> = conn.hget(keys.all_resources(), name).await?;
    Ok(match raw {
        Some(json) => Some(deserialize!(&json)),
        None => None,
    })
}

/// Get several resources by name, skipping any that don't exist
pub async fn get_by_names(names: &[String], shared: &Shared) -> Result<Vec<Resource>, ApiError> {
    let mut found = Vec::with_capacity(names.len());
    for name in names {
        if let Some(resource) = get_by_name(name, shared).await? {
            found.push(resource);
        }
    }
    Ok(found)
}

/// Whether a resource with this name exists
pub async fn is_exists(name: &str, shared: &Shared) -> Result<bool, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let exists: bool = conn.hexists(keys.all_resources(), name).await?;
    Ok(exists)
}

/// Set a resource's status, publishing a readiness event if it became
/// `active`
pub async fn set_status(
    name: &str,
    status: ResourceStatus,
    shared: &Shared,
) -> Result<(), ApiError> {
    let mut resource = match get_by_name(name, shared).await? {
        Some(resource) => resource,
        None => return not_found!(format!("resource {name} doesn't exist")),
    };
    resource.status = status;
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn
        .hset(keys.all_resources(), name, serialize!(&resource))
        .await?;
    if status == ResourceStatus::Active {
        crate::backends::pubsub::publish_resource_change(name, shared).await?;
    }
    Ok(())
}

/// Get a resource's status
pub async fn get_status(name: &str, shared: &Shared) -> Result<ResourceStatus, ApiError> {
    match get_by_name(name, shared).await? {
        Some(resource) => Ok(resource.status),
        None => not_found!(format!("resource {name} doesn't exist")),
    }
}

/// Get a resource's type
pub async fn get_type(name: &str, shared: &Shared) -> Result<String, ApiError> {
    match get_by_name(name, shared).await? {
        Some(resource) => Ok(resource.resource_type),
        None => not_found!(format!("resource {name} doesn't exist")),
    }
}

/// Set the token currently recorded as owning a resource (empty string
/// clears ownership)
pub async fn set_token(name: &str, token: Option<&str>, shared: &Shared) -> Result<(), ApiError> {
    let mut resource = match get_by_name(name, shared).await? {
        Some(resource) => resource,
        None => return Ok(()),
    };
    resource.token = token.map(ToOwned::to_owned);
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn
        .hset(keys.all_resources(), name, serialize!(&resource))
        .await?;
    Ok(())
}

/// Add a tag to a resource
pub async fn add_tag(name: &str, tag: &str, shared: &Shared) -> Result<(), ApiError> {
    let mut resource = match get_by_name(name, shared).await? {
        Some(resource) => resource,
        None => return not_found!(format!("resource {name} doesn't exist")),
    };
    resource.tags.insert(tag.to_owned());
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn
        .hset(keys.all_resources(), name, serialize!(&resource))
        .await?;
    let set_key = keys.tag_res_name_map(tag);
    let _: () = conn.sadd(set_key, name).await?;
    Ok(())
}

/// Remove a tag from a resource
pub async fn remove_tag(name: &str, tag: &str, shared: &Shared) -> Result<(), ApiError> {
    let mut resource = match get_by_name(name, shared).await? {
        Some(resource) => resource,
        None => return not_found!(format!("resource {name} doesn't exist")),
    };
    resource.tags.remove(tag);
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn
        .hset(keys.all_resources(), name, serialize!(&resource))
        .await?;
    let set_key = keys.tag_res_name_map(tag);
    let _: () = conn.srem(set_key, name).await?;
    Ok(())
}

/// Build the error returned when a management call tries to re-add an
/// already-present resource
pub fn duplicate_resource_error(name: &str) -> ApiError {
    conflict!(format!("resource {name} already exists")).unwrap_err()
}
