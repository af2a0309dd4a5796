//! Request bodies accepted by the management API

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::ResourceStatus;

/// Body of `POST /set_server_status`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct SetServerStatusRequest {
    /// The new server-wide status
    pub status: ResourceStatus,
}

/// Body of `POST /set_resource_status`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct SetResourceStatusRequest {
    /// The resource to update
    pub resource_name: String,
    /// The resource's new status
    pub status: ResourceStatus,
}

/// Body of `POST /add_tag_to_resource` and `POST /remove_tag_from_resource`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct TagRequest {
    /// The resource to tag
    pub resource_name: String,
    /// The tag to add or remove
    pub tag: String,
}
