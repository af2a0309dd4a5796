//! The management API's `/status` snapshot types

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Job, ResourceStatus};

/// A single resource's entry in the `/status` snapshot
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct ResourceStatusEntry {
    /// The resource's current lifecycle status
    pub status: ResourceStatus,
    /// The resource's type
    #[serde(rename = "type")]
    pub resource_type: String,
    /// The job immediately before the tail sentinel, or the sentinel if idle
    pub active_job: Job,
    /// Every job currently queued for this resource, head to tail
    pub jobs: Vec<Job>,
    /// The tags attached to this resource
    pub tags: Vec<String>,
}

/// The full snapshot returned by the management API's `GET /status`
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct StatusSnapshot {
    /// The server-wide status flag
    pub server_status: ResourceStatus,
    /// Every known resource, keyed by name
    pub resources: HashMap<String, ResourceStatusEntry>,
    /// `token -> type -> [resource names]` for every filled token
    pub tokens_resources_group: HashMap<String, HashMap<String, Vec<String>>>,
    /// The last-seen unix timestamp for every tracked token
    pub token_last_update_time: HashMap<String, i64>,
    /// Every token currently governed by the auto-managed-token reaper
    pub auto_managed_tokens: Vec<String>,
}
