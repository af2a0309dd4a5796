//! Request/response shapes exchanged with clients, and the token-keyed
//! records the engine persists while a request is open.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A request for a specific, named set of resources
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ResourcesByName {
    /// The candidate resource names, in preference order
    pub names: Vec<String>,
    /// How many of `names` must be granted to satisfy this group
    pub count: usize,
}

/// A request for resources matching any of a set of tags
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ResourcesByTags {
    /// The tags to match resources against (union, not intersection)
    pub tags: Vec<String>,
    /// How many matching resources must be granted to satisfy this group
    pub count: usize,
}

/// A user's request for resources
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct ResourcesRequest {
    /// Groups of resources requested by explicit name
    #[serde(default)]
    pub names: Vec<ResourcesByName>,
    /// Groups of resources requested by tag
    #[serde(default)]
    pub tags: Vec<ResourcesByTags>,
    /// The seed token identifying this request across polls/resubmits
    #[serde(default)]
    pub token: String,
    /// Whether this token's liveness should be tracked by the
    /// auto-managed-token reaper
    #[serde(default)]
    pub auto_managed: bool,
}

impl ResourcesRequest {
    /// Whether this request names at least one of names/tags/token
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.tags.is_empty() && self.token.is_empty()
    }
}

/// The response returned to a client for a given token
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ResourcesRequestResponse {
    /// The granted resource names, in orig-request tag/name order
    #[serde(default)]
    pub names: Vec<String>,
    /// The token this response is for
    pub token: String,
    /// Whether the request has reached a terminal state (filled, cancelled,
    /// or invalid)
    pub request_complete: bool,
    /// Whether the request was well formed and resolvable
    pub is_valid: bool,
    /// A human readable message, populated on validation failure, on
    /// cancellation, and for a handful of informational responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// A monotonic version counter, bumped every time this response is
    /// persisted for a token
    #[serde(default)]
    pub version: i32,
    /// Whether, for every granted name, that resource's active job token
    /// still equals this response's token
    #[serde(default)]
    pub is_token_active_in_queue: bool,
}

impl ResourcesRequestResponse {
    /// Build the in-flight response returned immediately by `NewRequest`
    #[must_use]
    pub fn in_flight(token: impl Into<String>, names: Vec<String>) -> Self {
        ResourcesRequestResponse {
            names,
            token: token.into(),
            request_complete: false,
            is_valid: true,
            message: None,
            version: 0,
            is_token_active_in_queue: false,
        }
    }

    /// Build a validation-failure response
    #[must_use]
    pub fn invalid(token: impl Into<String>, message: impl Into<String>) -> Self {
        ResourcesRequestResponse {
            names: Vec::new(),
            token: token.into(),
            request_complete: true,
            is_valid: false,
            message: Some(message.into()),
            version: 0,
            is_token_active_in_queue: false,
        }
    }
}

/// Body of `POST /cancel_token`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CancelTokenRequest {
    /// The token to cancel
    pub token: String,
}

/// Query params of `GET /get_token_status`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct TokenQuery {
    /// The token to look up
    pub token: String,
}

/// Response body of `GET /is_server_up`
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ServerUpStatus {
    /// Always `true` when the server could answer the request at all
    pub status: bool,
}

/// One group of an [`OrigRequest`] — the resource names that originally
/// could have satisfied this group, whether specified literally or
/// resolved from a tag union at request time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct OrigGroup {
    /// The resource names this group could have matched, in the order the
    /// client (or tag resolution) produced them
    pub names: Vec<String>,
}

/// The original, tag-typed request, preserved so the final response can be
/// ordered by tag/name-group order rather than fill order
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct OrigRequest {
    /// The groups of this request, in client-submission order
    pub groups: Vec<OrigGroup>,
}

impl OrigRequest {
    /// Reorder `granted`, an unordered set of granted resource names, into
    /// group order: for each group in turn, emit its intersection with
    /// `granted` (first-seen order wins when a name appears in more than
    /// one group).
    #[must_use]
    pub fn reorder(&self, granted: &[String]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut ordered = Vec::with_capacity(granted.len());
        for group in &self.groups {
            for name in &group.names {
                if granted.contains(name) && seen.insert(name.clone()) {
                    ordered.push(name.clone());
                }
            }
        }
        ordered
    }
}

/// The mutable residual request a names-worker consumes as it fills groups.
/// Starts as a direct translation of the client's [`ResourcesRequest`] with
/// all `ResourcesByTags` groups already expanded into `ResourcesByName`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct OpenRequest {
    /// The remaining, not-yet-filled groups
    pub groups: Vec<ResourcesByName>,
}

impl OpenRequest {
    /// Whether every group in this request has been fully satisfied
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.groups.iter().all(|g| g.count == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_follows_tag_group_order() {
        let orig = OrigRequest {
            groups: vec![
                OrigGroup {
                    names: vec!["r2".to_owned()],
                },
                OrigGroup {
                    names: vec!["r1".to_owned(), "r3".to_owned()],
                },
            ],
        };
        let granted = vec!["r1".to_owned(), "r2".to_owned(), "r3".to_owned()];
        assert_eq!(orig.reorder(&granted), vec!["r2", "r1", "r3"]);
    }

    #[test]
    fn reorder_drops_names_not_granted() {
        let orig = OrigRequest {
            groups: vec![OrigGroup {
                names: vec!["r1".to_owned(), "r2".to_owned()],
            }],
        };
        let granted = vec!["r1".to_owned()];
        assert_eq!(orig.reorder(&granted), vec!["r1"]);
    }

    #[test]
    fn open_request_is_filled_when_all_counts_reach_zero() {
        let mut req = OpenRequest {
            groups: vec![ResourcesByName {
                names: vec!["r1".to_owned()],
                count: 0,
            }],
        };
        assert!(req.is_filled());
        req.groups.push(ResourcesByName {
            names: vec!["r2".to_owned()],
            count: 1,
        });
        assert!(!req.is_filled());
    }
}
