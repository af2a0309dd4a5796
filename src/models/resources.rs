//! The [`Resource`] type — a uniquely named arbitrable unit

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The lifecycle state of a [`Resource`]
///
/// Any pair of states may transition to any other; only `Active` admits a
/// resource to `find_available` and satisfies the readiness waiter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    /// The resource may be granted to a waiting request
    Active,
    /// The resource requires an operator action (e.g. re-imaging) before
    /// it may be granted again
    Pending,
    /// The resource is not eligible to be granted
    Disabled,
}

impl Default for ResourceStatus {
    fn default() -> Self {
        ResourceStatus::Active
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ResourceStatus::Active => "active",
            ResourceStatus::Pending => "pending",
            ResourceStatus::Disabled => "disabled",
        };
        write!(f, "{name}")
    }
}

/// A uniquely-named arbitrable unit with a type, a status, a current owner
/// token, and a set of tags.
///
/// Equality is by `name` alone, matching the identity rule in the resource
/// store's invariants.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct Resource {
    /// The unique name of this resource; its primary key
    pub name: String,
    /// The type of this resource (e.g. `server`, `vlan`, `fixture`)
    #[serde(rename = "type")]
    pub resource_type: String,
    /// The current lifecycle status of this resource
    #[serde(default)]
    pub status: ResourceStatus,
    /// The token that currently owns this resource, if any
    #[serde(default)]
    pub token: Option<String>,
    /// The tags attached to this resource
    #[serde(default)]
    pub tags: HashSet<String>,
}

impl Resource {
    /// Build a new resource in the `Active` status with no owner and no tags
    #[must_use]
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Resource {
            name: name.into(),
            resource_type: resource_type.into(),
            status: ResourceStatus::Active,
            token: None,
            tags: HashSet::new(),
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Resource {}

impl std::hash::Hash for Resource {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_name_alone() {
        let mut a = Resource::new("r1", "server");
        let mut b = Resource::new("r1", "server");
        a.status = ResourceStatus::Disabled;
        b.tags.insert("x".to_owned());
        assert_eq!(a, b);
    }

    #[test]
    fn different_names_are_unequal() {
        let a = Resource::new("r1", "server");
        let b = Resource::new("r2", "server");
        assert_ne!(a, b);
    }
}
