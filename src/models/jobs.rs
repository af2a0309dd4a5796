//! The [`Job`] type — an entry in a resource's FIFO queue

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// An entry in a resource's job queue.
///
/// A resource's queue always ends with a sentinel empty entry `{}`; the
/// *active job* is the one immediately before it. [`Job::sentinel`]
/// serializes to `{}` since every field is `None` and skipped.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Job {
    /// The token this job was queued for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// A unique id for this job, used to look a specific job up by id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl Job {
    /// Build a new job for a token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Job {
            token: Some(token.into()),
            id: Some(Uuid::new_v4()),
        }
    }

    /// Build the tail sentinel job, which serializes to `{}`
    #[must_use]
    pub fn sentinel() -> Self {
        Job {
            token: None,
            id: None,
        }
    }

    /// Whether this job is the tail sentinel
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.token.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_serializes_to_empty_object() {
        let sentinel = Job::sentinel();
        let json = serde_json::to_string(&sentinel).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn sentinel_round_trips_from_empty_object() {
        let job: Job = serde_json::from_str("{}").unwrap();
        assert!(job.is_sentinel());
    }

    #[test]
    fn job_for_token_is_not_sentinel() {
        let job = Job::new("abc");
        assert!(!job.is_sentinel());
        assert_eq!(job.token.as_deref(), Some("abc"));
    }
}
