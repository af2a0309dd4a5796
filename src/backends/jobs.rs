//! Resource Store operations on per-resource FIFO job queues
//!
//! A queue is a redis list of JSON-encoded [`Job`]s that always ends with
//! the tail sentinel `{}`. New jobs are pushed onto the head (`LPUSH`), so
//! the *active job* — the current owner's claim — sits immediately before
//! the sentinel, at index `len - 2`.

use redis::AsyncCommands;

use crate::backends::db;
use crate::models::Job;
use crate::utils::{ApiError, Shared};
use crate::{deserialize, serialize};

/// Seed a freshly-added resource's queue with the tail sentinel
pub async fn init_queue(name: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn
        .rpush(keys.resource_jobs(name), serialize!(&Job::sentinel()))
        .await?;
    Ok(())
}

/// Append a new job for `token` to the head of a resource's queue
pub async fn add_job(name: &str, token: &str, shared: &Shared) -> Result<(), ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let _: () = conn
        .lpush(keys.resource_jobs(name), serialize!(&Job::new(token)))
        .await?;
    Ok(())
}

/// Get every job currently queued for a resource, head to tail
pub async fn get_jobs(name: &str, shared: &Shared) -> Result<Vec<Job>, ApiError> {
    let keys = db::keys(shared);
    let conn = crate::conn!(shared);
    let raw: Vec<String> = conn.lrange(keys.resource_jobs(name), 0, -1).await?;
    raw.iter().map(|json| Ok(deserialize!(json))).collect()
}

/// Get the active job of a resource: the one immediately before the
/// sentinel, or the sentinel itself if the queue is idle
pub async fn get_active_job(name: &str, shared: &Shared) -> Result<Job, ApiError> {
    let jobs = get_jobs(name, shared).await?;
    if jobs.len() >= 2 {
        Ok(jobs[jobs.len() - 2].clone())
    } else {
        Ok(Job::sentinel())
    }
}

/// Find the first job queued for `token` on a given resource
pub async fn get_job_for_resource_by_token(
    name: &str,
    token: &str,
    shared: &Shared,
) -> Result<Option<Job>, ApiError> {
    let jobs = get_jobs(name, shared).await?;
    Ok(jobs.into_iter().find(|job| job.token.as_deref() == Some(token)))
}

/// Remove every job queued for `token`, across the given resources (or, if
/// `None`, across every known resource). Returns the resources that were
/// actually affected.
pub async fn remove_job(
    token: &str,
    resources: Option<&[String]>,
    shared: &Shared,
) -> Result<Vec<String>, ApiError> {
    let names = match resources {
        Some(names) => names.to_vec(),
        None => crate::backends::resources::get_all(shared)
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect(),
    };
    let keys = db::keys(shared);
    let mut affected = Vec::new();
    for name in names {
        let Some(job) = get_job_for_resource_by_token(&name, token, shared).await? else {
            continue;
        };
        let conn = crate::conn!(shared);
        let removed: i64 = conn
            .lrem(keys.resource_jobs(&name), 1, serialize!(&job))
            .await?;
        if removed > 0 {
            affected.push(name);
        }
    }
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_active_job_on_idle_queue() {
        let jobs = vec![Job::sentinel()];
        let active = if jobs.len() >= 2 {
            jobs[jobs.len() - 2].clone()
        } else {
            Job::sentinel()
        };
        assert!(active.is_sentinel());
    }

    #[test]
    fn active_job_is_second_to_last() {
        let jobs = vec![Job::new("newest"), Job::new("owner"), Job::sentinel()];
        let active = jobs[jobs.len() - 2].clone();
        assert_eq!(active.token.as_deref(), Some("owner"));
    }
}
