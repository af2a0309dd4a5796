//! Background task that cancels auto-managed tokens which have gone stale
//!
//! Spawned from [`crate::axum`] when `qrm.auto_managed_token_reaper.enabled`
//! is set; not part of the engine's public contract.

use std::sync::Arc;
use std::time::Duration;

use tracing::{event, instrument, Level};

use crate::backends;
use crate::engine::Engine;
use crate::utils::Shared;

/// Poll the auto-managed token set and cancel any token whose last-seen
/// timestamp is older than `stale_secs`
///
/// # Arguments
///
/// * `shared` - Shared QRM objects
#[instrument(name = "reaper::run", skip_all)]
pub async fn run(shared: Arc<Shared>) {
    let interval = Duration::from_secs(shared.config.qrm.auto_managed_token_reaper.interval_secs);
    let stale_secs = shared.config.qrm.auto_managed_token_reaper.stale_secs as i64;
    loop {
        tokio::time::sleep(interval).await;
        if let Err(error) = reap_once(&shared, stale_secs).await {
            event!(Level::ERROR, error = error.to_string(), "reaper pass failed");
        }
    }
}

/// Run a single reaping pass
async fn reap_once(shared: &Shared, stale_secs: i64) -> Result<(), crate::utils::ApiError> {
    let auto_managed = backends::bookkeeping::get_all_auto_managed_tokens(shared).await?;
    if auto_managed.is_empty() {
        return Ok(());
    }
    let last_update = backends::bookkeeping::get_all_tokens_last_update(shared).await?;
    let now = chrono::Utc::now().timestamp();
    for token in auto_managed {
        let age = last_update.get(&token).map_or(i64::MAX, |last| now - last);
        if age >= stale_secs {
            event!(Level::INFO, token = %token, age, "reaping stale auto-managed token");
            Engine::cancel_request(shared, &token).await?;
        }
    }
    Ok(())
}
