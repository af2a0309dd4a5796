//! The Allocation Engine: the scheduler. Validates, tokenizes, enqueues,
//! runs one names-worker task per open request, blocks on the event map,
//! consumes head-of-queue changes, finalizes fills, cancels, and moves
//! resources between `active`/`pending`/`disabled`.
//!
//! This is also the Request Façade (component E): `new_request`,
//! `get_new_token`, `is_request_active`, `get_resource_req_resp`,
//! `cancel_request`, `recover`/`stop_backend` are the only entry points the
//! HTTP routes call — there is no global/static engine, every call takes
//! an explicit `&Shared`/`&Arc<Shared>` handle.

pub mod events;
pub mod readiness;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::backends;
use crate::models::{
    self, OpenRequest, OrigGroup, OrigRequest, Resource, ResourceStatus, ResourcesByName,
    ResourcesRequest, ResourcesRequestResponse,
};
use crate::utils::{ApiError, Shared};

use events::{EventMap, Reason};
use readiness::Readiness;

/// The in-process half of the allocation engine: the event map, the
/// readiness subsystem, and the single engine-wide mutex serializing
/// `find_available` (§5). Everything else is naturally serialized by
/// awaiting the store.
pub struct Engine {
    pub(crate) events: EventMap,
    pub(crate) readiness: Arc<Readiness>,
    alloc_lock: tokio::sync::Mutex<()>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Build a fresh, empty engine. Call [`Engine::recover`] once the
    /// owning [`Shared`] is wrapped in an `Arc` to resurrect in-flight
    /// requests from the store.
    #[must_use]
    pub fn new() -> Self {
        Engine {
            events: EventMap::new(),
            readiness: Readiness::new(),
            alloc_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Recover all of this engine's in-memory state from the store after a
    /// restart: seed the event map, pre-set, from every open token, then
    /// relaunch a names-worker for each still-open request, and start the
    /// pub/sub subscriber that keeps the readiness subsystem in sync with
    /// other engine instances sharing this store.
    pub async fn recover(shared: &Arc<Shared>) -> Result<(), ApiError> {
        for token in backends::requests::get_all_open_tokens(shared).await? {
            shared.engine.events.insert_preset(&token);
        }
        for token in backends::requests::get_open_requests(shared)
            .await?
            .into_keys()
        {
            spawn_names_worker(shared.clone(), token);
        }
        let config = shared.config.clone();
        let readiness = shared.engine.readiness.clone();
        tokio::spawn(readiness.run_subscriber(config));
        Ok(())
    }

    /// Stop the readiness pub/sub subscriber. It observes the shutdown flag
    /// and exits within `2 * poll_interval_ms` (§5).
    pub fn stop_backend(shared: &Shared) {
        shared.engine.readiness.stop();
    }

    /// `NewRequest` — the synchronous entry point (§4.3.1)
    pub async fn new_request(
        shared: &Arc<Shared>,
        req: ResourcesRequest,
    ) -> Result<ResourcesRequestResponse, ApiError> {
        let seed = req.token.clone();

        // Step 2: token-valid fast path
        let owned = backends::tokens::get_token_resources(&seed, shared).await?;
        if !seed.is_empty() && is_token_still_valid(&seed, &owned, shared).await? {
            backends::tokens::set_active_token(&seed, &seed, shared).await?;
            let mut names = Vec::with_capacity(owned.len());
            for resource in &owned {
                let active_job = backends::jobs::get_active_job(&resource.name, shared).await?;
                if active_job.is_sentinel() {
                    backends::jobs::add_job(&resource.name, &seed, shared).await?;
                }
                names.push(resource.name.clone());
            }
            backends::bookkeeping::update_token_last_update_time(&seed, shared).await?;
            let is_token_active_in_queue =
                compute_is_token_active_in_queue(&names, &seed, shared).await?;
            return Ok(ResourcesRequestResponse {
                names,
                token: seed,
                request_complete: true,
                is_valid: true,
                message: None,
                version: 0,
                is_token_active_in_queue,
            });
        }

        // Step 3: already-active path — the caller handed back a token the
        // engine already knows as an in-flight active token. Scoped to a
        // seed with an actual open request, not merely one `IsRequestActive`
        // would call live (which is also true of a seed the engine has
        // never seen at all).
        let seed_has_open_request = !seed.is_empty()
            && backends::requests::get_open_request_by_token(&seed, shared)
                .await?
                .is_some();
        if seed_has_open_request {
            backends::tokens::set_active_token(&seed, &seed, shared).await?;
            let mut response = backends::partial::get_req_resp(&seed, shared)
                .await?
                .unwrap_or_else(|| ResourcesRequestResponse::in_flight(seed.clone(), Vec::new()));
            response.message = Some("request in progress".to_owned());
            return Ok(response);
        }

        if req.is_empty() {
            let response = ResourcesRequestResponse::invalid(seed, "empty request");
            return Ok(response);
        }

        // Step 4: derive the dated active token and start bookkeeping
        let active = models::tokens::derive_active_token(&seed, Utc::now());
        backends::tokens::set_active_token(&seed, &active, shared).await?;
        shared.engine.events.get_or_create(&active);
        backends::bookkeeping::update_token_last_update_time(&active, shared).await?;
        if req.auto_managed {
            backends::bookkeeping::add_auto_managed_token(&active, shared).await?;
        }

        // Step 5: tag expansion
        let mut groups: Vec<ResourcesByName> = req.names.clone();
        let mut orig_groups: Vec<OrigGroup> = req
            .names
            .iter()
            .map(|group| OrigGroup {
                names: group.names.clone(),
            })
            .collect();
        for tag_group in &req.tags {
            let union = backends::tags::get_resources_names_by_tags(&tag_group.tags, shared).await?;
            if union.is_empty() {
                let message = format!("no matched resources for tags {:?}", tag_group.tags);
                let response = ResourcesRequestResponse::invalid(active.clone(), message);
                backends::partial::set_req_resp(&active, &response, shared).await?;
                shared.engine.events.set(&active, Some(Reason::NotValid));
                return Ok(response);
            }
            orig_groups.push(OrigGroup {
                names: union.clone(),
            });
            groups.push(ResourcesByName {
                names: union,
                count: tag_group.count,
            });
        }

        if groups.is_empty() {
            let response = ResourcesRequestResponse::invalid(active.clone(), "empty request");
            backends::partial::set_req_resp(&active, &response, shared).await?;
            shared.engine.events.set(&active, Some(Reason::NotValid));
            return Ok(response);
        }

        // Step 6: validation — every group must have enough non-disabled,
        // existing candidates to satisfy its count
        let all_resources = backends::resources::get_all_as_map(shared).await?;
        let mut warnings = Vec::new();
        for group in &groups {
            let mut available = 0usize;
            for name in &group.names {
                match all_resources.get(name) {
                    Some(resource) if resource.status != ResourceStatus::Disabled => available += 1,
                    Some(_) => {}
                    None => warnings.push(format!("resource {name} not found")),
                }
            }
            if available < group.count {
                let mut message =
                    format!("not enough available resources for group {:?}", group.names);
                if !warnings.is_empty() {
                    message.push_str(&format!(" ({})", warnings.join(", ")));
                }
                let response = ResourcesRequestResponse::invalid(active.clone(), message);
                backends::partial::set_req_resp(&active, &response, shared).await?;
                shared.engine.events.set(&active, Some(Reason::NotValid));
                return Ok(response);
            }
        }

        // Step 7: reorder — names the seed's previous request still owns
        // go first, preserving steady state across a token refresh
        let steady: HashSet<String> = owned
            .iter()
            .filter(|resource| resource.token.as_deref() == Some(seed.as_str()))
            .map(|resource| resource.name.clone())
            .collect();
        for group in &mut groups {
            let (mut preferred, mut rest) = (Vec::new(), Vec::new());
            for name in group.names.drain(..) {
                if steady.contains(&name) {
                    preferred.push(name);
                } else {
                    rest.push(name);
                }
            }
            preferred.append(&mut rest);
            group.names = preferred;
        }

        // Step 8: persist and launch the worker
        backends::requests::save_orig_request(
            &active,
            &OrigRequest { groups: orig_groups },
            shared,
        )
        .await?;
        let open_request = OpenRequest {
            groups: groups.clone(),
        };
        backends::requests::add_resources_request(&active, &open_request, shared).await?;
        for group in &groups {
            for name in &group.names {
                if let Some(resource) = all_resources.get(name) {
                    if resource.status != ResourceStatus::Disabled {
                        backends::jobs::add_job(name, &active, shared).await?;
                    }
                }
            }
        }
        spawn_names_worker(shared.clone(), active.clone());

        Ok(ResourcesRequestResponse::in_flight(active, Vec::new()))
    }

    /// `CancelRequest` (§4.3.3)
    pub async fn cancel_request(
        shared: &Shared,
        token: &str,
    ) -> Result<ResourcesRequestResponse, ApiError> {
        let last = backends::partial::get_req_resp(token, shared).await?;
        let was_ever_active_in_queue = last
            .as_ref()
            .map(|response| response.is_token_active_in_queue)
            .unwrap_or(false);

        backends::bookkeeping::delete_token_last_update_time(token, shared).await?;
        backends::bookkeeping::delete_auto_managed_token(token, shared).await?;

        if !was_ever_active_in_queue {
            if let Some(mut response) = last {
                response.is_valid = false;
                backends::partial::set_req_resp(token, &response, shared).await?;
            }
        }

        let affected = backends::jobs::remove_job(token, None, shared).await?;
        for name in affected {
            let active_job = backends::jobs::get_active_job(&name, shared).await?;
            if let Some(next_token) = active_job.token {
                shared.engine.events.set(&next_token, None);
            }
        }

        shared.engine.events.set(token, Some(Reason::Canceled));
        backends::requests::remove_open_request(token, shared).await?;
        backends::partial::remove_partial_fill(token, shared).await?;

        tracing::info!(token, "canceled token");
        Ok(ResourcesRequestResponse {
            names: Vec::new(),
            token: token.to_owned(),
            request_complete: true,
            is_valid: true,
            message: Some(format!("canceled token {token}")),
            version: 0,
            is_token_active_in_queue: false,
        })
    }

    /// `IsRequestActive` (§4.3.5)
    pub async fn is_request_active(shared: &Shared, token: &str) -> Result<bool, ApiError> {
        let filled = backends::tokens::is_request_filled(token, shared).await?;
        let reason = shared.engine.events.get_reason(token);
        if reason != Some(Reason::Canceled) {
            backends::bookkeeping::update_token_last_update_time(token, shared).await?;
        }
        let terminated = matches!(reason, Some(Reason::Canceled) | Some(Reason::NotValid));
        Ok(!(filled || terminated))
    }

    /// `GetResourceReqResp` (§4.3.5)
    pub async fn get_resource_req_resp(
        shared: &Shared,
        token: &str,
    ) -> Result<ResourcesRequestResponse, ApiError> {
        let mut response = match backends::partial::get_req_resp(token, shared).await? {
            Some(response) => response,
            None => {
                let response = ResourcesRequestResponse {
                    names: Vec::new(),
                    token: token.to_owned(),
                    request_complete: true,
                    is_valid: false,
                    message: Some(format!("unknown token in qrm {token}")),
                    version: 0,
                    is_token_active_in_queue: false,
                };
                backends::partial::set_req_resp(token, &response, shared).await?;
                return Ok(response);
            }
        };
        response.is_token_active_in_queue =
            compute_is_token_active_in_queue(&response.names, token, shared).await?;
        backends::partial::set_req_resp(token, &response, shared).await?;
        Ok(response)
    }

    /// `GetNewToken` (§4.3.5): poll the seed→active map every 0.1s
    pub async fn get_new_token(shared: &Shared, seed: &str) -> Result<String, ApiError> {
        loop {
            if let Some(active) = backends::tokens::get_active_token(seed, shared).await? {
                return Ok(active);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Whether every resource currently associated with `seed` still exists and
/// is still owned by `seed` (§4.3.1 step 2)
async fn is_token_still_valid(
    seed: &str,
    owned: &[Resource],
    shared: &Shared,
) -> Result<bool, ApiError> {
    if owned.is_empty() {
        return Ok(false);
    }
    for resource in owned {
        match backends::resources::get_by_name(&resource.name, shared).await? {
            Some(current) if current.token.as_deref() == Some(seed) => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

/// Whether, for every granted name, that resource's active job token still
/// equals `token`
async fn compute_is_token_active_in_queue(
    names: &[String],
    token: &str,
    shared: &Shared,
) -> Result<bool, ApiError> {
    if names.is_empty() {
        return Ok(false);
    }
    for name in names {
        let active_job = backends::jobs::get_active_job(name, shared).await?;
        if active_job.token.as_deref() != Some(token) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Launch the names-worker task for a freshly-tokenized or recovered open
/// request
fn spawn_names_worker(shared: Arc<Shared>, token: String) {
    tokio::spawn(async move {
        if let Err(error) = run_names_worker(&shared, &token).await {
            tracing::error!(token = %token, error = %error, "names worker failed");
        }
    });
}

/// `namesWorker(token)` (§4.3.2): one coroutine per open request. Groups
/// are processed strictly sequentially — correctness of the mutex-guarded
/// `find_available` depends on single-writer ordering of partial fills.
async fn run_names_worker(shared: &Arc<Shared>, token: &str) -> Result<(), ApiError> {
    let Some(mut open_request) = backends::requests::get_open_request_by_token(token, shared).await?
    else {
        return Ok(());
    };
    let mut old_owners: Vec<(String, String)> = Vec::new();

    for i in 0..open_request.groups.len() {
        loop {
            find_available(shared, token, &mut open_request.groups[i], &mut old_owners).await?;
            backends::requests::update_open_request(token, &open_request, shared).await?;

            if open_request.groups[i].count == 0 {
                let remaining: Vec<String> = open_request.groups[i].names.drain(..).collect();
                for name in remaining {
                    release_unused_reservation(shared, token, &name).await?;
                }
                break;
            }

            let event = shared.engine.events.get_or_create(token);
            event.clear();
            match event.wait().await {
                Some(Reason::Canceled) => return Ok(()),
                Some(Reason::NotValid) => return Ok(()),
                None => continue,
            }
        }
    }

    finalize(shared, token, &old_owners).await
}

/// `findAvailable(group, token)` (§4.3.2 step 1), guarded by the
/// engine-wide allocation mutex so a single job is never double-granted
/// across groups or parallel workers
async fn find_available(
    shared: &Shared,
    token: &str,
    group: &mut ResourcesByName,
    old_owners: &mut Vec<(String, String)>,
) -> Result<(), ApiError> {
    let _guard = shared.engine.alloc_lock.lock().await;
    let mut matched = Vec::new();
    for name in &group.names {
        if group.count == 0 {
            break;
        }
        let Some(resource) = backends::resources::get_by_name(name, shared).await? else {
            tracing::warn!(resource = %name, "requested resource no longer exists");
            continue;
        };
        if resource.status == ResourceStatus::Disabled {
            continue;
        }
        let active_job = backends::jobs::get_active_job(name, shared).await?;
        if active_job.token.as_deref() != Some(token) {
            continue;
        }
        if let Some(owner) = resource.token.clone() {
            if owner != token {
                old_owners.push((name.clone(), owner.clone()));
                Engine::cancel_request(shared, &owner).await?;
            }
        }
        backends::resources::set_token(name, Some(token), shared).await?;
        backends::partial::partial_fill_request(token, name, shared).await?;
        matched.push(name.clone());
        group.count -= 1;
    }
    group.names.retain(|name| !matched.contains(name));
    Ok(())
}

/// Once a group is satisfied, drop this token's reservation on any names in
/// the group that went unused, and wake whoever is now at the head of that
/// resource's queue so their worker re-evaluates (§4.3.2 step 3)
async fn release_unused_reservation(
    shared: &Shared,
    token: &str,
    name: &str,
) -> Result<(), ApiError> {
    let affected = backends::jobs::remove_job(token, Some(&[name.to_owned()]), shared).await?;
    if !affected.is_empty() {
        let active_job = backends::jobs::get_active_job(name, shared).await?;
        if let Some(head_token) = active_job.token {
            shared.engine.events.set(&head_token, None);
        }
    }
    Ok(())
}

/// Finalize a fully-filled request (§4.3.2 "After all groups succeed")
async fn finalize(
    shared: &Arc<Shared>,
    token: &str,
    old_owners: &[(String, String)],
) -> Result<(), ApiError> {
    backends::requests::remove_open_request(token, shared).await?;
    let granted_names = backends::partial::get_partial_fill(token, shared).await?;
    let resources = backends::resources::get_by_names(&granted_names, shared).await?;

    // §4.3.4 must run before the readiness gate below: it is what puts the
    // superseded owners' resources into `pending` in the first place, so
    // the wait that follows is what actually blocks on the operator's
    // re-imaging step rather than passing through immediately.
    if shared.config.qrm.use_pending_logic {
        apply_pending_logic(shared, token, old_owners).await?;
    }

    for name in &granted_names {
        shared.engine.readiness.wait_for_active(name, shared).await?;
    }

    let orig = backends::requests::get_orig_request(token, shared)
        .await?
        .unwrap_or_default();
    let reordered = orig.reorder(&granted_names);

    let response = ResourcesRequestResponse {
        names: reordered,
        token: token.to_owned(),
        request_complete: true,
        is_valid: true,
        message: None,
        version: 0,
        is_token_active_in_queue: true,
    };
    backends::partial::set_req_resp(token, &response, shared).await?;

    backends::tokens::generate_token(token, &resources, shared).await?;
    backends::partial::remove_partial_fill(token, shared).await?;
    Ok(())
}

/// §4.3.4 pending-mode post-fill: move every non-disabled resource still
/// owned by a superseded token to `pending` and destroy that token,
/// modeling devices that need to be re-imaged between tenants
async fn apply_pending_logic(
    shared: &Shared,
    token: &str,
    old_owners: &[(String, String)],
) -> Result<(), ApiError> {
    let distinct_old: HashSet<&str> = old_owners
        .iter()
        .map(|(_, old)| old.as_str())
        .filter(|old| *old != token)
        .collect();
    for old in distinct_old {
        let resources = backends::tokens::get_token_resources(old, shared).await?;
        for resource in resources {
            if resource.status != ResourceStatus::Disabled {
                backends::resources::set_status(&resource.name, ResourceStatus::Pending, shared)
                    .await?;
            }
        }
        backends::tokens::destroy_token(old, shared).await?;
    }
    Ok(())
}
