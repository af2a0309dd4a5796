//! The Status/Readiness Subsystem: blocks a finalizing request until every
//! granted resource is `active`, and releases those waiters when any
//! instance sharing the store announces a resource-status change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::Notify;

use crate::backends::{db, resources};
use crate::conf::Conf;
use crate::models::ResourceStatus;
use crate::utils::{ApiError, Shared};

/// Per-resource notifiers, plus the shutdown flag the pub/sub loop polls
pub struct Readiness {
    notifiers: Mutex<HashMap<String, Arc<Notify>>>,
    running: AtomicBool,
}

impl Readiness {
    /// Build a new, running readiness subsystem
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Readiness {
            notifiers: Mutex::new(HashMap::new()),
            running: AtomicBool::new(true),
        })
    }

    /// Get (or create) the notifier for a resource name
    fn notifier(&self, name: &str) -> Arc<Notify> {
        self.notifiers
            .lock()
            .unwrap()
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// Wake any waiter blocked on a resource becoming active
    fn signal(&self, name: &str) {
        if let Some(notify) = self.notifiers.lock().unwrap().get(name) {
            notify.notify_waiters();
        }
    }

    /// Block until a resource's status is `Active`, re-checking the store
    /// on every pub/sub wake since the event only means "something
    /// changed", not specifically "this resource is now active".
    pub async fn wait_for_active(
        self: &Arc<Self>,
        name: &str,
        shared: &Shared,
    ) -> Result<(), ApiError> {
        loop {
            let notify = self.notifier(name);
            // register interest before re-checking status so a signal that
            // lands between the check and the park below is not lost, the
            // same ordering `TokenEvent::wait` uses
            let notified = notify.notified();
            if resources::get_status(name, shared).await? == ResourceStatus::Active {
                return Ok(());
            }
            notified.await;
        }
    }

    /// Stop the pub/sub subscriber loop; it exits within
    /// `2 * poll_interval_ms` of this call, per the concurrency model's
    /// shutdown contract.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Run the pub/sub subscriber loop for the lifetime of the engine,
    /// translating `channel:res_change_event` messages into local wakes.
    pub async fn run_subscriber(self: Arc<Self>, config: Conf) {
        let keys = db::keys_from_namespace(&config.qrm.namespace);
        let client = crate::backends::setup::redis_client(&config);
        let poll_interval = Duration::from_millis(config.qrm.poll_interval_ms);
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return;
            }
            match client.get_async_pubsub().await {
                Ok(mut pubsub) => {
                    if pubsub.subscribe(keys.res_change_channel()).await.is_err() {
                        tokio::time::sleep(poll_interval * 2).await;
                        continue;
                    }
                    let mut stream = pubsub.on_message();
                    loop {
                        tokio::select! {
                            msg = stream.next() => {
                                match msg {
                                    Some(msg) => {
                                        if let Ok(name) = msg.get_payload::<String>() {
                                            self.signal(&name);
                                        }
                                    }
                                    None => break,
                                }
                            }
                            () = tokio::time::sleep(poll_interval * 2) => {
                                if !self.running.load(Ordering::SeqCst) {
                                    return;
                                }
                            }
                        }
                    }
                }
                Err(_) => {
                    tokio::time::sleep(poll_interval * 2).await;
                }
            }
        }
    }
}
