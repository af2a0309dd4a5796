//! The in-process Event Map: `active_token -> Event`
//!
//! Mirrors the store's `QREvent` — a single-shot event that also carries a
//! *reason* describing why a waiter was woken. `reason` survives a `clear`
//! and is only overwritten by the next `set`.
//!
//! Built on a `fired` flag plus a `Notify` rather than `Notify` alone:
//! `Notify::notify_waiters` only wakes tasks already parked in `notified()`,
//! it does not leave a permit for a `wait()` call that arrives afterward.
//! `asyncio.Event.set()`, which this models, is a persistent flag until the
//! next `clear()`, so `wait()` must observe `fired` before parking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

/// Why a [`TokenEvent`] woke its waiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// `CancelRequest` was called for this token
    Canceled,
    /// Validation failed for this token's request
    NotValid,
}

/// A one-shot-resettable event, keyed by active token, with a last-reason
/// slot
pub struct TokenEvent {
    notify: Notify,
    fired: AtomicBool,
    reason: Mutex<Option<Reason>>,
}

impl TokenEvent {
    /// Build a fresh event with no reason set
    fn new() -> Self {
        TokenEvent {
            notify: Notify::new(),
            fired: AtomicBool::new(false),
            reason: Mutex::new(None),
        }
    }

    /// Build an event that is already in the *set* state, used to seed
    /// recovered in-flight requests so their worker immediately resumes
    fn new_preset() -> Self {
        let event = Self::new();
        event.fired.store(true, Ordering::SeqCst);
        event
    }

    /// Wake every waiter, recording `reason` (or clearing it if `None`)
    pub fn set(&self, reason: Option<Reason>) {
        *self.reason.lock().unwrap() = reason;
        self.fired.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Reset the pending-wake state; the next `wait()` parks until the next
    /// `set`. Does not touch the stored reason.
    pub fn clear(&self) {
        self.fired.store(false, Ordering::SeqCst);
    }

    /// The reason stored by the most recent `set`, without waiting
    #[must_use]
    pub fn reason(&self) -> Option<Reason> {
        *self.reason.lock().unwrap()
    }

    /// Suspend until the next `set` (or return immediately if already
    /// fired), returning whichever reason was given
    pub async fn wait(&self) -> Option<Reason> {
        loop {
            if self.fired.load(Ordering::SeqCst) {
                return *self.reason.lock().unwrap();
            }
            // register interest before rechecking `fired` so a `set` that
            // lands between the check above and the park below is not lost
            let notified = self.notify.notified();
            if self.fired.load(Ordering::SeqCst) {
                return *self.reason.lock().unwrap();
            }
            notified.await;
        }
    }
}

/// The process-wide map from active token to its [`TokenEvent`]
#[derive(Default)]
pub struct EventMap {
    events: Mutex<HashMap<String, Arc<TokenEvent>>>,
}

impl EventMap {
    /// Build an empty event map
    #[must_use]
    pub fn new() -> Self {
        EventMap {
            events: Mutex::new(HashMap::new()),
        }
    }

    /// Get the event for a token, creating it (in the unset state) if
    /// it doesn't yet exist
    #[must_use]
    pub fn get_or_create(&self, token: &str) -> Arc<TokenEvent> {
        let mut events = self.events.lock().unwrap();
        events
            .entry(token.to_owned())
            .or_insert_with(|| Arc::new(TokenEvent::new()))
            .clone()
    }

    /// Insert a pre-set event for a token, used during recovery so its
    /// worker resumes immediately
    pub fn insert_preset(&self, token: &str) {
        let mut events = self.events.lock().unwrap();
        events.insert(token.to_owned(), Arc::new(TokenEvent::new_preset()));
    }

    /// Wake the event for a token, if it exists, with an optional reason
    pub fn set(&self, token: &str, reason: Option<Reason>) {
        if let Some(event) = self.events.lock().unwrap().get(token) {
            event.set(reason);
        }
    }

    /// The reason last set for a token's event, if the token has one, or
    /// `None` if there's no event at all (the token is unknown to the
    /// engine)
    #[must_use]
    pub fn get_reason(&self, token: &str) -> Option<Reason> {
        self.events.lock().unwrap().get(token)?.reason()
    }

    /// Remove a token's event once its request has terminated
    pub fn remove(&self, token: &str) {
        self.events.lock().unwrap().remove(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_wakes_a_waiting_task() {
        let map = EventMap::new();
        let event = map.get_or_create("t1");
        let waiter = event.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });
        tokio::task::yield_now().await;
        event.set(Some(Reason::Canceled));
        let reason = handle.await.unwrap();
        assert_eq!(reason, Some(Reason::Canceled));
    }

    #[tokio::test]
    async fn preset_event_resolves_immediately() {
        let map = EventMap::new();
        map.insert_preset("t1");
        let event = map.get_or_create("t1");
        let reason = event.wait().await;
        assert_eq!(reason, None);
    }

    #[tokio::test]
    async fn set_before_wait_is_not_lost() {
        // a `set()` that lands before `wait()` is ever called must still be
        // observed — this is the race `Notify` alone does not protect
        // against
        let event = Arc::new(TokenEvent::new());
        event.set(Some(Reason::NotValid));
        let reason = tokio::time::timeout(std::time::Duration::from_millis(100), event.wait())
            .await
            .expect("wait() should not hang when already fired");
        assert_eq!(reason, Some(Reason::NotValid));
    }

    #[tokio::test]
    async fn clear_requires_a_fresh_set_before_the_next_wait_resolves() {
        let event = Arc::new(TokenEvent::new());
        event.set(Some(Reason::Canceled));
        event.clear();
        let waiter = event.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });
        tokio::task::yield_now().await;
        event.set(Some(Reason::NotValid));
        let reason = handle.await.unwrap();
        assert_eq!(reason, Some(Reason::NotValid));
    }
}
