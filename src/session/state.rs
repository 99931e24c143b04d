//! In-memory session manager.
//!
//! Owns the reactive [`Session`] value. All mutation goes through four
//! actions; identity-changing actions synchronize the durable store, and
//! every action notifies registered observers with a snapshot of the new
//! state.

use super::{Session, SessionStore};
use crate::api::models::User;
use crate::api::ApiClient;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Handle returned by [`SessionManager::subscribe`].
pub type SubscriptionId = usize;

type Callback = Box<dyn Fn(&Session) + Send + Sync>;

/// Owns the in-memory session and the observer registry.
pub struct SessionManager {
    session: Mutex<Session>,
    store: Arc<SessionStore>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_subscription: AtomicUsize,
}

impl SessionManager {
    /// Create a manager starting from an empty session.
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            session: Mutex::new(Session::empty()),
            store,
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicUsize::new(0),
        }
    }

    /// Snapshot of the current session.
    pub fn snapshot(&self) -> Session {
        self.session.lock().clone()
    }

    /// Atomically install a full identity: user and both tokens together,
    /// `is_authenticated` set, any previous error cleared. Persists, then
    /// notifies observers.
    pub fn set_auth(&self, user: User, access_token: String, refresh_token: String) {
        let snapshot = {
            let mut session = self.session.lock();
            session.user = Some(user);
            session.access_token = Some(access_token);
            session.refresh_token = Some(refresh_token);
            session.is_authenticated = true;
            session.error = None;
            session.clone()
        };
        self.store.save(&snapshot);
        self.notify(&snapshot);
    }

    /// Atomically drop the identity: user and both tokens together,
    /// `is_authenticated` unset, error cleared. Persists the cleared record,
    /// then notifies observers.
    pub fn clear_auth(&self) {
        let snapshot = {
            let mut session = self.session.lock();
            session.user = None;
            session.access_token = None;
            session.refresh_token = None;
            session.is_authenticated = false;
            session.error = None;
            session.clone()
        };
        self.store.save(&snapshot);
        self.notify(&snapshot);
    }

    /// Set or clear the last-failure message.
    pub fn set_error(&self, error: Option<String>) {
        let snapshot = {
            let mut session = self.session.lock();
            session.error = error;
            session.clone()
        };
        self.notify(&snapshot);
    }

    /// Set or clear the in-flight flag.
    pub fn set_loading(&self, loading: bool) {
        let snapshot = {
            let mut session = self.session.lock();
            session.is_loading = loading;
            session.clone()
        };
        self.notify(&snapshot);
    }

    /// Register a callback invoked after every session mutation. Callbacks
    /// run synchronously under the registry lock: keep them light and do not
    /// call back into the manager from inside one.
    pub fn subscribe(&self, callback: impl Fn(&Session) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.subscribers.lock().push((id, Box::new(callback)));
        id
    }

    /// Remove an observer. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().retain(|(sub_id, _)| *sub_id != id);
    }

    /// Push the persisted session (if any) into memory and register the
    /// stored bearer token with the gateway client. Does not rewrite the
    /// store: loading stays a pure read.
    pub fn rehydrate(&self, api: &ApiClient) {
        let loaded = self.store.load();
        if loaded.is_empty() {
            return;
        }
        if let Some(token) = loaded.access_token.as_deref() {
            api.set_auth_token(token);
        }
        tracing::debug!(
            authenticated = loaded.is_authenticated,
            "session rehydrated from storage"
        );
        let snapshot = {
            let mut session = self.session.lock();
            *session = loaded;
            session.clone()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, snapshot: &Session) {
        for (_, callback) in self.subscribers.lock().iter() {
            callback(snapshot);
        }
    }
}
