//! Auth-state change notifications.
//!
//! An explicit register/unregister observer: callers implement
//! [`AuthStateListener`], register it, and hold the returned
//! [`AuthSubscription`] until they want to stop receiving events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;

use super::types::Session;

/// Kind of auth-state transition being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Receiver of auth-state transitions.
///
/// Callbacks are synchronous; listeners that need to do I/O on an event
/// should spawn a task.
pub trait AuthStateListener: Send + Sync {
    fn on_auth_event(&self, event: AuthChangeEvent, session: Option<&Session>);
}

type ListenerMap = Mutex<HashMap<u64, Arc<dyn AuthStateListener>>>;

/// Registry of active listeners, keyed by registration order.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Arc<ListenerMap>,
}

impl ListenerRegistry {
    pub async fn register(&self, listener: Arc<dyn AuthStateListener>) -> AuthSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().await.insert(id, listener);
        AuthSubscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Invoke every registered listener with the event.
    ///
    /// The listener set is snapshotted first, so a listener may unsubscribe
    /// (from a spawned task) without deadlocking the registry.
    pub async fn emit(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let snapshot: Vec<Arc<dyn AuthStateListener>> =
            self.listeners.lock().await.values().cloned().collect();
        tracing::debug!(?event, listeners = snapshot.len(), "emitting auth event");
        for listener in snapshot {
            listener.on_auth_event(event, session);
        }
    }
}

/// Handle to a registered listener. Unsubscribing removes exactly that
/// listener; dropping the handle leaves it registered.
pub struct AuthSubscription {
    id: u64,
    listeners: Weak<ListenerMap>,
}

impl AuthSubscription {
    pub async fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().await.remove(&self.id);
        }
    }
}
