//! Startup session resolution and ongoing auth-state tracking.
//!
//! The tracker owns the process-wide [`AuthState`] slot. Two producers write
//! to it: the explicit startup resolution and the listener registered with
//! the identity client (token refresh, sign-out elsewhere, expiry). Both
//! derive the state identically from the same session + profile pair, so the
//! slot only needs last-write-wins semantics.

use std::sync::{Arc, Weak};

use tokio::sync::{broadcast, Mutex, RwLock};

use campus_provider::{AuthChangeEvent, AuthStateListener, AuthSubscription, Provider, Session};

use crate::models::{ApplicationUser, AuthState};
use crate::profiles::ProfileStore;

pub struct SessionTracker {
    provider: Arc<Provider>,
    profiles: ProfileStore,
    state: RwLock<AuthState>,
    events: broadcast::Sender<AuthState>,
    subscription: Mutex<Option<AuthSubscription>>,
}

impl SessionTracker {
    pub fn new(provider: Arc<Provider>, profiles: ProfileStore) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            provider,
            profiles,
            state: RwLock::new(AuthState::Unresolved),
            events,
            subscription: Mutex::new(None),
        })
    }

    /// Resolve the startup state: an existing session (with its profile, or
    /// the degraded fallback) or signed-out. Never returns `Unresolved` and
    /// never fails; provider trouble during resolution is logged and treated
    /// as signed-out. Safe to call again - same inputs, same answer.
    pub async fn resolve(&self) -> AuthState {
        let state = match self.provider.auth().current_session().await {
            Some(session) => self.state_for_session(&session).await,
            None => AuthState::SignedOut,
        };
        match state.user() {
            Some(user) => tracing::info!(user_id = %user.id, "resumed existing session"),
            None => tracing::info!("no existing session"),
        }
        self.set_state(state.clone()).await;
        state
    }

    /// Follow auth-state transitions reported by the identity client until
    /// [`shutdown`](Self::shutdown).
    pub async fn subscribe_auth_changes(self: &Arc<Self>) {
        let listener = Arc::new(TrackerListener {
            tracker: Arc::downgrade(self),
        });
        let subscription = self.provider.auth().on_auth_state_change(listener).await;
        *self.subscription.lock().await = Some(subscription);
    }

    /// Sign the user out. The local state clears immediately rather than
    /// waiting for the listener echo; the echo re-writes the same value.
    pub async fn sign_out(&self) {
        if let Err(e) = self.provider.auth().sign_out().await {
            tracing::warn!("remote sign-out failed: {}", e);
        }
        self.set_state(AuthState::SignedOut).await;
    }

    pub async fn current(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// Receiver that yields every state transition.
    pub fn watch(&self) -> broadcast::Receiver<AuthState> {
        self.events.subscribe()
    }

    /// Deregister the auth-change listener.
    pub async fn shutdown(&self) {
        if let Some(subscription) = self.subscription.lock().await.take() {
            subscription.unsubscribe().await;
        }
    }

    async fn state_for_session(&self, session: &Session) -> AuthState {
        let profile = match self.profiles.fetch(session.user_id()).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(user_id = %session.user_id(), "profile fetch failed: {}", e);
                None
            }
        };
        AuthState::SignedIn(ApplicationUser::from_session_and_profile(
            session,
            profile.as_ref(),
        ))
    }

    async fn set_state(&self, state: AuthState) {
        *self.state.write().await = state.clone();
        // Nobody watching is fine.
        let _ = self.events.send(state);
    }
}

/// Bridges the identity client's synchronous callback into an async
/// re-derivation task. Holds the tracker weakly so a torn-down tracker does
/// not keep receiving events through a forgotten subscription.
struct TrackerListener {
    tracker: Weak<SessionTracker>,
}

impl AuthStateListener for TrackerListener {
    fn on_auth_event(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let Some(tracker) = self.tracker.upgrade() else {
            return;
        };
        tracing::debug!(?event, "auth-state change");
        let session = session.cloned();
        tokio::spawn(async move {
            let state = match session {
                Some(session) => tracker.state_for_session(&session).await,
                None => AuthState::SignedOut,
            };
            tracker.set_state(state).await;
        });
    }
}
