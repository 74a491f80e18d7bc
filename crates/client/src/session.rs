//! Authentication state with an explicit observer registry.
//!
//! An `AuthContext` is constructed once by the host and handed to whatever
//! needs it. Listeners run synchronously, in subscription order, after every
//! state change and receive the previous and the new state.
//!
//! Every change of token bumps [`AuthContext::generation`], so holders of
//! per-user data can tell that the user behind the session is no longer the
//! one their data belongs to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Snapshot of the signed-in user, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub token: Option<String>,
    pub subject: Option<String>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Handle returned by [`AuthContext::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&AuthState, &AuthState) + Send + Sync>;

#[derive(Default)]
pub struct AuthContext {
    state: RwLock<AuthState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
    generation: AtomicU64,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_authenticated()
    }

    /// Current token, formatted for an `Authorization` header.
    pub fn bearer(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .as_ref()
            .map(|token| format!("Bearer {token}"))
    }

    /// Incremented whenever the token changes: sign-in, sign-out or a switch
    /// to another user.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn sign_in(&self, token: impl Into<String>, subject: Option<String>) {
        self.replace(AuthState { token: Some(token.into()), subject });
    }

    pub fn sign_out(&self) {
        self.replace(AuthState::default());
    }

    pub fn subscribe(&self, listener: impl Fn(&AuthState, &AuthState) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    fn replace(&self, next: AuthState) {
        let previous = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let previous = std::mem::replace(&mut *state, next.clone());
            if previous.token != next.token {
                self.generation.fetch_add(1, Ordering::SeqCst);
            }
            previous
        };
        tracing::info!(
            authenticated = next.is_authenticated(),
            generation = self.generation(),
            "auth state changed"
        );

        // Listeners may subscribe or unsubscribe re-entrantly; notify a copy.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&previous, &next);
        }
    }
}
