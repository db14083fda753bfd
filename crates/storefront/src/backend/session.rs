//! The signed-in user and its local snapshot.

use std::sync::Arc;

use apparel_core::User;
use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};

use crate::storage::{self, LocalStore, keys};

const EVENT_CAPACITY: usize = 32;

/// Session transitions that front ends and stores react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(User),
    /// Emitted once per signed-in session; front ends return to the
    /// landing view on receipt.
    SignedOut,
}

/// Shared handle to the current user.
///
/// The server-side session cookie is authoritative. The user kept here, and
/// its copy in the local store, only answer "is anyone logged in" without a
/// round trip.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    user: RwLock<Option<User>>,
    store: Arc<dyn LocalStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                user: RwLock::new(None),
                store,
                events,
            }),
        }
    }

    /// Reload the cached user snapshot, if any.
    pub async fn restore(&self) -> Option<User> {
        let cached = match storage::read_json::<User>(self.inner.store.as_ref(), keys::USER) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "failed to read cached user");
                None
            }
        };

        if let Some(user) = &cached {
            *self.inner.user.write().await = Some(user.clone());
            let _ = self.inner.events.send(SessionEvent::SignedIn(user.clone()));
        }
        cached
    }

    /// Record a successful login.
    pub async fn sign_in(&self, user: User) {
        if let Err(e) = storage::write_json(self.inner.store.as_ref(), keys::USER, &user) {
            warn!(error = %e, "failed to cache user");
        }
        *self.inner.user.write().await = Some(user.clone());
        info!(username = %user.username, "signed in");
        let _ = self.inner.events.send(SessionEvent::SignedIn(user));
    }

    /// Drop the user and the local snapshot.
    ///
    /// Returns whether a user was signed in. [`SessionEvent::SignedOut`] is
    /// only published on that transition, so concurrent callers produce one
    /// event between them.
    pub async fn sign_out(&self) -> bool {
        if let Err(e) = self.inner.store.remove(keys::USER) {
            warn!(error = %e, "failed to remove cached user");
        }
        let previous = self.inner.user.write().await.take();
        let was_signed_in = previous.is_some();
        if was_signed_in {
            info!("signed out");
            let _ = self.inner.events.send(SessionEvent::SignedOut);
        }
        was_signed_in
    }

    pub async fn current_user(&self) -> Option<User> {
        self.inner.user.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.user.read().await.is_some()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// The local store backing this session.
    #[must_use]
    pub fn store(&self) -> Arc<dyn LocalStore> {
        Arc::clone(&self.inner.store)
    }
}
