//! Persisted session store.
//!
//! Holds the current user and token, publishes every change on a watch
//! channel, and mirrors the authenticated state into durable storage under
//! `auth_token` and `auth_user`. Storage is best effort: a disabled or broken
//! store leaves the in-memory session authoritative.

pub mod types;

pub use types::{Session, SubscriptionTier, User, UserPatch, UserRole};

use std::sync::Arc;
use tokio::sync::watch;

use crate::result_ext::ResultExt;
use crate::storage::{KeyValueStore, AUTH_TOKEN_KEY, AUTH_USER_KEY, LEGACY_SESSION_KEY};
use types::LegacySessionBlob;

/// Shared handle to the session. Clones observe the same state.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<Session>>,
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create an empty, not yet hydrated store.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self {
            state: Arc::new(tx),
            storage,
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn is_hydrated(&self) -> bool {
        self.state.borrow().is_hydrated
    }

    /// Receive every subsequent session snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Resolve once `rehydrate` has completed.
    pub async fn wait_hydrated(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|session| session.is_hydrated).await;
    }

    /// Store a freshly issued token and user and persist both.
    pub fn set_auth(&self, token: impl Into<String>, user: User) {
        let token = token.into();
        self.persist(&token, &user);
        self.state.send_modify(|session| session.authenticate(token, user));
        tracing::debug!("Session authenticated");
    }

    /// Clear the session and its persisted entries. Safe to call repeatedly.
    pub fn logout(&self) {
        self.state.send_if_modified(|session| {
            let was_set = session.token.is_some() || session.user.is_some();
            session.clear();
            was_set
        });

        for key in [AUTH_TOKEN_KEY, AUTH_USER_KEY, LEGACY_SESSION_KEY] {
            self.storage
                .remove(key)
                .warn_ok(format!("remove persisted {}", key));
        }
        tracing::debug!("Session cleared");
    }

    /// Merge `patch` into the current user. Does nothing when logged out.
    pub fn update_user(&self, patch: &UserPatch) {
        let mut merged = None;
        self.state.send_if_modified(|session| match session.user.as_mut() {
            Some(user) => {
                patch.apply_to(user);
                merged = Some(user.clone());
                true
            }
            None => false,
        });

        match merged {
            Some(user) => self.persist_user(&user),
            None => tracing::debug!("update_user ignored: no user in session"),
        }
    }

    /// Restore the session from durable storage.
    ///
    /// Only the first call reads storage; the session is marked hydrated
    /// whether or not anything usable was found.
    pub fn rehydrate(&self) -> Session {
        if self.is_hydrated() {
            return self.snapshot();
        }

        let restored = self.read_persisted();
        self.state.send_modify(|session| {
            if let Some((token, user)) = restored {
                // A login that raced ahead of hydration wins.
                if !session.is_authenticated {
                    session.authenticate(token, user);
                }
            }
            session.is_hydrated = true;
        });

        let session = self.snapshot();
        tracing::debug!(
            authenticated = session.is_authenticated,
            "Session rehydrated"
        );
        session
    }

    fn persist(&self, token: &str, user: &User) {
        self.storage
            .set(AUTH_TOKEN_KEY, token)
            .warn_ok("persist auth token");
        self.persist_user(user);
    }

    fn persist_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => {
                self.storage
                    .set(AUTH_USER_KEY, &raw)
                    .warn_ok("persist auth user");
            }
            Err(e) => tracing::warn!("Failed to serialize user: {}", e),
        }
    }

    fn read_persisted(&self) -> Option<(String, User)> {
        let token = self
            .storage
            .get(AUTH_TOKEN_KEY)
            .warn_ok("read persisted token")?;
        let raw_user = self
            .storage
            .get(AUTH_USER_KEY)
            .warn_ok("read persisted user")?;

        match (token, raw_user) {
            (Some(token), Some(raw_user)) => match serde_json::from_str::<User>(&raw_user) {
                Ok(user) => Some((token, user)),
                Err(e) => {
                    tracing::warn!("Discarding persisted user: {}", e);
                    None
                }
            },
            (None, None) => self.migrate_legacy(),
            _ => {
                tracing::warn!("Discarding partial persisted session");
                None
            }
        }
    }

    fn migrate_legacy(&self) -> Option<(String, User)> {
        let raw = self
            .storage
            .get(LEGACY_SESSION_KEY)
            .warn_ok("read legacy session")??;

        let blob = match serde_json::from_str::<LegacySessionBlob>(&raw) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!("Discarding legacy session blob: {}", e);
                return None;
            }
        };

        let (token, user) = match (blob.state.token, blob.state.user) {
            (Some(token), Some(user)) => (token, user),
            _ => return None,
        };

        self.persist(&token, &user);
        self.storage
            .remove(LEGACY_SESSION_KEY)
            .warn_ok("remove legacy session");
        tracing::info!("Migrated legacy session blob");

        Some((token, user))
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.state.borrow();
        f.debug_struct("SessionStore")
            .field("is_authenticated", &session.is_authenticated)
            .field("is_hydrated", &session.is_hydrated)
            .finish()
    }
}
