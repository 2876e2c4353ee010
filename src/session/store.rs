//! Session storage

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::models::{Session, SessionId};

/// Owner of every live session. The coordinator and the HTTP handlers only
/// go through `get` / `set` / `update` / `clear`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &SessionId) -> Option<Session>;

    async fn set(&self, session: Session);

    /// Replaces a session only if it is still stored. Returns `false` when it
    /// was cleared in the meantime.
    async fn update(&self, session: Session) -> bool;

    async fn clear(&self, id: &SessionId) -> Option<Session>;

    async fn ids(&self) -> Vec<SessionId>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn set(&self, session: Session) {
        self.sessions.write().await.insert(session.id, session);
    }

    async fn update(&self, session: Session) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.id) {
            Some(stored) => {
                *stored = session;
                true
            }
            None => false,
        }
    }

    async fn clear(&self, id: &SessionId) -> Option<Session> {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            debug!(session_id = %id, "Session cleared");
        }
        removed
    }

    async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().copied().collect()
    }
}

/// How long a sign-in redirect may take before its `state` is forgotten
const SIGN_IN_STATE_TTL_MINUTES: i64 = 10;

struct PendingSignIn {
    callback_url: String,
    created_at: DateTime<Utc>,
}

/// CSRF `state` values handed to the identity provider, mapped to the page
/// the user returns to after signing in
#[derive(Default)]
pub struct PendingSignIns {
    pending: RwLock<HashMap<String, PendingSignIn>>,
}

impl PendingSignIns {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remember(&self, state: String, callback_url: String) {
        let mut pending = self.pending.write().await;
        let cutoff = Utc::now() - Duration::minutes(SIGN_IN_STATE_TTL_MINUTES);
        pending.retain(|_, p| p.created_at > cutoff);
        pending.insert(
            state,
            PendingSignIn {
                callback_url,
                created_at: Utc::now(),
            },
        );
    }

    /// Consumes `state`, returning the callback URL if it was issued here and
    /// has not expired
    pub async fn take(&self, state: &str) -> Option<String> {
        let cutoff = Utc::now() - Duration::minutes(SIGN_IN_STATE_TTL_MINUTES);
        self.pending
            .write()
            .await
            .remove(state)
            .filter(|p| p.created_at > cutoff)
            .map(|p| p.callback_url)
    }
}
