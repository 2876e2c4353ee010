// src/session/coordinator.rs
//! Single entry point for refresh triggers.
//!
//! Two triggers exist: a periodic tick over every stored session and the
//! visibility/focus poll of one session from the browser. Both funnel into
//! [`RefreshCoordinator::refresh_session`], which keeps at most one refresh
//! in flight per session.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::models::{Session, SessionError, SessionId, SessionState};
use super::refresher::{should_force_sign_out, SessionRefresher};
use super::store::SessionStore;

pub struct RefreshCoordinator {
    refresher: Arc<SessionRefresher>,
    sessions: Arc<dyn SessionStore>,
    in_flight: Mutex<HashSet<SessionId>>,
}

impl RefreshCoordinator {
    pub fn new(refresher: Arc<SessionRefresher>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            refresher,
            sessions,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Runs one step of the session state machine for `id` and returns the
    /// resulting state, or `None` when the session does not exist.
    ///
    /// - fresh from sign-in: the flag is cleared, no refresh
    /// - failed: terminal, no refresh
    /// - refresh already in flight: no-op
    /// - otherwise: `Authenticated -> Refreshing -> Authenticated | Failed`
    pub async fn refresh_session(&self, id: &SessionId) -> Option<SessionState> {
        let mut session = self.sessions.get(id).await?;

        if session.state.is_failed() {
            return Some(session.state);
        }

        if session.fresh_from_sign_in {
            session.fresh_from_sign_in = false;
            let state = session.state.clone();
            if !self.sessions.update(session).await {
                return None;
            }
            debug!(session_id = %id, "Credential fresh from sign-in, refresh skipped");
            return Some(state);
        }

        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(*id) {
                debug!(session_id = %id, "Refresh already in flight");
                return Some(session.state);
            }
        }

        let previous = session.credential().clone();
        session.state = SessionState::Refreshing {
            previous: previous.clone(),
        };
        if !self.sessions.update(session.clone()).await {
            self.in_flight.lock().await.remove(id);
            return None;
        }

        let credential = self.refresher.refresh(&previous).await;
        session.state = SessionState::after_refresh(credential);

        // A sign-out during the refresh wins over the refresh result
        let still_signed_in = self.sessions.update(session.clone()).await;
        self.in_flight.lock().await.remove(id);

        if !still_signed_in {
            debug!(session_id = %id, "Session signed out during refresh, result dropped");
            return None;
        }
        if session.state.is_failed() {
            warn!(session_id = %id, "Session refresh failed, sign-out pending");
        }
        Some(session.state)
    }

    /// Current session for an authenticated request. A failed session is
    /// torn down here and reported as [`SessionError::RefreshFailed`].
    pub async fn current(&self, id: &SessionId) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .get(id)
            .await
            .ok_or(SessionError::NoActiveSession)?;

        if should_force_sign_out(&session) {
            self.sessions.clear(id).await;
            info!(session_id = %id, "Forced sign-out after failed refresh");
            return Err(SessionError::RefreshFailed);
        }

        Ok(session)
    }

    /// Visibility/focus trigger from the browser
    pub async fn on_visibility(&self, id: &SessionId) -> Result<Session, SessionError> {
        self.refresh_session(id).await;
        self.current(id).await
    }

    /// Periodic trigger: one refresh step for every stored session.
    ///
    /// A session already failed when the tick starts is cleared, so a failure
    /// stays visible to its browser for one period at most.
    pub async fn on_tick(&self) {
        let ids = self.sessions.ids().await;
        debug!(session_count = ids.len(), "Periodic session refresh");
        for id in ids {
            match self.sessions.get(&id).await {
                Some(session) if should_force_sign_out(&session) => {
                    self.sessions.clear(&id).await;
                    info!(session_id = %id, "Cleared failed session");
                }
                Some(_) => {
                    self.refresh_session(&id).await;
                }
                None => {}
            }
        }
    }

    /// Spawns the periodic trigger. The first tick fires after one full
    /// `period`.
    pub fn start_periodic_refresh(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                self.on_tick().await;
            }
        })
    }
}
