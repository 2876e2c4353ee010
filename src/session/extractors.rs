//! Session extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::models::{Session, SessionError, SessionId};
use crate::common::{ApiError, AppState};

fn base_cookie(name: &str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie that binds the browser to `id`
pub fn session_cookie(name: &str, id: &SessionId, secure: bool) -> Cookie<'static> {
    base_cookie(name, id.to_string(), secure)
}

/// Removal cookie for the session cookie
pub fn expired_session_cookie(name: &str, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(name, String::new(), secure);
    cookie.make_removal();
    cookie
}

/// Session id stored in cookie `name`, ignoring malformed values
pub fn session_id_from(jar: &CookieJar, name: &str) -> Option<SessionId> {
    let value = jar.get(name)?.value();
    match Uuid::parse_str(value) {
        Ok(id) => Some(id),
        Err(_) => {
            debug!("Ignoring malformed session cookie");
            None
        }
    }
}

async fn app_state<S: Send + Sync>(parts: &mut Parts, state: &S) -> Result<AppState, ApiError> {
    let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
        Extension::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

    let app_state = state_lock.read().await.clone();
    Ok(app_state)
}

/// Session id carried by the request, if any. Never rejects.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookie(pub Option<SessionId>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionCookie
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        let jar = CookieJar::from_headers(&parts.headers);

        Ok(SessionCookie(session_id_from(
            &jar,
            &app_state.config.session_cookie_name,
        )))
    }
}

/// Signed-in session whose credential is still usable.
///
/// Rejects with `NoActiveSession` when there is none and tears the session
/// down when its last refresh failed.
#[derive(Debug)]
pub struct ActiveSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for ActiveSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let SessionCookie(id) = SessionCookie::from_request_parts(parts, state).await?;
        let id = id.ok_or_else(|| {
            warn!("Request requires a session but carries no session cookie");
            ApiError::NoActiveSession
        })?;

        let app_state = app_state(parts, state).await?;
        match app_state.coordinator.current(&id).await {
            Ok(session) => Ok(ActiveSession(session)),
            Err(SessionError::RefreshFailed) => Err(ApiError::RefreshFailed),
            Err(e) => {
                warn!(session_id = %id, error = %e, "Session lookup failed");
                Err(ApiError::from(e))
            }
        }
    }
}
