//! Session handlers: sign-in redirect, provider callback, sign-out and the
//! session poll the browser issues on a timer and on visibility changes.

use axum::{
    extract::{Extension, Json, Query},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::extractors::{expired_session_cookie, session_cookie, SessionCookie};
use super::models::{Session, SessionError, SessionResponse, UserProfile};
use crate::common::{safe_email_log, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SignInParams {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Only same-site relative paths are accepted as post sign-in targets
pub fn sanitize_callback_url(callback_url: Option<&str>) -> String {
    match callback_url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") => url.to_string(),
        _ => "/".to_string(),
    }
}

/// GET /api/auth/signin?callbackUrl=
/// Redirects the browser to the identity provider
pub async fn sign_in(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<SignInParams>,
) -> Redirect {
    let state = state_lock.read().await.clone();

    let sign_in_state = Uuid::new_v4().to_string();
    let callback_url = sanitize_callback_url(params.callback_url.as_deref());
    state
        .pending_sign_ins
        .remember(sign_in_state.clone(), callback_url)
        .await;

    let url = state
        .refresher
        .authorization_url(&state.config.callback_url(), &sign_in_state);
    debug!("Redirecting to identity provider for sign-in");
    Redirect::to(&url)
}

/// GET /api/auth/callback/keycloak?code=&state=
/// Completes sign-in: code exchange, user lookup, new session cookie
pub async fn sign_in_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();

    if let Some(error) = params.error {
        warn!(error = %error, "Identity provider returned a sign-in error");
        return Err(ApiError::Unauthorized("sign-in was not completed".to_string()));
    }

    let sign_in_state = params.state.ok_or(SessionError::InvalidSignInState)?;
    let callback_url = state
        .pending_sign_ins
        .take(&sign_in_state)
        .await
        .ok_or(SessionError::InvalidSignInState)?;
    let code = params
        .code
        .ok_or_else(|| ApiError::BadRequest("missing authorization code".to_string()))?;

    let credential = state
        .refresher
        .exchange_code(&code, &state.config.callback_url())
        .await?;

    let user = match state.refresher.fetch_user_profile(&credential.access_token).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "Failed to load user profile, continuing without it");
            UserProfile::default()
        }
    };

    let session = Session::new(credential, user);
    let session_id = session.id;
    info!(
        session_id = %session_id,
        email = %session.user.email.as_deref().map(safe_email_log).unwrap_or_default(),
        "Session created"
    );
    state.sessions.set(session).await;

    let cookie = session_cookie(
        &state.config.session_cookie_name,
        &session_id,
        state.config.session_cookie_secure,
    );
    Ok((jar.add(cookie), Redirect::to(&callback_url)).into_response())
}

/// POST /api/auth/signout
pub async fn sign_out(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
    SessionCookie(id): SessionCookie,
) -> Response {
    let state = state_lock.read().await.clone();

    if let Some(id) = id {
        if state.sessions.clear(&id).await.is_some() {
            info!(session_id = %id, "Signed out");
        }
    }

    let cookie = expired_session_cookie(
        &state.config.session_cookie_name,
        state.config.session_cookie_secure,
    );
    (jar.add(cookie), Json(serde_json::json!({ "url": "/" }))).into_response()
}

/// GET /api/auth/session
///
/// Polled by the browser on a timer and whenever the page becomes visible.
/// Each poll is a refresh trigger; a failed refresh signs the user out.
pub async fn get_session(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
    SessionCookie(id): SessionCookie,
) -> Response {
    let state = state_lock.read().await.clone();

    let Some(id) = id else {
        return Json(SessionResponse::anonymous()).into_response();
    };

    let expired = expired_session_cookie(
        &state.config.session_cookie_name,
        state.config.session_cookie_secure,
    );

    match state.coordinator.on_visibility(&id).await {
        Ok(session) => Json(SessionResponse::active(&session)).into_response(),
        Err(SessionError::RefreshFailed) => {
            (jar.add(expired), Json(SessionResponse::refresh_failed())).into_response()
        }
        Err(_) => (jar.add(expired), Json(SessionResponse::anonymous())).into_response(),
    }
}
