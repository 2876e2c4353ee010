//! Session and credential data models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Renewal is scheduled this long before the provider-reported expiry
pub const EXPIRY_MARGIN_SECS: i64 = 15;

pub type SessionId = Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Session refresh failed")]
    RefreshFailed,

    #[error("Sign-in state is unknown or expired")]
    InvalidSignInState,

    #[error("Token response is missing `{0}`")]
    MalformedTokenResponse(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Identity provider returned HTTP {status}: {body}")]
    ProviderRejected { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorState {
    None,
    RefreshFailed,
}

/// Authentication material of one signed-in user
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
    pub id_token_expiry: DateTime<Utc>,
    pub refresh_token_expiry: DateTime<Utc>,
    pub error_state: ErrorState,
}

impl Credential {
    /// A failed credential keeps its stale tokens but must not be used
    pub fn is_usable(&self) -> bool {
        self.error_state == ErrorState::None
    }

    pub fn into_failed(self) -> Self {
        Self {
            error_state: ErrorState::RefreshFailed,
            ..self
        }
    }
}

/// `now + (lifetime - margin)`, never earlier than `now`. `None` when the
/// lifetime is negative or the result is out of range.
pub fn expiry_from(now: DateTime<Utc>, lifetime_secs: i64) -> Option<DateTime<Utc>> {
    if lifetime_secs < 0 {
        return None;
    }
    let remaining = Duration::try_seconds((lifetime_secs - EXPIRY_MARGIN_SECS).max(0))?;
    now.checked_add_signed(remaining)
}

/// Token endpoint response. Every field is optional on the wire and checked
/// in [`ProviderTokenResponse::into_credential`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderTokenResponse {
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_expires_in: Option<i64>,
}

impl ProviderTokenResponse {
    pub fn into_credential(self, now: DateTime<Utc>) -> Result<Credential, SessionError> {
        fn required<T>(value: Option<T>, field: &str) -> Result<T, SessionError> {
            value.ok_or_else(|| SessionError::MalformedTokenResponse(field.to_string()))
        }

        let id_token = required(self.id_token.filter(|t| !t.is_empty()), "id_token")?;
        let access_token = required(self.access_token, "access_token")?;
        let refresh_token = required(self.refresh_token.filter(|t| !t.is_empty()), "refresh_token")?;
        let expires_in = required(self.expires_in, "expires_in")?;
        let refresh_expires_in = required(self.refresh_expires_in, "refresh_expires_in")?;

        let id_token_expiry = required(expiry_from(now, expires_in), "expires_in")?;
        let refresh_token_expiry =
            required(expiry_from(now, refresh_expires_in), "refresh_expires_in")?;

        Ok(Credential {
            id_token,
            access_token,
            refresh_token,
            id_token_expiry,
            refresh_token_expiry,
            error_state: ErrorState::None,
        })
    }
}

/// Identity of the signed-in user from the userinfo endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Authenticated(Credential),
    Refreshing { previous: Credential },
    Failed(Credential),
}

impl SessionState {
    pub fn credential(&self) -> &Credential {
        match self {
            SessionState::Authenticated(credential) => credential,
            SessionState::Refreshing { previous } => previous,
            SessionState::Failed(credential) => credential,
        }
    }

    /// State reached once a refresh attempt has produced `credential`
    pub fn after_refresh(credential: Credential) -> Self {
        if credential.is_usable() {
            SessionState::Authenticated(credential)
        } else {
            SessionState::Failed(credential)
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SessionState::Failed(_)) || !self.credential().is_usable()
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub state: SessionState,
    pub user: UserProfile,
    pub created_at: DateTime<Utc>,
    /// Set on sign-in; the first refresh trigger afterwards only clears it
    pub fresh_from_sign_in: bool,
}

impl Session {
    pub fn new(credential: Credential, user: UserProfile) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Authenticated(credential),
            user,
            created_at: Utc::now(),
            fresh_from_sign_in: true,
        }
    }

    pub fn credential(&self) -> &Credential {
        self.state.credential()
    }
}

/// Body of `GET /api/auth/session`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub force_sign_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_in_url: Option<String>,
}

impl SessionResponse {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
            expires: None,
            error: None,
            force_sign_out: false,
            sign_in_url: None,
        }
    }

    pub fn active(session: &Session) -> Self {
        Self {
            authenticated: true,
            user: Some(session.user.clone()),
            expires: Some(session.credential().id_token_expiry),
            error: None,
            force_sign_out: false,
            sign_in_url: None,
        }
    }

    pub fn refresh_failed() -> Self {
        Self {
            authenticated: false,
            user: None,
            expires: None,
            error: Some("RefreshAccessTokenError".to_string()),
            force_sign_out: true,
            sign_in_url: Some(format!(
                "/api/auth/signin?callbackUrl={}",
                urlencoding::encode("/")
            )),
        }
    }
}
