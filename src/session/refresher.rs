// src/session/refresher.rs
//! OpenID Connect client for the identity provider: sign-in code exchange,
//! silent credential refresh and userinfo lookup.

use chrono::Utc;
use reqwest::{Client, Response};
use tracing::{debug, error, info, warn};

use super::models::{Credential, ProviderTokenResponse, Session, SessionError, UserProfile};
use crate::common::{safe_token_log, ProviderConfig};

#[derive(Debug, Clone)]
pub struct SessionRefresher {
    client: Client,
    provider: ProviderConfig,
}

impl SessionRefresher {
    pub fn new(client: Client, provider: ProviderConfig) -> Self {
        Self { client, provider }
    }

    /// Provider authorization URL the browser is redirected to on sign-in
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.provider.authorization_endpoint(),
            urlencoding::encode(&self.provider.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode("openid email profile"),
            urlencoding::encode(state)
        )
    }

    async fn post_token_form(&self, params: &[(&str, &str)]) -> Result<Response, SessionError> {
        let response = self
            .client
            .post(self.provider.token_endpoint())
            .form(params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send token request");
                SessionError::RequestFailed(e.to_string())
            })?;

        let status = response.status();
        debug!(status = %status, "Received token endpoint response");

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SessionError::ProviderRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn parse_token_response(response: Response) -> Result<ProviderTokenResponse, SessionError> {
        response
            .json::<ProviderTokenResponse>()
            .await
            .map_err(|e| SessionError::Serialization(e.to_string()))
    }

    /// Exchanges the authorization code from the sign-in callback for the
    /// first credential of a session.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential, SessionError> {
        let params = [
            ("client_id", self.provider.client_id.as_str()),
            ("client_secret", self.provider.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self.post_token_form(&params).await?;
        let payload = Self::parse_token_response(response).await?;
        let credential = self.initialize_from_provider_exchange(payload)?;

        info!(
            id_token = %safe_token_log(&credential.id_token),
            expires_at = %credential.id_token_expiry,
            "Signed in with identity provider"
        );
        Ok(credential)
    }

    /// Builds the initial credential from the provider's exchange payload.
    /// A payload without tokens means the client registration is broken.
    pub fn initialize_from_provider_exchange(
        &self,
        payload: ProviderTokenResponse,
    ) -> Result<Credential, SessionError> {
        payload.into_credential(Utc::now()).map_err(|e| {
            error!(error = %e, "Identity provider exchange returned an unusable payload");
            e
        })
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<Credential, SessionError> {
        let params = [
            ("client_id", self.provider.client_id.as_str()),
            ("client_secret", self.provider.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let response = self.post_token_form(&params).await?;
        let payload = Self::parse_token_response(response).await?;
        payload.into_credential(Utc::now())
    }

    /// Single refresh attempt. On any failure the current credential comes
    /// back unchanged except for its error state; nothing is retried. An
    /// expired refresh token fails without contacting the provider.
    pub async fn refresh(&self, current: &Credential) -> Credential {
        if !current.is_usable() {
            debug!("Credential already failed, not refreshing");
            return current.clone();
        }

        if current.refresh_token_expiry <= Utc::now() {
            info!("Refresh token expired, session must sign in again");
            return current.clone().into_failed();
        }

        debug!(
            client_id = %self.provider.client_id,
            refresh_token = %safe_token_log(&current.refresh_token),
            "Refreshing credential with identity provider"
        );

        match self.request_refresh(&current.refresh_token).await {
            Ok(credential) => {
                info!(expires_at = %credential.id_token_expiry, "Credential refreshed");
                credential
            }
            Err(e) => {
                warn!(error = %e, "Credential refresh failed, session must sign in again");
                current.clone().into_failed()
            }
        }
    }

    /// Looks up the signed-in user's email and display name
    pub async fn fetch_user_profile(&self, access_token: &str) -> Result<UserProfile, SessionError> {
        let response = self
            .client
            .get(self.provider.userinfo_endpoint())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SessionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::ProviderRejected {
                status: status.as_u16(),
                body: "Failed to get user info".to_string(),
            });
        }

        response
            .json::<UserProfile>()
            .await
            .map_err(|e| SessionError::Serialization(e.to_string()))
    }
}

/// True once the session's credential has failed to refresh
pub fn should_force_sign_out(session: &Session) -> bool {
    session.state.is_failed()
}
