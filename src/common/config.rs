// src/common/config.rs
//! Runtime configuration read from the environment (after `.env` is loaded)

use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

/// OpenID Connect client registration for the identity provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Realm issuer URL, e.g. `https://keycloak.example.com/realms/deputy`
    pub issuer: String,
}

impl ProviderConfig {
    pub fn token_endpoint(&self) -> String {
        format!("{}/protocol/openid-connect/token", self.issuer.trim_end_matches('/'))
    }

    pub fn authorization_endpoint(&self) -> String {
        format!("{}/protocol/openid-connect/auth", self.issuer.trim_end_matches('/'))
    }

    pub fn userinfo_endpoint(&self) -> String {
        format!(
            "{}/protocol/openid-connect/userinfo",
            self.issuer.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub deputy_api_url: String,
    pub public_url: String,
    pub port: u16,
    pub refresh_interval: Duration,
    pub http_timeout: Duration,
    pub cors_origins: Vec<String>,
    pub session_cookie_name: String,
    pub session_cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let provider = ProviderConfig {
            client_id: required("KEYCLOAK_CLIENT_ID")?,
            client_secret: required("KEYCLOAK_CLIENT_SECRET")?,
            issuer: required("KEYCLOAK_ISSUER")?,
        };

        let deputy_api_url =
            env::var("DEPUTY_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let public_url =
            env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3000);

        let refresh_interval = Duration::from_secs(parse_or("REFRESH_INTERVAL_SECS", 50));
        let http_timeout = Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 30));

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let session_cookie_name =
            env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "deputy_session".to_string());
        let session_cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        Ok(Self {
            provider,
            deputy_api_url: deputy_api_url.trim_end_matches('/').to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
            port,
            refresh_interval,
            http_timeout,
            cors_origins,
            session_cookie_name,
            session_cookie_secure,
        })
    }

    /// Redirect URI registered with the identity provider
    pub fn callback_url(&self) -> String {
        format!("{}/api/auth/callback/keycloak", self.public_url)
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{} must be set", key))
}

fn parse_or(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
