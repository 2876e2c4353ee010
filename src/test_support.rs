//! Test utilities shared by the module test suites.
//!
//! Stands up an in-process identity provider and package server on
//! `127.0.0.1:0` so the HTTP clients run against real sockets.

use axum::{
    extract::{Form, Path, RawQuery},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use crate::common::{AppConfig, AppState, ProviderConfig};
use crate::registry::RegistryClient;
use crate::session::{
    Credential, ErrorState, InMemorySessionStore, PendingSignIns, RefreshCoordinator,
    SessionRefresher, SessionStore,
};

pub const TEST_ID_TOKEN: &str = "id-token-original";
pub const TEST_REFRESH_TOKEN: &str = "refresh-token-original";
pub const TEST_AUTH_CODE: &str = "good-code";

/// Serves `router` on an ephemeral port and returns its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{}", addr)
}

#[derive(Debug, Clone, Copy)]
pub enum RefreshBehavior {
    Succeed,
    Reject(StatusCode),
    Malformed,
    /// Lifetime too large to add to the current time
    OverflowingExpiry,
}

pub struct FakeProvider {
    pub issuer: String,
    pub token_calls: Arc<AtomicUsize>,
}

impl FakeProvider {
    pub fn config(&self) -> ProviderConfig {
        ProviderConfig {
            client_id: "deputy-web".to_string(),
            client_secret: "deputy-secret".to_string(),
            issuer: self.issuer.clone(),
        }
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
}

fn token_body(suffix: &str) -> serde_json::Value {
    json!({
        "id_token": format!("id-token-{}", suffix),
        "access_token": format!("access-token-{}", suffix),
        "refresh_token": format!("refresh-token-{}", suffix),
        "expires_in": 300,
        "refresh_expires_in": 1800,
        "token_type": "Bearer"
    })
}

pub async fn spawn_provider(behavior: RefreshBehavior) -> FakeProvider {
    let token_calls = Arc::new(AtomicUsize::new(0));
    let calls = token_calls.clone();

    let token = move |Form(form): Form<HashMap<String, String>>| {
        let calls = calls.clone();
        async move {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;

            let client_ok = form.get("client_id").map(String::as_str) == Some("deputy-web")
                && form.get("client_secret").map(String::as_str) == Some("deputy-secret");
            if !client_ok {
                return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"})))
                    .into_response();
            }

            match form.get("grant_type").map(String::as_str) {
                Some("authorization_code") => {
                    if form.get("code").map(String::as_str) == Some(TEST_AUTH_CODE) {
                        Json(token_body("signin")).into_response()
                    } else {
                        (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"})))
                            .into_response()
                    }
                }
                Some("refresh_token") if form.contains_key("refresh_token") => match behavior {
                    RefreshBehavior::Succeed => {
                        Json(token_body(&format!("refreshed-{}", call))).into_response()
                    }
                    RefreshBehavior::Reject(status) => {
                        (status, Json(json!({"error": "invalid_grant"}))).into_response()
                    }
                    RefreshBehavior::Malformed => {
                        Json(json!({"access_token": "only-access"})).into_response()
                    }
                    RefreshBehavior::OverflowingExpiry => {
                        let mut body = token_body(&format!("refreshed-{}", call));
                        body["expires_in"] = json!(10_000_000_000_000i64);
                        Json(body).into_response()
                    }
                },
                _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "unsupported_grant_type"})))
                    .into_response(),
            }
        }
    };

    let userinfo = |headers: HeaderMap| async move {
        match headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
            Some(value) if value.starts_with("Bearer ") => Json(json!({
                "sub": "user-1",
                "email": "user@example.com",
                "name": "Test User"
            }))
            .into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    };

    let router = Router::new()
        .route("/realms/deputy/protocol/openid-connect/token", post(token))
        .route(
            "/realms/deputy/protocol/openid-connect/userinfo",
            get(userinfo),
        );

    let base = spawn_server(router).await;
    FakeProvider {
        issuer: format!("{}/realms/deputy", base),
        token_calls,
    }
}

pub struct FakeRegistry {
    pub url: String,
    /// Raw query strings received by the search endpoint
    pub search_queries: Arc<Mutex<Vec<String>>>,
    /// Bodies received by the token creation endpoint
    pub created_tokens: Arc<Mutex<Vec<serde_json::Value>>>,
}

fn package_json(name: &str) -> serde_json::Value {
    json!({
        "id": format!("{}-id", name),
        "name": name,
        "description": format!("{} package", name),
        "readmeHtml": "",
        "createdAt": "2023-05-01T10:00:00Z"
    })
}

fn version_json(version: &str) -> serde_json::Value {
    json!({
        "id": format!("v-{}", version),
        "version": version,
        "license": "MIT",
        "isYanked": false,
        "readmePath": "README.md",
        "readmeHtml": "",
        "packageSize": 1024,
        "checksum": "abc",
        "createdAt": "2023-05-01T10:00:00Z",
        "updatedAt": "2023-05-01T10:00:00Z"
    })
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|v| v == format!("Bearer {}", TEST_ID_TOKEN))
        .unwrap_or(false)
}

pub async fn spawn_registry() -> FakeRegistry {
    let search_queries = Arc::new(Mutex::new(Vec::new()));
    let created_tokens = Arc::new(Mutex::new(Vec::new()));

    let recorded = search_queries.clone();
    let search = move |RawQuery(query): RawQuery| {
        let recorded = recorded.clone();
        async move {
            recorded
                .lock()
                .expect("search log")
                .push(query.unwrap_or_default());
            Json(json!({
                "packages": [package_json("nginx")],
                "totalPages": 1,
                "totalPackages": 1
            }))
        }
    };

    let list_packages = || async {
        Json(json!({
            "packages": [package_json("nginx"), package_json("redis")],
            "totalPages": 1,
            "totalPackages": 2
        }))
    };

    let versions = |Path(name): Path<String>| async move {
        if name == "missing" {
            return Json(json!([])).into_response();
        }
        Json(json!([
            version_json("1.10.0"),
            version_json("1.2.0"),
            version_json("1.9.0")
        ]))
        .into_response()
    };

    let version = |Path((_name, version)): Path<(String, String)>| async move {
        Json(version_json(&version))
    };

    let file = |Path((name, version, path)): Path<(String, String, String)>| async move {
        if path == "missing.txt" {
            return StatusCode::NOT_FOUND.into_response();
        }
        (
            [(CONTENT_TYPE, "text/x-rust")],
            format!("// {}/{}/{}", name, version, path),
        )
            .into_response()
    };

    let categories = || async {
        Json(json!([
            {"id": "c2", "name": "networking"},
            {"id": "c1", "name": "Infra"},
            {"id": "c3", "name": "databases"}
        ]))
    };

    let list_tokens = |headers: HeaderMap| async move {
        if !is_authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Json(json!([
            {"id": "t1", "name": "old", "createdAt": "2023-01-01T00:00:00Z"},
            {"id": "t2", "name": "new", "createdAt": "2023-06-01T00:00:00Z"}
        ]))
        .into_response()
    };

    let created = created_tokens.clone();
    let create_token = move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
        let created = created.clone();
        async move {
            if !is_authorized(&headers) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            created.lock().expect("token log").push(body.clone());
            Json(json!({
                "id": "t3",
                "name": body["name"],
                "email": body["email"],
                "token": "secret-token-value",
                "userId": "user-1",
                "createdAt": "2023-07-01T00:00:00Z",
                "updatedAt": "2023-07-01T00:00:00Z"
            }))
            .into_response()
        }
    };

    let delete_token = |headers: HeaderMap, Path(id): Path<String>| async move {
        if !is_authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        id.into_response()
    };

    let router = Router::new()
        .route("/api/v1/search", get(search))
        .route("/api/v1/package", get(list_packages))
        .route("/api/v1/package/:name", get(versions))
        .route("/api/v1/package/:name/:version", get(version))
        .route("/api/v1/package/:name/:version/path/*path", get(file))
        .route("/api/v1/category", get(categories))
        .route("/api/v1/token", get(list_tokens).post(create_token))
        .route("/api/v1/token/:id", delete(delete_token));

    FakeRegistry {
        url: spawn_server(router).await,
        search_queries,
        created_tokens,
    }
}

pub fn test_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("test http client")
}

/// A usable credential as if freshly issued by the provider
pub fn test_credential() -> Credential {
    let now = Utc::now();
    Credential {
        id_token: TEST_ID_TOKEN.to_string(),
        access_token: "access-token-original".to_string(),
        refresh_token: TEST_REFRESH_TOKEN.to_string(),
        id_token_expiry: now + Duration::seconds(285),
        refresh_token_expiry: now + Duration::seconds(1785),
        error_state: ErrorState::None,
    }
}

pub fn test_config(provider: ProviderConfig, registry_url: &str) -> AppConfig {
    AppConfig {
        provider,
        deputy_api_url: registry_url.to_string(),
        public_url: "http://localhost:3000".to_string(),
        port: 0,
        refresh_interval: std::time::Duration::from_secs(50),
        http_timeout: std::time::Duration::from_secs(5),
        cors_origins: vec!["http://localhost:3000".to_string()],
        session_cookie_name: "deputy_session".to_string(),
        session_cookie_secure: false,
    }
}

pub fn test_state(provider: ProviderConfig, registry_url: &str) -> Arc<RwLock<AppState>> {
    let client = test_client();
    let config = test_config(provider.clone(), registry_url);
    let refresher = Arc::new(SessionRefresher::new(client.clone(), provider));
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let coordinator = Arc::new(RefreshCoordinator::new(refresher.clone(), sessions.clone()));

    Arc::new(RwLock::new(AppState {
        config,
        refresher,
        sessions,
        coordinator,
        pending_sign_ins: Arc::new(PendingSignIns::new()),
        registry: Arc::new(RegistryClient::new(client, registry_url)),
    }))
}

/// Reads a response body as JSON
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}
