// src/main.rs
use axum::{extract::Extension, http::HeaderValue, Router};
use dotenv::dotenv;
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod common;
mod registry;
mod search;
mod session;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use common::{AppConfig, AppState};
use registry::RegistryClient;
use session::{InMemorySessionStore, PendingSignIns, RefreshCoordinator, SessionRefresher, SessionStore};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env()?;
    info!(
        issuer = %config.provider.issuer,
        deputy_api_url = %config.deputy_api_url,
        refresh_interval_secs = config.refresh_interval.as_secs(),
        "Configuration loaded"
    );

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().timeout(config.http_timeout).build()?;

    let refresher = Arc::new(SessionRefresher::new(
        http_client.clone(),
        config.provider.clone(),
    ));
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let coordinator = Arc::new(RefreshCoordinator::new(refresher.clone(), sessions.clone()));
    info!("Session services initialized");

    coordinator
        .clone()
        .start_periodic_refresh(config.refresh_interval);
    info!("Periodic session refresh started");

    let registry = Arc::new(RegistryClient::new(
        http_client,
        config.deputy_api_url.clone(),
    ));
    info!("RegistryClient initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let port = config.port;
    let cors_origins = config.cors_origins.clone();

    let app_state = AppState {
        config,
        refresher,
        sessions,
        coordinator,
        pending_sign_ins: Arc::new(PendingSignIns::new()),
        registry,
    };

    let shared = Arc::new(RwLock::new(app_state));

    let app = app(shared).layer(cors_layer(&cors_origins));

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Deputy web client listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// ROUTER COMPOSITION
// ============================================================================

fn app(shared: Arc<RwLock<AppState>>) -> Router {
    Router::new()
        // Sign-in, sign-out and session polling
        .merge(session::session_routes())
        // Search submission and results
        .merge(search::search_routes())
        // Packages, categories and API tokens
        .merge(registry::registry_routes())
        .layer(Extension(shared))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod test_support;
