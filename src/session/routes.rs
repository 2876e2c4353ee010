//! Session routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the session router
///
/// # Routes
/// - `GET /api/auth/signin` - Redirect to the identity provider
/// - `GET /api/auth/callback/keycloak` - Identity provider redirect target
/// - `POST /api/auth/signout` - Clear the session
/// - `GET /api/auth/session` - Session poll (refresh trigger)
pub fn session_routes() -> Router {
    Router::new()
        .route("/api/auth/signin", get(handlers::sign_in))
        .route("/api/auth/callback/keycloak", get(handlers::sign_in_callback))
        .route("/api/auth/signout", post(handlers::sign_out))
        .route("/api/auth/session", get(handlers::get_session))
}
