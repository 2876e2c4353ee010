// src/registry/routes.rs

use axum::{
    routing::{delete, get},
    Router,
};

use super::handlers;

/// Create the package and token router
pub fn registry_routes() -> Router {
    Router::new()
        // Public package browsing
        .route("/api/packages", get(handlers::list_packages))
        .route("/api/packages/:name", get(handlers::get_package_versions))
        .route("/api/packages/:name/:version", get(handlers::get_package_version))
        .route(
            "/api/packages/:name/:version/path/*path",
            get(handlers::get_package_file),
        )
        .route("/api/categories", get(handlers::list_categories))
        // Token management (requires a session)
        .route(
            "/api/tokens",
            get(handlers::list_tokens).post(handlers::create_token),
        )
        .route("/api/tokens/:id", delete(handlers::delete_token))
}
