// src/search/routes.rs

use axum::{routing::get, Router};

use super::handlers;

/// Create the search router
pub fn search_routes() -> Router {
    Router::new().route(
        "/api/search",
        get(handlers::search_packages).post(handlers::submit_search),
    )
}
