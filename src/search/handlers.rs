// src/search/handlers.rs

use axum::extract::{Extension, Json, Query};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::pagination::{
    next_page, previous_page, result_window, PageParams, ResultWindow, PAGE_LIMIT_OPTIONS,
};
use super::query::{
    parse_free_text, parse_from_url_params, submit, to_api_query, to_display_label,
    StructuredQuery,
};
use crate::common::{ApiError, AppState};
use crate::registry::models::PackageWithVersions;

#[derive(Debug, Deserialize)]
pub struct SearchSubmission {
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct SearchSubmissionResponse {
    pub url: String,
    pub label: String,
    pub query: StructuredQuery,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub categories: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultsResponse {
    pub query: StructuredQuery,
    pub label: String,
    pub page: i64,
    pub limit: i64,
    /// Page sizes the limit selector offers
    pub limit_options: [i64; 4],
    #[serde(flatten)]
    pub window: ResultWindow,
    pub previous_page: i64,
    pub next_page: i64,
    pub total_pages: i64,
    pub total_packages: i64,
    pub packages: Vec<PackageWithVersions>,
}

/// POST /api/search - Turn search-box input into a navigation URL
pub async fn submit_search(
    Json(request): Json<SearchSubmission>,
) -> Result<Json<SearchSubmissionResponse>, ApiError> {
    let url = submit(&request.input)?;
    let query = parse_free_text(&request.input);

    debug!(url = %url, "Search submitted");

    Ok(Json(SearchSubmissionResponse {
        url,
        label: to_display_label(&query),
        query,
    }))
}

/// GET /api/search?q=&type=&categories=&page=&limit= - Search results page
pub async fn search_packages(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResultsResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let query = parse_from_url_params(
        params.q.as_deref(),
        params.content_type.as_deref(),
        params.categories.as_deref(),
    );
    if query.is_empty() {
        return Err(ApiError::EmptySearchSubmission);
    }

    let (page, limit) = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve();

    let api_query = to_api_query(&query, page, limit);
    let results = state.registry.search_packages(&api_query).await?;

    info!(
        term = %query.term,
        content_type = ?query.content_type,
        category = ?query.category,
        total = results.total_packages,
        page = page,
        limit = limit,
        "Search results loaded"
    );

    Ok(Json(SearchResultsResponse {
        label: to_display_label(&query),
        query,
        page,
        limit,
        limit_options: PAGE_LIMIT_OPTIONS,
        window: result_window(page, limit, results.total_packages),
        previous_page: previous_page(page),
        next_page: next_page(page, results.total_pages),
        total_pages: results.total_pages,
        total_packages: results.total_packages,
        packages: results.packages,
    }))
}
