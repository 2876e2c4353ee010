// src/registry/handlers.rs

use axum::{
    extract::{Extension, Json, Path, Query},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::models::{Category, PackagePage, PostToken, Token, TokenRest, Version};
use super::versions::latest_version;
use crate::common::{ApiError, AppState};
use crate::search::pagination::PageParams;
use crate::session::ActiveSession;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersionsResponse {
    pub name: String,
    pub latest: Option<Version>,
    pub versions: Vec<Version>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub name: String,
}

/// GET /api/packages?page=&limit= - Package listing with versions
pub async fn list_packages(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<PackagePage>, ApiError> {
    let state = state_lock.read().await.clone();
    let (page, limit) = params.resolve();

    let packages = state.registry.list_packages(page, limit).await?;

    debug!(
        package_count = packages.packages.len(),
        total = packages.total_packages,
        page = page,
        limit = limit,
        "Loaded package list"
    );

    Ok(Json(packages))
}

/// GET /api/packages/:name - All versions of a package, oldest first
pub async fn get_package_versions(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(name): Path<String>,
) -> Result<Json<PackageVersionsResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let versions = state.registry.package_versions(&name).await?;
    if versions.is_empty() {
        return Err(ApiError::NotFound(format!("Package not found: {}", name)));
    }

    Ok(Json(PackageVersionsResponse {
        latest: latest_version(&versions).cloned(),
        name,
        versions,
    }))
}

/// GET /api/packages/:name/:version
pub async fn get_package_version(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Json<Version>, ApiError> {
    let state = state_lock.read().await.clone();
    let version = state.registry.package_version(&name, &version).await?;
    Ok(Json(version))
}

/// GET /api/packages/:name/:version/path/*path - File preview passthrough
pub async fn get_package_file(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path((name, version, path)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();

    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(ApiError::BadRequest("invalid file path".to_string()));
    }

    let file = state.registry.package_file(&name, &version, &path).await?;
    let content_type = file
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(([(CONTENT_TYPE, content_type)], file.body).into_response())
}

/// GET /api/categories
pub async fn list_categories(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let state = state_lock.read().await.clone();
    let categories = state.registry.categories().await?;
    Ok(Json(categories))
}

/// GET /api/tokens - API tokens of the signed-in user, newest first
pub async fn list_tokens(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    ActiveSession(session): ActiveSession,
) -> Result<Json<Vec<TokenRest>>, ApiError> {
    let state = state_lock.read().await.clone();
    let tokens = state
        .registry
        .list_tokens(&session.credential().id_token)
        .await?;
    Ok(Json(tokens))
}

/// POST /api/tokens - Create an API token for the signed-in user
pub async fn create_token(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    ActiveSession(session): ActiveSession,
    Json(request): Json<CreateTokenRequest>,
) -> Result<(StatusCode, Json<Token>), ApiError> {
    let state = state_lock.read().await.clone();

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("token name is required".to_string()));
    }

    let email = match session.user.email.as_deref() {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => {
            warn!(session_id = %session.id, "Cannot create token, user email missing");
            return Err(ApiError::BadRequest("user email missing".to_string()));
        }
    };

    let new_token = PostToken {
        name: name.to_string(),
        email,
    };
    let token = state
        .registry
        .create_token(&session.credential().id_token, &new_token)
        .await?;

    Ok((StatusCode::CREATED, Json(token)))
}

/// DELETE /api/tokens/:id
pub async fn delete_token(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    ActiveSession(session): ActiveSession,
    Path(token_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let state = state_lock.read().await.clone();

    state
        .registry
        .delete_token(&session.credential().id_token, &token_id)
        .await?;

    info!(session_id = %session.id, token_id = %token_id, "Token deleted on behalf of user");
    Ok(StatusCode::NO_CONTENT)
}
