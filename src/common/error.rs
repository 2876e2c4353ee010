// Error handling types for the web client API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use crate::registry::RegistryError;
use crate::search::SearchError;
use crate::session::SessionError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    InternalServer(String),
    ServiceUnavailable(String),
    NoActiveSession,
    EmptySearchSubmission,
    RefreshFailed,
    Upstream(RegistryError),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::NoActiveSession => write!(f, "No active session"),
            ApiError::EmptySearchSubmission => write!(f, "Empty search submission"),
            ApiError::RefreshFailed => write!(f, "Session refresh failed"),
            ApiError::Upstream(e) => write!(f, "Upstream Error: {}", e),
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, code) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            ApiError::InternalServer(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "INTERNAL_SERVER_ERROR",
            ),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                msg,
                "SERVICE_UNAVAILABLE",
            ),
            ApiError::NoActiveSession => (
                StatusCode::UNAUTHORIZED,
                "sign in required".to_string(),
                "NO_ACTIVE_SESSION",
            ),
            ApiError::EmptySearchSubmission => (
                StatusCode::BAD_REQUEST,
                "search input is empty".to_string(),
                "EMPTY_SEARCH_SUBMISSION",
            ),
            ApiError::RefreshFailed => (
                StatusCode::UNAUTHORIZED,
                "session expired, sign in again".to_string(),
                "REFRESH_FAILED",
            ),
            ApiError::Upstream(e) => {
                error!(error = %e, "Package server request failed");
                let status = match &e {
                    RegistryError::Status { status, .. } if *status == 404 => StatusCode::NOT_FOUND,
                    RegistryError::Status { status, .. } if *status == 401 || *status == 403 => {
                        StatusCode::UNAUTHORIZED
                    }
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, "package server request failed".to_string(), "UPSTREAM_ERROR")
            }
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        ApiError::Upstream(e)
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::EmptySearchSubmission => ApiError::EmptySearchSubmission,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NoActiveSession => ApiError::NoActiveSession,
            SessionError::RefreshFailed => ApiError::RefreshFailed,
            SessionError::InvalidSignInState => {
                ApiError::BadRequest("sign-in state mismatch".to_string())
            }
            SessionError::MalformedTokenResponse(field) => {
                error!(field = %field, "Identity provider token payload is malformed");
                ApiError::InternalServer("identity provider misconfigured".to_string())
            }
            SessionError::RequestFailed(msg) => {
                error!(error = %msg, "Identity provider request failed");
                ApiError::ServiceUnavailable("identity provider unavailable".to_string())
            }
            SessionError::ProviderRejected { status, body } => {
                error!(status = status, body = %body, "Identity provider rejected request");
                ApiError::Unauthorized("identity provider rejected the request".to_string())
            }
            SessionError::Serialization(msg) => {
                error!(error = %msg, "Identity provider response could not be parsed");
                ApiError::InternalServer("identity provider response invalid".to_string())
            }
        }
    }
}
