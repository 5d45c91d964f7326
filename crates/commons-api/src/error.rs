use std::future::{Ready, ready};

use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use commons_db::DbError;
use commons_wiki::WikiError;

/// Every failure a handler can report. Rendered as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON data.")]
    InvalidJson,

    #[error("{0}")]
    BadRequest(String),

    /// Several field errors at once, listed under `details`.
    #[error("{message}")]
    Validation { message: String, details: Vec<String> },

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    /// The resource exists but has been soft-deleted.
    #[error("{0}")]
    Gone(&'static str),

    /// Unsupported method on a route that answers 405.
    #[error("{0}")]
    MethodNotAllowed(&'static str),

    /// Unsupported method on a route that answers 400.
    #[error("{0}")]
    WrongMethod(&'static str),

    #[error("Data integrity error, please check your input.")]
    Integrity,

    #[error("Database operation error, please try again later.")]
    Database,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson
            | ApiError::BadRequest(_)
            | ApiError::Validation { .. }
            | ApiError::WrongMethod(_)
            | ApiError::Integrity => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Database | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation { message, details } => json!({ "error": message, "details": details }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Integrity(msg) => {
                warn!("Integrity error: {}", msg);
                ApiError::Integrity
            }
            other => {
                error!("Database error: {}", other);
                ApiError::Database
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<WikiError> for ApiError {
    fn from(err: WikiError) -> Self {
        match err {
            WikiError::NotFound => ApiError::NotFound("Page not found"),
            WikiError::Io(e) => {
                error!("Wiki storage error: {}", e);
                ApiError::Internal(e.to_string())
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// Method fallback for routes that answer unsupported methods with 405.
pub(crate) fn method_not_allowed(
    message: &'static str,
) -> impl Fn() -> Ready<ApiError> + Clone + Send + Sync + 'static {
    move || ready(ApiError::MethodNotAllowed(message))
}

/// Method fallback for routes that answer unsupported methods with 400.
pub(crate) fn wrong_method(
    message: &'static str,
) -> impl Fn() -> Ready<ApiError> + Clone + Send + Sync + 'static {
    move || ready(ApiError::WrongMethod(message))
}
