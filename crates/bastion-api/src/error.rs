//! API error type and its HTTP mapping.
//!
//! Messages are fixed strings that never carry identifiers, schema detail or
//! store errors. Full detail is logged server-side only.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use bastion_db::DbError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or rejected input.
    #[error("{0}")]
    BadRequest(&'static str),

    /// Unknown username or wrong password; the two are indistinguishable.
    #[error("login failed")]
    LoginFailed,

    /// No session, no login, insufficient role or bad CSRF token.
    #[error("permission denied")]
    Unauthorized,

    /// Store temporarily unavailable. Retryable.
    #[error("service unavailable")]
    Unavailable,

    #[error("error occurred")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::LoginFailed => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::LoginFailed => "login_failed",
            Self::Unauthorized => "unauthorized",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Unavailable => {
                warn!("Store unavailable");
                Self::Unavailable
            }
            DbError::Duplicate => Self::BadRequest("request conflicts with existing data"),
            DbError::MissingReference | DbError::NotFound(_) => Self::BadRequest("not found"),
            DbError::Invalid(reason) => Self::BadRequest(reason),
            DbError::Query(_) | DbError::Poisoned => {
                error!(error = %err, "Store error");
                Self::Internal
            }
        }
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        error!(error = %err, "Session error");
        Self::Internal
    }
}
