use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use seatdesk_services::auth::AuthError;
use seatdesk_services::dao::base::DaoError;
use seatdesk_services::licensing::{ErrorKind, LicensingError};
use serde::Serialize;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unauthorized(String),
    Conflict { code: &'static str, message: String },
    Gone(String),
    Internal(String),
    Validation(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            ApiError::Gone(msg) => (StatusCode::GONE, "expired", msg),
            ApiError::Internal(msg) => {
                error!(%msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error".to_string(),
                )
            }
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation", msg),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LicensingError> for ApiError {
    fn from(err: LicensingError) -> Self {
        let message = err.to_string();
        match (err.kind(), &err) {
            (ErrorKind::NotFound, _) => ApiError::NotFound(message),
            (ErrorKind::Conflict, LicensingError::LicenceUnavailable) => ApiError::Conflict {
                code: "licence_unavailable",
                message,
            },
            (ErrorKind::Conflict, LicensingError::InviteeMismatch) => ApiError::Conflict {
                code: "invitee_mismatch",
                message,
            },
            (ErrorKind::Conflict, LicensingError::AlreadyMember) => ApiError::Conflict {
                code: "already_member",
                message,
            },
            (ErrorKind::Conflict, _) => ApiError::Conflict {
                code: "already_used",
                message,
            },
            (ErrorKind::Expired, _) => ApiError::Gone(message),
            (ErrorKind::PersistenceFailure, _) => ApiError::Internal(message),
        }
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            other => LicensingError::from(other).into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}
