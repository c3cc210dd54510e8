//! API Error Handling
//!
//! Maps core errors onto HTTP status codes and the response envelope.

use super::types::ApiResponse;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use relboard_core::RelboardError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
    /// An extractor refused the request body; keeps the extractor's status.
    Rejected {
        status: StatusCode,
        message: String,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Rejected { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => msg,
            ApiError::Rejected { message, .. } => message,
            ApiError::Conflict(msg) | ApiError::Unavailable(msg) => {
                tracing::warn!("Write contention: {}", msg);
                msg
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl From<RelboardError> for ApiError {
    fn from(err: RelboardError) -> Self {
        let message = err.to_string();
        match err {
            RelboardError::ReleaseNotFound(_)
            | RelboardError::HashreleaseNotFound(_)
            | RelboardError::StepNotFound { .. } => ApiError::NotFound(message),
            RelboardError::InvalidInput(_)
            | RelboardError::InvalidStatus(_)
            | RelboardError::InvalidProject(_) => ApiError::BadRequest(message),
            RelboardError::Conflict { .. } => ApiError::Conflict(message),
            RelboardError::RetriesExhausted { .. } => ApiError::Unavailable(message),
            RelboardError::RevisionOverflow(_)
            | RelboardError::SerializationError(_)
            | RelboardError::DeserializationError(_)
            | RelboardError::IoError(_) => ApiError::Internal(message),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // A well-formed body of the wrong shape is bad input like any other.
        let status = match &rejection {
            JsonRejection::JsonDataError(_) => StatusCode::BAD_REQUEST,
            _ => rejection.status(),
        };
        ApiError::Rejected {
            status,
            message: rejection.body_text(),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
