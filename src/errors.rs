//! Error types for the AppHub service

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::response::ApiResponse;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request parameters
    #[error("{0}")]
    BadRequest(String),

    /// Well-formed request that violates a domain rule
    #[error("{0}")]
    Validation(String),

    /// Queried entity is absent
    #[error("{0}")]
    NotFound(String),

    /// Store query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else that should surface as a 500
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Json(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => {
                ApiResponse::failure(status, msg.clone(), None)
            }
            ApiError::Validation(msg) => {
                ApiResponse::failure(status, "Validation failed", Some(json!([msg])))
            }
            other => {
                tracing::error!("Request failed: {}", other);
                ApiResponse::failure(
                    status,
                    "Internal server error",
                    Some(json!(other.to_string())),
                )
            }
        };

        HttpResponse::build(status).json(body)
    }
}
