use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::notification::FieldIssue;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid notification request ({} issue(s))", .0.len())]
    Validation(Vec<FieldIssue>),

    #[error("Subscription store error: {0}")]
    Store(#[from] StoreError),

    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<FieldIssue>>,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, client_message, issues) = match &self {
            AppError::Config(e) => {
                let msg = if is_production() {
                    "Configuration error".to_string()
                } else {
                    e.to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", msg, None)
            }
            AppError::Auth(msg) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                msg.clone(),
                None,
            ),
            AppError::Validation(found) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Invalid notification request".to_string(),
                Some(found.clone()),
            ),
            AppError::Store(e) => {
                let msg = if is_production() {
                    "Subscription store unavailable".to_string()
                } else {
                    e.to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", msg, None)
            }
            AppError::Serialization(e) => {
                let msg = if is_production() {
                    "Internal server error".to_string()
                } else {
                    e.to_string()
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERIALIZATION_ERROR",
                    msg,
                    None,
                )
            }
            AppError::Internal(e) => {
                let msg = if is_production() {
                    "Internal server error".to_string()
                } else {
                    e.clone()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None)
            }
        };

        // Validation failures are a caller problem, not a server fault
        if matches!(self, AppError::Validation(_)) {
            tracing::debug!(
                code = %code,
                status = %status.as_u16(),
                message = %self,
                "Rejected request"
            );
        } else {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %self,
                "API error"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
                issues,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
