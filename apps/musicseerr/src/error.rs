//! Application error types for the MusicSeerr backend.
//!
//! Provides a unified error type that implements `IntoResponse` for Axum.
//! Upstream, validation, and configuration messages are shown to the user
//! as-is, so their wording is part of the API.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading/parsing errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A required setting (e.g. the Lidarr API key) is not configured
    #[error("{0}")]
    ConfigurationMissing(String),

    /// Non-2xx or unreachable MusicBrainz/Lidarr service
    #[error("{0}")]
    Upstream(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed caller input
    #[error("{0}")]
    Validation(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl AppError {
    /// Machine-readable code carried in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration_error",
            AppError::ConfigurationMissing(_) => "configuration_missing",
            AppError::Upstream(_) => "upstream_unavailable",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::ConfigurationMissing(msg) => {
                tracing::warn!("Configuration missing: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, Some(msg.clone()))
            }
            AppError::Upstream(msg) => {
                tracing::warn!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, Some(msg.clone()))
            }
            AppError::NotFound(resource) => (StatusCode::NOT_FOUND, Some(resource.clone())),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            AppError::Internal(msg) => {
                // Log full error but don't expose internal details
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

// Extractor rejections are caller input errors and use the same JSON body.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Result type alias for services and handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        let error = AppError::NotFound("test".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_status() {
        let error = AppError::Validation("invalid".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_status() {
        let error = AppError::Upstream("Lidarr 500: boom".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_configuration_missing_status() {
        let error = AppError::ConfigurationMissing("Lidarr API key not configured".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_upstream_message_is_verbatim() {
        let error = AppError::Upstream("Lidarr 400: Path is already configured".to_string());
        assert_eq!(error.to_string(), "Lidarr 400: Path is already configured");
    }
}
