// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Application error types with consistent JSON responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type shared by the API clients and the callback listener.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Backend error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("OAuth callback failed: {0}")]
    OAuth(#[from] OAuthError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Errors that happened before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    /// Short message suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::NotFound(_) => "Resource not found".to_string(),
            AppError::Server { status, message } if *status >= 500 => {
                format!("Server error. Please try again later. ({})", message)
            }
            AppError::Server { message, .. } => message.clone(),
            AppError::Network(_) => "Network error. Please check your connection.".to_string(),
            AppError::Timeout => "Request timed out. Please try again.".to_string(),
            AppError::OAuth(e) => e.to_string(),
            AppError::Decode(_) | AppError::Internal(_) => {
                "An unexpected error occurred".to_string()
            }
        }
    }

    /// Map a transport-level reqwest failure.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout
        } else if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

/// Local input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} is too long (maximum {max} characters)")]
    TooLong { field: &'static str, max: usize },

    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ValidationError {
    /// The offending field, for inline display.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::Invalid { field, .. } => field,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Required { .. } => "required",
            ValidationError::TooLong { .. } => "too long",
            ValidationError::Invalid { .. } => "invalid",
        }
    }
}

/// Failures of the OAuth redirect handoff.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuthError {
    #[error("OAuth authorization was denied or failed: {0}")]
    Denied(String),

    #[error("Backend OAuth processing failed - please try again")]
    BackendIncomplete,

    #[error("Invalid OAuth callback - missing user information")]
    MissingUserInfo,
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "bad_request", Some(e.to_string())),
            AppError::OAuth(e) => (StatusCode::BAD_REQUEST, "oauth_error", Some(e.to_string())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Server { message, .. } => {
                (StatusCode::BAD_GATEWAY, "backend_error", Some(message.clone()))
            }
            AppError::Network(_) | AppError::Timeout => {
                (StatusCode::BAD_GATEWAY, "backend_unreachable", None)
            }
            AppError::Decode(msg) => {
                tracing::error!(error = %msg, "Undecodable backend response");
                (StatusCode::BAD_GATEWAY, "backend_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_codes() {
        let required = ValidationError::Required { field: "name" };
        assert_eq!(required.code(), "required");
        assert_eq!(required.field(), "name");

        let long = ValidationError::TooLong {
            field: "name",
            max: 100,
        };
        assert_eq!(long.code(), "too long");
        assert_eq!(long.to_string(), "name is too long (maximum 100 characters)");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AppError::Timeout.user_message(),
            "Request timed out. Please try again."
        );
        assert_eq!(
            AppError::Server {
                status: 400,
                message: "Area overlaps itself".to_string()
            }
            .user_message(),
            "Area overlaps itself"
        );
        assert!(AppError::NotFound("area 7".to_string()).is_not_found());
        assert!(AppError::from(ValidationError::Required { field: "name" }).is_local());
    }

    #[test]
    fn test_oauth_error_response_status() {
        let response = AppError::OAuth(OAuthError::MissingUserInfo).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::NotFound("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
