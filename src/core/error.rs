//! # Error Handling Module
//!
//! This module provides the service-wide error type and its HTTP mapping.
//! Layer-specific errors (`StorageError`, `CartError`) convert into
//! `ServiceError` at the API boundary, which owns the status-code mapping
//! and the JSON error body returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main result type used throughout the service
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-wide error types
///
/// Each variant represents a different category of failure. The `#[error]`
/// attribute from `thiserror` implements `Display` with the given message.
#[derive(Debug, Error, Clone)]
pub enum ServiceError {
    /// Configuration-related errors (invalid config file, bad endpoint, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Request validation errors (missing or malformed required fields)
    #[error("Request validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    /// Key-value or object store failures that reached the request boundary
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// The full video resolution pipeline failed for a product
    #[error("Failed to load video URL for product {product_id}")]
    Resolve { product_id: String },

    /// Internal server errors for unexpected failures
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ServiceError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error for a specific request field
    pub fn validation<S: Into<String>>(field: S, reason: S) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error
    ///
    /// Validation failures never reach storage and map to 400; everything
    /// else surfaces as 500, which is what the storefront expects.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Resolve { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a string representation of the error type for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::Validation { .. } => "request_validation_error",
            Self::Storage { .. } => "storage_error",
            Self::Resolve { .. } => "resolve_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ServiceError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

/// Convert errors into HTTP responses
///
/// Clients always receive a JSON body with an `error` field and never a
/// stack trace.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_response = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
                "type": self.error_type(),
            }
        });

        (status, Json(error_response)).into_response()
    }
}
