//! API error handling for the AURA backend

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::StorageError;

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: i64,
}

impl ApiError {
    pub fn new(code: u16, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_details(code: u16, message: String, details: serde_json::Value) -> Self {
        Self {
            code,
            message,
            details: Some(details),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    // Common error constructors
    pub fn bad_request(message: &str) -> Self {
        Self::new(400, message.to_string())
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(401, message.to_string())
    }

    pub fn forbidden(message: &str) -> Self {
        Self::new(403, message.to_string())
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(404, message.to_string())
    }

    pub fn conflict(message: &str) -> Self {
        Self::new(409, message.to_string())
    }

    pub fn internal_server_error(message: &str) -> Self {
        Self::new(500, message.to_string())
    }

    pub fn bad_gateway(message: &str) -> Self {
        Self::new(502, message.to_string())
    }

    pub fn missing_fields(fields: &[&str]) -> Self {
        Self::with_details(
            400,
            "Missing required fields".to_string(),
            serde_json::json!({ "fields": fields }),
        )
    }

    pub fn validation_error(field: &str, reason: &str) -> Self {
        Self::with_details(
            400,
            "Validation error".to_string(),
            serde_json::json!({
                "field": field,
                "reason": reason
            }),
        )
    }

    pub fn risk_too_high(average: f64) -> Self {
        Self::with_details(
            400,
            "Risk score too high for certification".to_string(),
            serde_json::json!({ "averageRiskScore": average }),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Validation error details
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Multiple validation errors
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the error of a validator result, if any.
    pub fn check(&mut self, result: Result<(), ValidationError>) {
        if let Err(err) = result {
            self.errors.push(err);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> ApiResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.to_api_error())
        }
    }

    pub fn to_api_error(self) -> ApiError {
        ApiError::with_details(
            400,
            "Validation failed".to_string(),
            serde_json::to_value(self).unwrap_or(serde_json::Value::Null),
        )
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::not_found(&format!("Not found: {}", what)),
            StorageError::Duplicate(what) => Self::conflict(&format!("Duplicate: {}", what)),
            other => {
                error!("Storage failure: {}", other);
                Self::internal_server_error("Server error")
            }
        }
    }
}

/// Convert anyhow::Error to ApiError
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("Unhandled error: {:#}", err);
        Self::internal_server_error("Server error")
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::validation_error(&err.field, &err.message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(&format!("Invalid request body: {}", rejection.body_text()))
    }
}
