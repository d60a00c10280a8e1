//! HTTP error responses.
//!
//! Every failure leaves the API as
//! `{"error": {"code": ..., "message": ..., "details": ...}}` with a matching
//! status code. Core errors convert through `From<ServiceError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::db::Booking;
use crate::error::ServiceError;

/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Client errors (4xx)
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    TooManyRequests,
    ValidationError,

    // Server errors (5xx)
    InternalError,
}

impl ErrorCode {
    /// Get the default HTTP status code for this error code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::TooManyRequests => "too_many_requests",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// The inner error object in the response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ErrorDetails {
    /// Bookings that overlap the requested slot
    Conflicts { conflicts: Vec<Booking> },
    /// Field-level validation errors
    ValidationErrors(HashMap<String, Vec<String>>),
}

/// The full error response envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    status: StatusCode,
    message: String,
    details: Option<ErrorDetails>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: code.status_code(),
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Unauthorized error (401) - authentication required
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Forbidden error (403) - authenticated but not allowed
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Validation error (400) with field-level details
    pub fn validation(errors: HashMap<String, Vec<String>>) -> Self {
        let message = if errors.len() == 1 {
            errors
                .values()
                .next()
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_else(|| "Validation failed".to_string())
        } else {
            format!("Validation failed for {} fields", errors.len())
        };

        Self::new(ErrorCode::ValidationError, message)
            .with_details(ErrorDetails::ValidationErrors(errors))
    }

    pub fn validation_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::validation(errors)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Too many requests error (429)
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let response = ErrorResponse {
            error: ErrorBody {
                code: self.code.as_str().to_string(),
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => ApiError::validation(errors),
            ServiceError::Unauthenticated => ApiError::unauthorized("Authentication required"),
            ServiceError::Forbidden(message) => ApiError::forbidden(message),
            ServiceError::NotFound(message) => ApiError::not_found(message),
            ServiceError::Conflict { conflicts } => ApiError::new(
                ErrorCode::Conflict,
                "Room is already booked for the requested time",
            )
            .with_details(ErrorDetails::Conflicts { conflicts }),
            ServiceError::ConcurrentUpdate => ApiError::new(
                ErrorCode::Conflict,
                "Booking was changed by another request, please retry",
            ),
            ServiceError::Database(e) => e.into(),
            ServiceError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        ApiError::internal("An internal error occurred")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn booking(id: &str) -> Booking {
        Booking {
            id: id.to_string(),
            room_id: "r1".to_string(),
            user_id: "u1".to_string(),
            start_time: "2025-03-04T09:00:00.000Z".to_string(),
            end_time: "2025-03-04T10:00:00.000Z".to_string(),
            status: "active".to_string(),
            notes: None,
            created_at: "2025-03-01T00:00:00.000Z".to_string(),
            updated_at: "2025-03-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_error_code_status_codes() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ValidationError.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::TooManyRequests.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_validation_error_multiple_fields() {
        let mut errors = HashMap::new();
        errors.insert("room_id".to_string(), vec!["room_id is required".to_string()]);
        errors.insert("end_time".to_string(), vec!["end_time is required".to_string()]);

        let err = ApiError::validation(errors);
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("2 fields"));
    }

    #[test]
    fn test_service_error_mapping() {
        let cases = [
            (ServiceError::validation_field("x", "bad"), StatusCode::BAD_REQUEST),
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ServiceError::forbidden("no"), StatusCode::FORBIDDEN),
            (ServiceError::not_found("gone"), StatusCode::NOT_FOUND),
            (
                ServiceError::Conflict { conflicts: vec![] },
                StatusCode::CONFLICT,
            ),
            (ServiceError::ConcurrentUpdate, StatusCode::CONFLICT),
            (ServiceError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ServiceError::Database(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[tokio::test]
    async fn test_conflict_envelope_lists_bookings() {
        let err = ApiError::from(ServiceError::Conflict {
            conflicts: vec![booking("b1"), booking("b2")],
        });
        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "conflict");
        let conflicts = json["error"]["details"]["conflicts"].as_array().unwrap();
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0]["id"], "b1");
    }

    #[tokio::test]
    async fn test_internal_errors_do_not_leak() {
        let err = ApiError::from(ServiceError::internal("secret stack detail"));
        let (_, json) = body_json(err).await;
        assert_eq!(json["error"]["code"], "internal_error");
        assert!(!json["error"]["message"].as_str().unwrap().contains("secret"));
        assert!(json["error"].get("details").is_none());
    }
}
