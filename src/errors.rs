use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Wire shape for every error leaving the service.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

/// Domain error taxonomy for the payment session core.
///
/// Every rejection carries a specific reason; callers receive typed
/// results, never panics or stringly-typed failures.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    ValidationError(String),

    #[error("Payment session {0} not found")]
    SessionNotFound(String),

    #[error("Payment session has expired")]
    SessionExpired,

    #[error("Payment session has already been processed")]
    SessionAlreadyProcessed,

    #[error("Maximum payment attempts exceeded")]
    RetriesExceeded,

    #[error("Settlement failed: {0}")]
    SettlementFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match &self {
            PaymentError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_request".to_string(),
                "validation_error".to_string(),
                msg.clone(),
            ),
            PaymentError::SessionNotFound(_) => (
                StatusCode::NOT_FOUND,
                "invalid_request".to_string(),
                "session_not_found".to_string(),
                self.to_string(),
            ),
            PaymentError::SessionExpired => (
                StatusCode::GONE,
                "invalid_request".to_string(),
                "session_expired".to_string(),
                self.to_string(),
            ),
            PaymentError::SessionAlreadyProcessed => (
                StatusCode::CONFLICT,
                "invalid_request".to_string(),
                "session_already_processed".to_string(),
                self.to_string(),
            ),
            PaymentError::RetriesExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "invalid_request".to_string(),
                "retries_exceeded".to_string(),
                self.to_string(),
            ),
            PaymentError::SettlementFailed(msg) => (
                StatusCode::BAD_GATEWAY,
                "processing_error".to_string(),
                "settlement_failed".to_string(),
                msg.clone(),
            ),
            // Internal details stay out of responses.
            PaymentError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "processing_error".to_string(),
                "internal_error".to_string(),
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error_type,
            code,
            message,
            param: None,
        };

        (status, Json(error_response)).into_response()
    }
}
