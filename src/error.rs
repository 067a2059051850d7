// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::{entitlement::EntitlementError, exam::ExamError};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 400 Bad Request
    BadRequest(String),

    // 403 Forbidden (content not covered by the learner's tier)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., operation not allowed in the exam's current state)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Wrong-state calls are contract violations and surface as 409.
impl From<ExamError> for AppError {
    fn from(err: ExamError) -> Self {
        match err {
            ExamError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            ExamError::SessionNotFound(_) => AppError::NotFound(err.to_string()),
            ExamError::UnknownQuestion(_)
            | ExamError::InvalidOption(_)
            | ExamError::NotAnswered(_) => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<EntitlementError> for AppError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::NotPurchasable(_) => AppError::BadRequest(err.to_string()),
            EntitlementError::PurchaseInProgress(_) => AppError::Conflict(err.to_string()),
        }
    }
}
