// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Error body: `detail` carries the human readable message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub detail: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    ValidationError { field: String, message: String },
    /// Upload is missing an `image/*` content type
    NotAnImage,
    PayloadTooLarge(String),
    ServiceUnavailable(String),
    /// Inference failed after the models were loaded
    ProcessingFailed(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, detail, details) = match self {
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::NotAnImage => (
                "invalid_request",
                "File must be an image".to_string(),
                None,
            ),
            ApiError::PayloadTooLarge(msg) => ("payload_too_large", msg.clone(), None),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            ApiError::ProcessingFailed(msg) => (
                "processing_failed",
                format!("OCR processing failed: {}", msg),
                None,
            ),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            detail,
            error_type: error_type.to_string(),
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::ValidationError { .. }
            | ApiError::NotAnImage => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ProcessingFailed(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::NotAnImage => write!(f, "File must be an image"),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::ProcessingFailed(msg) => write!(f, "OCR processing failed: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_an_image() {
        let err = ApiError::NotAnImage;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_response().detail, "File must be an image");
    }

    #[test]
    fn test_processing_failed_message() {
        let err = ApiError::ProcessingFailed("session lock poisoned".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_response().detail,
            "OCR processing failed: session lock poisoned"
        );
    }

    #[test]
    fn test_validation_error_details() {
        let err = ApiError::ValidationError {
            field: "file".to_string(),
            message: "file is required".to_string(),
        };
        let response = err.to_response();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.error_type, "validation_error");
        assert_eq!(
            response.details.unwrap()["field"],
            serde_json::Value::String("file".to_string())
        );
    }

    #[test]
    fn test_service_unavailable() {
        let err = ApiError::ServiceUnavailable("Models not loaded".to_string());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "Service unavailable: Models not loaded");
    }

    #[test]
    fn test_payload_too_large() {
        let err = ApiError::PayloadTooLarge("25165824 bytes".to_string());
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.to_response().error_type, "payload_too_large");
    }

    #[test]
    fn test_every_variant_maps_to_a_status() {
        let cases = [
            (ApiError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::ValidationError {
                    field: "file".into(),
                    message: "x".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::NotAnImage, StatusCode::BAD_REQUEST),
            (ApiError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (ApiError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::ProcessingFailed("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::InternalError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            // No variant answers 404; unknown routes are the router's
            assert_ne!(err.status_code(), StatusCode::NOT_FOUND);
            assert_eq!(err.status_code(), status, "{}", err);
        }
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ApiError::NotAnImage.to_response()).unwrap();
        assert_eq!(json["detail"], "File must be an image");
        assert_eq!(json["errorType"], "invalid_request");
        assert!(json.get("details").is_none());
    }
}
