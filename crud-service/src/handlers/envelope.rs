//! Response envelopes
//!
//! Every response body is wrapped: successes as `{data, message, status}`,
//! failures as `{message, status}` or, for validation failures,
//! `{errors, status}`. The `status` field repeats the HTTP status code.
//!
//! # Example
//!
//! ```rust
//! use crud_service::handlers::Envelope;
//! use serde_json::json;
//!
//! let envelope = Envelope::created(json!({"id": 1}));
//! assert_eq!(envelope.status, 201);
//! assert_eq!(envelope.message, "Record created successfully");
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::ValidationErrors;

/// Message of a success envelope when none is given
pub const DEFAULT_MESSAGE: &str = "Operation successful";
/// Message after a create
pub const RECORD_CREATED: &str = "Record created successfully";
/// Message after an update
pub const RECORD_UPDATED: &str = "Record updated successfully";
/// Message after a delete
pub const RECORD_DELETED: &str = "Record deleted successfully";
/// Message when no record has the requested id
pub const RECORD_NOT_FOUND: &str = "Record not found";

/// Success envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Payload
    pub data: T,
    /// Human-readable outcome
    pub message: String,
    /// HTTP status code
    pub status: u16,
}

impl<T> Envelope<T> {
    /// 200 envelope with the default message
    pub fn success(data: T) -> Self {
        Self {
            data,
            message: DEFAULT_MESSAGE.to_string(),
            status: StatusCode::OK.as_u16(),
        }
    }

    /// 201 envelope for a newly created record
    pub fn created(data: T) -> Self {
        Self::success(data)
            .with_message(RECORD_CREATED)
            .with_status(StatusCode::CREATED)
    }

    /// Replace the message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Replace the status
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status.as_u16();
        self
    }

    /// HTTP status of the envelope
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK)
    }
}

impl Envelope<Value> {
    /// 200 envelope with null data, after a delete
    pub fn deleted() -> Self {
        Self::success(Value::Null).with_message(RECORD_DELETED)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// Failure envelope
///
/// Exactly one of `message` and `errors` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Human-readable failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Per-field validation messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
    /// HTTP status code
    pub status: u16,
}

impl ErrorEnvelope {
    /// Failure described by a message
    pub fn message(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            message: Some(message.into()),
            errors: None,
            status: status.as_u16(),
        }
    }

    /// Failure described by per-field validation messages
    pub fn errors(errors: ValidationErrors, status: StatusCode) -> Self {
        Self {
            message: None,
            errors: Some(errors),
            status: status.as_u16(),
        }
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_defaults() {
        let envelope = Envelope::success(json!([1, 2]));
        assert_eq!(envelope.status_code(), StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"data": [1, 2], "message": "Operation successful", "status": 200})
        );
    }

    #[test]
    fn test_deleted_has_null_data() {
        assert_eq!(
            serde_json::to_value(Envelope::deleted()).unwrap(),
            json!({"data": null, "message": "Record deleted successfully", "status": 200})
        );
    }

    #[test]
    fn test_error_envelope_shapes() {
        let not_found = ErrorEnvelope::message(RECORD_NOT_FOUND, StatusCode::NOT_FOUND);
        assert_eq!(
            serde_json::to_value(&not_found).unwrap(),
            json!({"message": "Record not found", "status": 404})
        );

        let invalid = ErrorEnvelope::errors(
            ValidationErrors::single("name", "The name field is required."),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
        assert_eq!(
            serde_json::to_value(&invalid).unwrap(),
            json!({"errors": {"name": ["The name field is required."]}, "status": 422})
        );
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = Envelope::created(json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = ErrorEnvelope::message("gone", StatusCode::NOT_FOUND).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
