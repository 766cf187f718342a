//! API error types for handler operations
//!
//! Structured error type for the CRUD operations, with HTTP status mapping
//! and rendering into the failure envelope via `IntoResponse`.
//!
//! # Example
//!
//! ```rust
//! use crud_service::handlers::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::not_found("User", "123");
//! assert!(matches!(error.kind, ApiErrorKind::NotFound));
//! assert_eq!(error.message, "Record not found");
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::envelope::{ErrorEnvelope, RECORD_NOT_FOUND};
use crate::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use crate::validation::ValidationErrors;

/// Operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing records
    Index,
    /// Reading a single record by id
    Read,
    /// Creating a record
    Create,
    /// Updating a record
    Update,
    /// Deleting a record
    Delete,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Read => write!(f, "read"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// No record has the requested id
    NotFound,
    /// Request input failed validation
    ValidationFailed,
    /// A unique value is already stored
    AlreadyExists,
    /// Write conflicts with stored data
    Conflict,
    /// Internal server error
    InternalError,
    /// Store temporarily unavailable
    ServiceUnavailable,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::Conflict => write!(f, "conflict"),
            Self::InternalError => write!(f, "internal_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AlreadyExists | Self::Conflict => StatusCode::CONFLICT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether the failure lies with the server rather than the request
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::InternalError | Self::ServiceUnavailable)
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Message returned to the client
    pub message: String,
    /// Per-field messages for validation failures
    pub errors: Option<ValidationErrors>,
    /// The type of entity involved (e.g., "User", "Post")
    pub entity_type: Option<String>,
    /// The id of the entity involved
    pub entity_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            errors: None,
            entity_type: None,
            entity_id: None,
        }
    }

    /// No record of `entity_type` has `entity_id`
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(ApiOperation::Read, ApiErrorKind::NotFound, RECORD_NOT_FOUND)
            .with_entity(entity_type, entity_id)
    }

    /// Input failed validation
    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            errors: Some(errors),
            ..Self::new(
                ApiOperation::Create,
                ApiErrorKind::ValidationFailed,
                "The given data was invalid.",
            )
        }
    }

    /// One field of the input is invalid
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::validation(ValidationErrors::single(field, message))
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::ServiceUnavailable)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if self.kind.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                retriable = self.is_retriable(),
                "API error: {}", self.message
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                "API error: {}", self.message
            );
        }

        let body = match self.errors {
            Some(errors) => ErrorEnvelope::errors(errors, status),
            None => ErrorEnvelope::message(self.message, status),
        };
        body.into_response()
    }
}

fn repository_operation_to_api_operation(op: RepositoryOperation) -> ApiOperation {
    match op {
        RepositoryOperation::FindById => ApiOperation::Read,
        RepositoryOperation::FindAll
        | RepositoryOperation::Count
        | RepositoryOperation::BatchLoad => ApiOperation::Index,
        RepositoryOperation::Exists | RepositoryOperation::Create => ApiOperation::Create,
        RepositoryOperation::Update => ApiOperation::Update,
        RepositoryOperation::Delete => ApiOperation::Delete,
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        let operation = repository_operation_to_api_operation(err.operation);

        if err.kind == RepositoryErrorKind::InvalidQuery {
            let field = err.field.unwrap_or_else(|| "query".to_string());
            return Self::invalid_field(field, err.message).with_operation(operation);
        }

        let kind = match err.kind {
            RepositoryErrorKind::AlreadyExists => ApiErrorKind::AlreadyExists,
            RepositoryErrorKind::ConstraintViolation => ApiErrorKind::Conflict,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout => {
                ApiErrorKind::ServiceUnavailable
            }
            RepositoryErrorKind::InvalidQuery
            | RepositoryErrorKind::DatabaseError
            | RepositoryErrorKind::SerializationError
            | RepositoryErrorKind::Other => ApiErrorKind::InternalError,
        };

        // Store messages can name tables and constraints, so they stay in the log
        tracing::warn!(
            operation = %err.operation,
            kind = %err.kind,
            entity_type = ?err.entity_type,
            entity_id = ?err.entity_id,
            "Repository error: {}", err.message
        );
        let message = match kind {
            ApiErrorKind::AlreadyExists => "The record conflicts with an existing record.",
            ApiErrorKind::Conflict => "The record conflicts with related data.",
            ApiErrorKind::ServiceUnavailable => "Service temporarily unavailable",
            _ => "An internal error occurred",
        };

        Self {
            operation,
            kind,
            message: message.to_string(),
            errors: None,
            entity_type: err.entity_type,
            entity_id: err.entity_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    async fn body(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_api_error_kind_status_codes() {
        assert_eq!(ApiErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiErrorKind::ValidationFailed.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiErrorKind::AlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiErrorKind::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiErrorKind::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiErrorKind::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_display_with_entity() {
        let error = ApiError::not_found("User", "7").with_operation(ApiOperation::Delete);
        assert_eq!(
            error.to_string(),
            "API not_found error during delete: Record not found [User: 7]"
        );
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let (status, body) = body(ApiError::not_found("Post", "9")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "Record not found", "status": 404}));
    }

    #[tokio::test]
    async fn test_validation_envelope_has_errors_only() {
        let (status, body) =
            body(ApiError::invalid_field("email", "The email field is required.")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({"errors": {"email": ["The email field is required."]}, "status": 422})
        );
    }

    #[tokio::test]
    async fn test_invalid_query_becomes_field_error() {
        let repo_err =
            RepositoryError::invalid_query("filters.password", "The password filter is not supported.");
        let api_err = ApiError::from(repo_err);
        assert_eq!(api_err.kind, ApiErrorKind::ValidationFailed);
        assert_eq!(api_err.operation, ApiOperation::Index);

        let (_, body) = body(api_err).await;
        assert_eq!(
            body["errors"]["filters.password"],
            json!(["The password filter is not supported."])
        );
    }

    #[test]
    fn test_constraint_errors_map_to_conflict() {
        let api_err: ApiError = RepositoryError::new(
            RepositoryOperation::Create,
            RepositoryErrorKind::AlreadyExists,
            "UNIQUE constraint failed: users.email",
        )
        .into();
        assert_eq!(api_err.kind, ApiErrorKind::AlreadyExists);
        assert_eq!(api_err.kind.status_code(), StatusCode::CONFLICT);
        assert!(!api_err.message.contains("users.email"));

        let api_err: ApiError =
            RepositoryError::constraint_violation(RepositoryOperation::Update, "FOREIGN KEY constraint failed")
                .into();
        assert_eq!(api_err.operation, ApiOperation::Update);
        assert_eq!(api_err.kind, ApiErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let api_err: ApiError =
            RepositoryError::database_error(RepositoryOperation::Create, "no such table: users")
                .into();
        assert_eq!(api_err.kind, ApiErrorKind::InternalError);

        let (status, body) = body(api_err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"message": "An internal error occurred", "status": 500})
        );
    }

    #[test]
    fn test_timeouts_are_retriable() {
        let api_err: ApiError = RepositoryError::new(
            RepositoryOperation::FindAll,
            RepositoryErrorKind::Timeout,
            "connection pool timed out",
        )
        .into();
        assert_eq!(api_err.kind, ApiErrorKind::ServiceUnavailable);
        assert_eq!(api_err.message, "Service temporarily unavailable");
        assert!(api_err.is_retriable());
        assert!(!ApiError::not_found("User", "1").is_retriable());
    }
}
