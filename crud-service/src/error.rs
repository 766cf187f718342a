//! Service-level error types
//!
//! These errors surface while the service is configured, connected and
//! started. Request-level failures are expressed as
//! [`ApiError`](crate::handlers::ApiError) instead.

use thiserror::Error;

use crate::repository::RepositoryError;
use crate::validation::RuleParseError;

/// Result type alias using the service error
pub type Result<T> = std::result::Result<T, Error>;

/// Service error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Database connection or driver error
    #[error("Database error: {0}")]
    Database(String),

    /// Repository error outside a request
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A resource declares an unparseable validation rule
    #[error("Invalid validation rule: {0}")]
    Rules(#[from] RuleParseError),

    /// Password hashing error
    #[error("Password hashing error: {0}")]
    Password(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryOperation;

    #[test]
    fn test_repository_error_is_transparent() {
        let repo = RepositoryError::database_error(RepositoryOperation::Count, "locked");
        let error = Error::from(repo.clone());
        assert_eq!(error.to_string(), repo.to_string());
    }

    #[test]
    fn test_password_error_display() {
        let error = Error::Password("bad params".to_string());
        assert_eq!(error.to_string(), "Password hashing error: bad params");
    }
}
